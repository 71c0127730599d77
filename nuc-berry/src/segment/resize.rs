use crate::Idx2d;
use ndarray::{Array3, ArrayView3};

/// 按比例 `factor` 缩放后的长度 (向下取整), 至少为 1.
#[inline]
pub fn scaled_len(len: usize, factor: f64) -> usize {
    ((len as f64 * factor).floor() as usize).max(1)
}

/// 在 XY 平面内以最近邻方式将 `src` 缩放到 `(h, w)`, Z 方向不变.
///
/// 目标索引 `d` 对应源索引 `min(floor(d * src_len / dst_len), src_len - 1)`,
/// 因此放大不会引入新值, 适用于标签体.
pub fn resize_xy<T: Copy>(src: ArrayView3<T>, (h, w): Idx2d) -> Array3<T> {
    let (len_z, src_h, src_w) = src.dim();
    assert!(h > 0 && w > 0);
    let map = |d: usize, dst_len: usize, src_len: usize| (d * src_len / dst_len).min(src_len - 1);
    let rows: Vec<usize> = (0..h).map(|d| map(d, h, src_h)).collect();
    let cols: Vec<usize> = (0..w).map(|d| map(d, w, src_w)).collect();
    Array3::from_shape_fn((len_z, h, w), |(z, y, x)| src[(z, rows[y], cols[x])])
}
