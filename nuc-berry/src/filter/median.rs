use crate::consts::gray::*;
use crate::Calibration;
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 椭球形滤波核, 按行 (固定 `dz`, `dy`) 存储 X 方向的半宽.
#[derive(Clone, Debug)]
pub struct MedianKernel {
    /// `(dz, dy, half_width)`.
    rows: Vec<(isize, isize, usize)>,
}

impl MedianKernel {
    /// XY 半径为 `radius_xy` 像素, Z 半径为 `radius_z` 切片的椭球核.
    ///
    /// 半径为 0 的方向退化为单层. 负数视为 0.
    pub fn ellipsoid(radius_xy: f64, radius_z: f64) -> Self {
        let rxy = radius_xy.max(0.0);
        let rz = radius_z.max(0.0);
        let (ry, rzi) = (rxy.floor() as isize, rz.floor() as isize);

        #[inline]
        fn frac(d: isize, r: f64) -> f64 {
            if r > 0.0 {
                (d as f64 / r).powi(2)
            } else {
                0.0
            }
        }

        let mut rows = Vec::new();
        for dz in -rzi..=rzi {
            for dy in -ry..=ry {
                let rem = 1.0 - frac(dz, rz) - frac(dy, rxy);
                if rem < 0.0 {
                    continue;
                }
                rows.push((dz, dy, (rxy * rem.sqrt()).floor() as usize));
            }
        }
        debug_assert!(!rows.is_empty());
        Self { rows }
    }

    /// XY 半径为 `radius_xy` 像素, Z 半径按体素各向异性换算, 使核在物理空间中近似为球.
    pub fn for_calibration(radius_xy: f64, cal: &Calibration) -> Self {
        let rz = (radius_xy * cal.pixel_width() / cal.pixel_depth()).round();
        Self::ellipsoid(radius_xy, rz)
    }

    /// 核内体素个数.
    pub fn len(&self) -> usize {
        self.rows.iter().map(|&(_, _, hw)| 2 * hw + 1).sum()
    }

    /// 核是否为空. 由构造保证恒为 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 二值掩膜的中值滤波.
///
/// 对二值图像而言, 中值等价于多数表决: 某体素在输出中为前景,
/// 当且仅当其邻域 (仅统计未越界部分) 中前景体素严格多于一半.
pub fn binary_median(mask: ArrayView3<u8>, kernel: &MedianKernel) -> Array3<u8> {
    let (len_z, len_h, len_w) = mask.dim();

    // 每一行的前景前缀和: prefix[(z, h, x + 1)] = 该行 [0, x] 中的前景个数.
    let mut prefix = Array3::<u32>::zeros((len_z, len_h, len_w + 1));
    for ((z, h, w), &p) in mask.indexed_iter() {
        prefix[(z, h, w + 1)] = prefix[(z, h, w)] + u32::from(is_foreground(p));
    }

    let mut out = Array3::<u8>::zeros(mask.dim());
    let op = |(z, mut sli): (usize, ArrayViewMut2<u8>)| {
        for ((h, w), dst) in sli.indexed_iter_mut() {
            let (mut fg, mut total) = (0usize, 0usize);
            for &(dz, dy, hw) in kernel.rows.iter() {
                let (zz, hh) = (z as isize + dz, h as isize + dy);
                if zz < 0 || hh < 0 || zz >= len_z as isize || hh >= len_h as isize {
                    continue;
                }
                let (zz, hh) = (zz as usize, hh as usize);
                let lo = w.saturating_sub(hw);
                let hi = (w + hw).min(len_w - 1);
                fg += (prefix[(zz, hh, hi + 1)] - prefix[(zz, hh, lo)]) as usize;
                total += hi + 1 - lo;
            }
            *dst = if 2 * fg > total {
                MASK_FOREGROUND
            } else {
                MASK_BACKGROUND
            };
        }
    };

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            out.axis_iter_mut(Axis(0)).into_par_iter().enumerate().for_each(op);
        } else {
            out.axis_iter_mut(Axis(0)).enumerate().for_each(op);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{binary_median, MedianKernel};
    use crate::consts::gray::*;
    use crate::Calibration;
    use ndarray::Array3;

    #[test]
    fn test_kernel_shape() {
        assert_eq!(MedianKernel::ellipsoid(0.0, 0.0).len(), 1);
        // 半径为 1 的圆盘 (4-邻域 + 中心).
        assert_eq!(MedianKernel::ellipsoid(1.0, 0.0).len(), 5);
        // 半径为 1 的球 (6-邻域 + 中心).
        assert_eq!(MedianKernel::ellipsoid(1.0, 1.0).len(), 7);

        // 0.1 x 0.5 体素, XY 半径 8 => Z 半径 round(1.6) = 2.
        let cal = Calibration::new(0.1, 0.5).unwrap();
        let k = MedianKernel::for_calibration(8.0, &cal);
        assert!(k.rows.iter().all(|&(dz, _, _)| dz.abs() <= 2));
        assert!(k.rows.iter().any(|&(dz, _, _)| dz == 2));
    }

    #[test]
    fn test_identity_kernel() {
        let mut m = Array3::<u8>::zeros((2, 4, 4));
        m[(0, 1, 2)] = MASK_FOREGROUND;
        m[(1, 3, 3)] = MASK_FOREGROUND;
        let out = binary_median(m.view(), &MedianKernel::ellipsoid(0.0, 0.0));
        assert_eq!(out, m);
    }

    #[test]
    fn test_removes_speckle_and_fills_hole() {
        let mut m = Array3::<u8>::zeros((1, 9, 18));
        // 左半边: 背景中的孤立前景点.
        m[(0, 4, 4)] = MASK_FOREGROUND;
        // 右半边: 前景中的孤立背景洞.
        for h in 0..9 {
            for w in 9..18 {
                m[(0, h, w)] = MASK_FOREGROUND;
            }
        }
        m[(0, 4, 13)] = MASK_BACKGROUND;

        let out = binary_median(m.view(), &MedianKernel::ellipsoid(2.0, 0.0));
        assert!(is_background(out[(0, 4, 4)]));
        assert!(is_foreground(out[(0, 4, 13)]));
        assert!(is_foreground(out[(0, 0, 17)]));
        assert!(is_background(out[(0, 0, 0)]));
    }
}
