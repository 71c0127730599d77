use super::{ensure_non_empty, VolumeAttr};
use crate::error::PipelineResult;
use crate::Idx3d;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use std::ops::Index;

/// 单个荧光通道的 3D 强度体数据. 强度值以 `f32` 保存, 形状为 `(z, h, w)`.
///
/// 多 GB 级别的图像栈占据了大部分内存, 因此该结构只在一幅图像的处理过程中存活,
/// 离开作用域即释放.
#[derive(Debug, Clone)]
pub struct Channel {
    data: Array3<f32>,
}

impl VolumeAttr for Channel {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl Index<Idx3d> for Channel {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Channel {
    /// 以 `(z, h, w)` 组织的强度数据创建通道. 数据为空时返回 `Err`.
    pub fn new(data: Array3<f32>) -> PipelineResult<Self> {
        ensure_non_empty(&data, "channel")?;
        Ok(Self { data })
    }

    /// 所有体素均为 `value` 的通道. 形状为空时返回 `Err`.
    #[inline]
    pub fn uniform(shape: Idx3d, value: f32) -> PipelineResult<Self> {
        Self::new(Array3::from_elem(shape, value))
    }

    /// 获取 3D 通道 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 获取能按升序迭代 3D 通道水平切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, f32>> {
        self.data.axis_iter(Axis(0))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 计算由 `it` 给出的所有索引对应的强度值之和 (原始积分强度).
    ///
    /// 如果存在越界索引, 则程序 panic.
    pub fn sum_at<I: IntoIterator<Item = Idx3d>>(&self, it: I) -> f64 {
        it.into_iter().map(|pos| self[pos] as f64).sum()
    }

    /// 沿 Z 方向做最小值投影, 即逐像素取所有切片上的最小值.
    pub fn min_projection(&self) -> Array2<f32> {
        // 构造时已保证至少有一层切片.
        let mut proj = self.slice_at(0).to_owned();
        for sli in self.slice_iter().skip(1) {
            proj.zip_mut_with(&sli, |p, &v| *p = p.min(v));
        }
        proj
    }

    /// 强度最小值与最大值.
    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}
