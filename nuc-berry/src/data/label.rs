use super::{ensure_non_empty, VolumeAttr};
use crate::consts::LABEL_BACKGROUND;
use crate::error::{PipelineError, PipelineResult};
use crate::Idx3d;
use ndarray::{Array3, ArrayView2, ArrayView3, Axis};
use num::ToPrimitive;
use std::collections::BTreeSet;
use std::ops::Index;

/// 标签体数据. 每个不同的正整数代表一个候选物体, `0` 代表背景.
///
/// 由外部分割服务产生, 细胞核种群构建时只读使用.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    data: Array3<u32>,
}

impl VolumeAttr for LabelVolume {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl Index<Idx3d> for LabelVolume {
    type Output = u32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

/// 体素坐标以 `u16` 压缩存储, 所以每一维的长度都不能超过该值.
const MAX_AXIS_LEN: usize = u16::MAX as usize + 1;

impl LabelVolume {
    /// 以 `(z, h, w)` 组织的标签数据创建标签体.
    ///
    /// 数据为空, 或者任一维长度超过 65536 时返回 `Err`.
    pub fn new(data: Array3<u32>) -> PipelineResult<Self> {
        ensure_non_empty(&data, "label volume")?;
        let (z, h, w) = data.dim();
        if z > MAX_AXIS_LEN || h > MAX_AXIS_LEN || w > MAX_AXIS_LEN {
            return Err(PipelineError::Config(format!(
                "label volume {:?} exceeds {MAX_AXIS_LEN} voxels along an axis",
                data.dim()
            )));
        }
        Ok(Self { data })
    }

    /// 从任意整数类型的标签数组创建标签体.
    ///
    /// 存在负数或超出 `u32` 表示范围的标签时返回 `Err`.
    pub fn from_ints<T: ToPrimitive + Copy>(data: Array3<T>) -> PipelineResult<Self> {
        let mut out = Array3::<u32>::zeros(data.dim());
        for (dst, src) in out.iter_mut().zip(data.iter()) {
            *dst = src.to_u32().ok_or_else(|| {
                PipelineError::Config("label values must fit in u32 and be non-negative".into())
            })?;
        }
        Self::new(out)
    }

    /// 全背景标签体.
    #[inline]
    pub fn background(shape: Idx3d) -> PipelineResult<Self> {
        Self::new(Array3::from_elem(shape, LABEL_BACKGROUND))
    }

    /// 获取 3D 标签体 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, u32> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u32> {
        self.data.view()
    }

    /// 按行优先序迭代所有前景体素, 同时给出其标签.
    pub fn foreground_iter(&self) -> impl Iterator<Item = (Idx3d, u32)> + '_ {
        self.data
            .indexed_iter()
            .filter(|(_, &label)| label != LABEL_BACKGROUND)
            .map(|(pos, &label)| (pos, label))
    }

    /// 标签体中出现的所有前景标签, 升序.
    pub fn labels(&self) -> BTreeSet<u32> {
        self.foreground_iter().map(|(_, l)| l).collect()
    }

    /// 该标签体是否为全背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().all(|&l| l == LABEL_BACKGROUND)
    }
}
