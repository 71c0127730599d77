//! 三维细胞核物体.

use crate::error::{PipelineError, PipelineResult};
use crate::{idx3du16_to_usize, Calibration, Idx3d, Idx3dU16};

mod population;

pub use population::build_population;

/// 轴对齐包围盒, 各方向均为闭区间.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Z 方向最小索引.
    pub zmin: usize,
    /// Z 方向最大索引.
    pub zmax: usize,
    /// H 方向最小索引.
    pub hmin: usize,
    /// H 方向最大索引.
    pub hmax: usize,
    /// W 方向最小索引.
    pub wmin: usize,
    /// W 方向最大索引.
    pub wmax: usize,
}

impl BoundingBox {
    /// 只包含 `pos` 一个体素的包围盒.
    #[inline]
    pub const fn point((z, h, w): Idx3d) -> Self {
        Self {
            zmin: z,
            zmax: z,
            hmin: h,
            hmax: h,
            wmin: w,
            wmax: w,
        }
    }

    /// 扩展包围盒使其包含 `pos`.
    #[inline]
    pub fn extend(&mut self, (z, h, w): Idx3d) {
        self.zmin = self.zmin.min(z);
        self.zmax = self.zmax.max(z);
        self.hmin = self.hmin.min(h);
        self.hmax = self.hmax.max(h);
        self.wmin = self.wmin.min(w);
        self.wmax = self.wmax.max(w);
    }

    /// 包围盒跨越的切片数.
    #[inline]
    pub const fn z_extent(&self) -> usize {
        self.zmax - self.zmin + 1
    }

    /// 是否只占据一层切片?
    #[inline]
    pub const fn is_single_slice(&self) -> bool {
        self.zmin == self.zmax
    }
}

/// 一个细胞核: 标签与其体素集合.
///
/// 通过种群构建后, 标签为从 1 开始的连续整数. 体素按行优先序存储, 互不重复.
#[derive(Clone, Debug, PartialEq)]
pub struct Nucleus3d {
    label: u32,
    voxels: Vec<Idx3dU16>,
    bbox: BoundingBox,
}

impl Nucleus3d {
    /// 以标签和非空体素集合创建细胞核. 体素为空时返回 `None`.
    pub(crate) fn new(label: u32, voxels: Vec<Idx3dU16>) -> Option<Self> {
        let mut it = voxels.iter().map(idx3du16_to_usize);
        let mut bbox = BoundingBox::point(it.next()?);
        it.for_each(|pos| bbox.extend(pos));
        Some(Self { label, voxels, bbox })
    }

    /// 细胞核标签.
    #[inline]
    pub fn label(&self) -> u32 {
        self.label
    }

    /// 体素个数.
    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// 迭代体素索引.
    #[inline]
    pub fn voxels(&self) -> impl ExactSizeIterator<Item = Idx3d> + Clone + '_ {
        self.voxels.iter().map(idx3du16_to_usize)
    }

    /// 包围盒.
    #[inline]
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// 物理体积.
    #[inline]
    pub fn volume(&self, cal: &Calibration) -> f64 {
        cal.volume_of(self.voxel_count())
    }

    #[inline]
    pub(crate) fn relabel(&mut self, label: u32) {
        self.label = label;
    }
}

/// 检查所有细胞核体素都落在形状为 `shape` 的体数据之内.
pub(crate) fn ensure_within(nuclei: &[Nucleus3d], shape: Idx3d, context: &'static str) -> PipelineResult<()> {
    let (z, h, w) = shape;
    match nuclei
        .iter()
        .map(|n| n.bbox())
        .find(|b| b.zmax >= z || b.hmax >= h || b.wmax >= w)
    {
        None => Ok(()),
        Some(b) => Err(PipelineError::ShapeMismatch {
            context,
            expected: shape,
            found: (b.zmax + 1, b.hmax + 1, b.wmax + 1),
        }),
    }
}
