use super::{ensure_non_empty, VolumeAttr};
use crate::consts::gray::*;
use crate::error::PipelineResult;
use crate::Idx3d;
use ndarray::{Array3, ArrayView2, ArrayView3, Axis};
use std::ops::Index;

/// 细胞质二值掩膜. 前景为 [`MASK_FOREGROUND`], 背景为 [`MASK_BACKGROUND`].
///
/// 与强度通道同形状, 代表逐切片的 "细胞质且非细胞核" 体素.
/// 只在一幅图像的处理过程中存活, 仅其聚合体积与强度会进入最终结果.
#[derive(Debug, Clone)]
pub struct CytoMask {
    data: Array3<u8>,
}

impl VolumeAttr for CytoMask {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl Index<Idx3d> for CytoMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl CytoMask {
    /// 直接以二值数据创建掩膜. 任何非零值都会被规范化为 [`MASK_FOREGROUND`].
    pub fn new(mut data: Array3<u8>) -> PipelineResult<Self> {
        ensure_non_empty(&data, "cytoplasm mask")?;
        data.mapv_inplace(|p| if is_foreground(p) { MASK_FOREGROUND } else { MASK_BACKGROUND });
        Ok(Self { data })
    }

    /// 以布尔数组创建掩膜, `true` 为前景.
    pub fn from_bools(data: Array3<bool>) -> PipelineResult<Self> {
        Self::new(data.mapv(|b| if b { MASK_FOREGROUND } else { MASK_BACKGROUND }))
    }

    /// 获取第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 获取能按升序迭代掩膜水平切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, u8>> {
        self.data.axis_iter(Axis(0))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 位置 `pos` 是否为前景. 越界时 panic.
    #[inline]
    pub fn is_foreground(&self, pos: Idx3d) -> bool {
        is_foreground(self.data[pos])
    }

    /// 前景体素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&p| is_foreground(p)).count()
    }

    /// 将 `it` 给出的所有体素设置为背景. 返回原本是前景的体素个数.
    ///
    /// 如果存在越界索引, 则程序 panic.
    pub fn erase<I: IntoIterator<Item = Idx3d>>(&mut self, it: I) -> usize {
        let mut cnt = 0usize;
        for pos in it {
            let p = &mut self.data[pos];
            if is_foreground(*p) {
                cnt += 1;
            }
            *p = MASK_BACKGROUND;
        }
        cnt
    }
}
