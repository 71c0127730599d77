use ndarray::{ArrayBase, Data, Ix3};

use crate::error::{PipelineError, PipelineResult};
use crate::Idx3d;

mod calib;
mod channel;
mod label;
mod mask;
pub mod window;

pub use calib::{Calibration, InvalidCalibration};
pub use channel::Channel;
pub use label::LabelVolume;
pub use mask::CytoMask;

/// 三维体数据的共用属性和部分通用操作.
///
/// 所有实现者均按 `(z, h, w)` 存储数据.
pub trait VolumeAttr {
    /// 获取数据形状大小 `(z, h, w)`.
    fn shape(&self) -> Idx3d;

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 检查 `other` 是否与 `self` 形状相同, 不同时返回 [`PipelineError::ShapeMismatch`].
    #[inline]
    fn ensure_same_shape<V: VolumeAttr + ?Sized>(
        &self,
        other: &V,
        context: &'static str,
    ) -> PipelineResult<()> {
        if self.shape() == other.shape() {
            Ok(())
        } else {
            Err(PipelineError::ShapeMismatch {
                context,
                expected: self.shape(),
                found: other.shape(),
            })
        }
    }
}

/// 三维数组任一维长度为 0 时返回 [`PipelineError::EmptyVolume`].
#[inline]
pub(crate) fn ensure_non_empty<S: Data>(
    data: &ArrayBase<S, Ix3>,
    context: &'static str,
) -> PipelineResult<()> {
    if data.is_empty() {
        Err(PipelineError::EmptyVolume(context))
    } else {
        Ok(())
    }
}

/// 中间切片索引, 即 `len_z / 2` 号切片 (从 1 开始计数) 对应的 0 起始索引.
#[inline]
pub(crate) fn middle_slice(len_z: usize) -> usize {
    (len_z / 2).max(1) - 1
}

#[cfg(test)]
mod tests {
    use super::middle_slice;

    #[test]
    fn test_middle_slice() {
        assert_eq!(middle_slice(1), 0);
        assert_eq!(middle_slice(2), 0);
        assert_eq!(middle_slice(3), 0);
        assert_eq!(middle_slice(4), 1);
        assert_eq!(middle_slice(31), 14);
    }
}
