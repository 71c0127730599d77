//! 体素物理标定.

use crate::consts::{DEFAULT_PIXEL_DEPTH, UNIT_MICRONS};
use std::borrow::Cow;
use thiserror::Error;

/// 体素物理尺寸. XY 方向各向同性, Z 方向为切片间距.
///
/// 每次处理流程中只创建一次, 之后以引用形式沿调用链传递, 不可修改.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calibration {
    pixel_width: f64,
    pixel_depth: f64,
    unit: Cow<'static, str>,
}

/// [`Calibration`] 初始化错误.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum InvalidCalibration {
    /// XY 方向像素尺寸不是有限正数.
    #[error("pixel width must be finite and positive, got {0}")]
    PixelWidth(f64),

    /// Z 方向切片间距不是有限正数.
    #[error("pixel depth must be finite and positive, got {0}")]
    PixelDepth(f64),
}

#[inline]
fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Calibration {
    /// 以微米为单位创建标定.
    ///
    /// `pixel_width` 和 `pixel_depth` 必须为有限正数, 否则返回 `Err`.
    pub fn new(pixel_width: f64, pixel_depth: f64) -> Result<Self, InvalidCalibration> {
        if !is_positive(pixel_width) {
            return Err(InvalidCalibration::PixelWidth(pixel_width));
        }
        if !is_positive(pixel_depth) {
            return Err(InvalidCalibration::PixelDepth(pixel_depth));
        }
        Ok(Self {
            pixel_width,
            pixel_depth,
            unit: Cow::Borrowed(UNIT_MICRONS),
        })
    }

    /// 从图像元信息创建标定. 缺失 (非正或非有限) 的 Z 方向间距按
    /// [`DEFAULT_PIXEL_DEPTH`] 处理.
    pub fn from_metadata(pixel_width: f64, pixel_depth: f64) -> Result<Self, InvalidCalibration> {
        let depth = if is_positive(pixel_depth) {
            pixel_depth
        } else {
            DEFAULT_PIXEL_DEPTH
        };
        Self::new(pixel_width, depth)
    }

    /// 单位体素标定, 即 `1 x 1 x 1`.
    #[inline]
    pub fn unit_voxel() -> Self {
        Self {
            pixel_width: 1.0,
            pixel_depth: 1.0,
            unit: Cow::Borrowed(UNIT_MICRONS),
        }
    }

    /// XY 方向像素尺寸.
    #[inline]
    pub fn pixel_width(&self) -> f64 {
        self.pixel_width
    }

    /// Z 方向切片间距.
    #[inline]
    pub fn pixel_depth(&self) -> f64 {
        self.pixel_depth
    }

    /// 长度单位名称.
    #[inline]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// 单个体素的物理体积, 即 `pixel_width² * pixel_depth`.
    #[inline]
    pub fn voxel_volume(&self) -> f64 {
        self.pixel_width * self.pixel_width * self.pixel_depth
    }

    /// 水平切片上单个像素的物理面积.
    #[inline]
    pub fn pixel_area(&self) -> f64 {
        self.pixel_width * self.pixel_width
    }

    /// 垂直于 X 或 Y 轴的体素面的物理面积.
    #[inline]
    pub fn side_face_area(&self) -> f64 {
        self.pixel_width * self.pixel_depth
    }

    /// `voxels` 个体素的物理体积.
    #[inline]
    pub fn volume_of(&self, voxels: usize) -> f64 {
        voxels as f64 * self.voxel_volume()
    }
}

#[cfg(test)]
mod tests {
    use super::{Calibration, InvalidCalibration};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_calibration_invalid_input() {
        assert_eq!(
            Calibration::new(0.0, 1.0).unwrap_err(),
            InvalidCalibration::PixelWidth(0.0)
        );
        assert_eq!(
            Calibration::new(1.0, -2.0).unwrap_err(),
            InvalidCalibration::PixelDepth(-2.0)
        );
        assert!(Calibration::new(f64::NAN, 1.0).is_err());
        assert!(Calibration::new(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_voxel_volume() {
        assert!(f64_eq(Calibration::unit_voxel().voxel_volume(), 1.0));
        assert!(f64_eq(Calibration::new(1.0, 1.0).unwrap().voxel_volume(), 1.0));

        for (w, d) in [(0.1, 0.5), (0.325, 1.0), (2.0, 3.0), (1e-3, 7.5)] {
            let cal = Calibration::new(w, d).unwrap();
            assert!(f64_eq(cal.voxel_volume(), w * w * d));
            assert!(f64_eq(cal.volume_of(10), 10.0 * w * w * d));
        }
    }

    #[test]
    fn test_missing_depth_falls_back() {
        let cal = Calibration::from_metadata(0.2, 0.0).unwrap();
        assert!(f64_eq(cal.pixel_depth(), 1.0));
        let cal = Calibration::from_metadata(0.2, f64::NAN).unwrap();
        assert!(f64_eq(cal.pixel_depth(), 1.0));
        assert!(Calibration::from_metadata(0.0, 1.0).is_err());
        assert_eq!(cal.unit(), "microns");
    }
}
