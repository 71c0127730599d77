//! 细胞核的体积与形状测量.
//!
//! 所有量都在物理空间中计算, 体素各向异性由 [`Calibration`] 校正.
//!
//! 1. 体积: 体素个数乘以体素体积.
//! 2. 紧致度: `36πV² / S³`, 球体为 1. 表面积 `S` 由暴露的体素面面积除以
//!   平均投影系数 1.5 得到.
//! 3. 球形度: 紧致度的立方根.
//! 4. 伸长率与扁平率: 由体素物理坐标的协方差矩阵拟合等矩椭球,
//!   半轴长 `r1 >= r2 >= r3`, 伸长率为 `r1 / r2`, 扁平率为 `r2 / r3`.
//!   分母为 0 (例如单个体素或共面的物体) 时为 `NaN`.

use crate::object::Nucleus3d;
use crate::{Calibration, Channel};
use std::f64::consts::PI;

mod ellipsoid;
mod surface;

/// 单个细胞核的形状描述子.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeMeasures {
    /// 物理体积.
    pub volume: f64,
    /// 表面积.
    pub surface_area: f64,
    /// 紧致度.
    pub compactness: f64,
    /// 球形度.
    pub sphericity: f64,
    /// 伸长率.
    pub elongation: f64,
    /// 扁平率.
    pub flatness: f64,
}

/// 测量细胞核 `nucleus` 的体积与形状.
pub fn measure_shape(nucleus: &Nucleus3d, cal: &Calibration) -> ShapeMeasures {
    let volume = nucleus.volume(cal);
    let surface_area = surface::surface_area(nucleus, cal);
    let compactness = 36.0 * PI * volume * volume / surface_area.powi(3);
    let [r1, r2, r3] = ellipsoid::ellipsoid_radii(nucleus, cal);
    ShapeMeasures {
        volume,
        surface_area,
        compactness,
        sphericity: compactness.cbrt(),
        elongation: ellipsoid::ratio(r1, r2),
        flatness: ellipsoid::ratio(r2, r3),
    }
}

/// 细胞核在通道 `channel` 中的原始积分强度.
///
/// 调用方负责保证 `nucleus` 的体素都落在 `channel` 内.
#[inline]
pub fn raw_intensity(nucleus: &Nucleus3d, channel: &Channel) -> f64 {
    channel.sum_at(nucleus.voxels())
}
