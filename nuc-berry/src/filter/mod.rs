//! 体数据滤波与统计原语.
//!
//! 高斯模糊以 [`GaussianFilter`] trait 抽象, 便于替换为 GPU 等外部实现.
//! 本 crate 自带 CPU 实现 [`CpuGaussian`].

use ndarray::{Array3, ArrayView3};

mod gaussian;
mod median;
mod projection;
mod threshold;

pub use gaussian::CpuGaussian;
pub use median::{binary_median, MedianKernel};
pub use projection::{estimate_background, median_of};
pub use threshold::{huang_level, Histogram};

/// 可分离三维高斯模糊原语.
///
/// 输出必须与输入形状一致. `sigma_xy` 以像素为单位, `sigma_z` 以切片为单位.
pub trait GaussianFilter {
    /// 对 `volume` 做高斯模糊并返回新的体数据.
    fn blur(&self, volume: ArrayView3<f32>, sigma_xy: f64, sigma_z: f64) -> Array3<f32>;
}
