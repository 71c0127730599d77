#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对三维荧光显微图像栈进行细胞核分割编排, 重建每幅图像的细胞质区域,
//! 并在背景校正后计算单个细胞核与整幅图像的强度/形态学统计量.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 深度学习分割模型本身不在本 crate 内实现, 而是通过
//!   [`segment::SegmentationService`] 抽象为外部服务.
//! 2. 三维体数据统一按 `(z, h, w)` 的形状存储, 二维切片按 `(h, w)` 存储.
//! 3. 处理流程按图像顺序执行: 一幅图像的所有缓冲区在下一幅图像开始前释放.
//!
//! # 开发计划
//!
//! ### 细胞核种群构建 ✅
//!
//! 标签体数据解码, 单切片过滤, 体积过滤, 稠密重编号.
//!
//! 实现位于 `nuc-berry/src/object`.
//!
//! ### 体积与形状测量 ✅
//!
//! 体积, 紧致度, 球形度, 椭球拟合得到的伸长率和扁平率.
//!
//! 实现位于 `nuc-berry/src/measure`.
//!
//! ### 背景估计 ✅
//!
//! Z 方向最小值投影 + 中位数.
//!
//! 实现位于 `nuc-berry/src/filter/projection.rs`.
//!
//! ### 细胞质提取 ✅
//!
//! 高斯模糊, Huang 自动阈值, 二值中值滤波, 擦除细胞核体素, 逐切片面积/强度累加.
//!
//! 实现位于 `nuc-berry/src/cyto.rs`.
//!
//! ### 细胞标记 (核心统计) ✅
//!
//! 实现位于 `nuc-berry/src/tagger.rs`.
//!
//! ### 结果输出 ✅
//!
//! 制表符分隔的结果表, 以及逐切片的彩色叠加可视化.
//!
//! 实现位于 `nuc-berry/src/io`.
//!
//! ### 批处理 ✅
//!
//! 实现位于 `nuc-berry/src/pipeline.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 压缩存储优化时会用到. 细胞核体素集合以该格式保存.
pub type Idx3dU16 = (u16, u16, u16);

/// &Idx3d -> Idx3dU16. 调用方负责保证不溢出.
#[inline]
pub(crate) const fn idx3d_to_u16((z, h, w): &Idx3d) -> Idx3dU16 {
    (*z as u16, *h as u16, *w as u16)
}

/// &Idx3dU16 -> Idx3d
#[inline]
pub(crate) const fn idx3du16_to_usize((z, h, w): &Idx3dU16) -> Idx3d {
    (*z as usize, *h as usize, *w as usize)
}

/// 三维图像体数据结构: 物理标定, 强度通道, 标签体, 二值掩膜.
mod data;

pub use data::window::IntensityWindow;
pub use data::{Calibration, Channel, CytoMask, InvalidCalibration, LabelVolume, VolumeAttr};

pub mod config;
pub mod consts;
pub mod cyto;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod io;
pub mod measure;
pub mod object;
pub mod pipeline;
pub mod prelude;
pub mod segment;
pub mod tagger;

pub use error::{PipelineError, PipelineResult};
