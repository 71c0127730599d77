//! 运行时错误.

use crate::{Idx3d, InvalidCalibration};
use std::path::PathBuf;
use thiserror::Error;

/// 处理流程中的结构化错误.
///
/// 依赖检查和输入发现类错误总在创建任何输出文件之前报告.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 必需的外部服务/程序不可用. 致命错误, 在处理任何图像之前终止.
    #[error("missing dependency `{name}`: {reason}")]
    MissingDependency {
        /// 依赖名称.
        name: String,
        /// 具体原因.
        reason: String,
    },

    /// 输入位置中没有找到匹配的图像文件. 致命错误, 在处理任何图像之前终止.
    #[error("no `.{ext}` image found in {dir}")]
    NoInputFound {
        /// 被搜索的目录.
        dir: PathBuf,
        /// 期望的文件扩展名.
        ext: String,
    },

    /// 用户中止了参数选择步骤. 应当干净地退出.
    #[error("cancelled by user")]
    UserCancelled,

    /// 某一幅图像的元信息或数据无法读取.
    #[error("failed to read image {path}: {reason}")]
    ImageIo {
        /// 图像路径.
        path: PathBuf,
        /// 具体原因.
        reason: String,
    },

    /// 物理标定不合法.
    #[error(transparent)]
    Calibration(#[from] InvalidCalibration),

    /// 参与同一计算的两个体数据形状不一致.
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// 发生不一致的计算.
        context: &'static str,
        /// 期望形状 `(z, h, w)`.
        expected: Idx3d,
        /// 实际形状 `(z, h, w)`.
        found: Idx3d,
    },

    /// 体数据为空 (某一维长度为 0).
    #[error("empty volume in {0}")]
    EmptyVolume(&'static str),

    /// 通道选择或参数配置不合法.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 外部分割服务运行失败.
    #[error("segmentation service `{service}` failed: {reason}")]
    Segmentation {
        /// 服务名称.
        service: String,
        /// 具体原因.
        reason: String,
    },

    /// 读取 npy 文件错误.
    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    /// 写入 npy 文件错误.
    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    /// 写入结果表错误.
    #[error(transparent)]
    Table(#[from] csv::Error),

    /// 保存可视化图像错误.
    #[error(transparent)]
    Render(#[from] image::ImageError),

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// 以 `path` 和 `reason` 构造 [`PipelineError::ImageIo`].
    pub fn image_io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ImageIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// 处理流程运行时结果.
pub type PipelineResult<T> = Result<T, PipelineError>;
