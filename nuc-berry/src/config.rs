//! 处理流程参数.
//!
//! 所有参数集中在强类型的不可变记录 [`PipelineConfig`] 中, 缺省值见 [`crate::consts`].

use crate::consts::*;
use crate::error::{PipelineError, PipelineResult};
use crate::segment::SegmentSettings;
use crate::Calibration;

/// 细胞核体积过滤区间, 单位为立方微米.
///
/// 体积严格小于 `min_volume` 或严格大于 `max_volume` 的物体被丢弃,
/// 即恰好等于边界的物体会被保留.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeFilter {
    /// 最小体积.
    pub min_volume: f64,
    /// 最大体积.
    pub max_volume: f64,
}

impl Default for SizeFilter {
    fn default() -> Self {
        Self {
            min_volume: DEFAULT_MIN_NUCLEUS_VOLUME,
            max_volume: DEFAULT_MAX_NUCLEUS_VOLUME,
        }
    }
}

impl SizeFilter {
    /// 构建过滤区间. 要求 `0 <= min <= max`, 否则返回 `None`.
    pub fn new(min_volume: f64, max_volume: f64) -> Option<Self> {
        (min_volume >= 0.0 && min_volume <= max_volume).then_some(Self {
            min_volume,
            max_volume,
        })
    }

    /// 体积 `volume` 是否应当被保留?
    #[inline]
    pub fn keeps(&self, volume: f64) -> bool {
        !(volume < self.min_volume || volume > self.max_volume)
    }
}

/// 单个通道的选择方式.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelChoice {
    /// 通道索引, 从 0 开始.
    Index(usize),
    /// 通道名称, 与图像元信息中发现的名称完全匹配.
    Name(String),
    /// 不使用该通道.
    None,
}

impl ChannelChoice {
    /// 从命令行风格的字符串解析: 纯数字视为索引, `"None"` 视为不使用, 其余视为名称.
    pub fn parse(s: &str) -> Self {
        if s == CHANNEL_NONE {
            Self::None
        } else if let Ok(i) = s.parse::<usize>() {
            Self::Index(i)
        } else {
            Self::Name(s.to_string())
        }
    }

    /// 在 `names` 中定位该通道. `ChannelChoice::None` 返回 `Ok(None)`.
    fn resolve(&self, names: &[String], role: &str) -> PipelineResult<Option<usize>> {
        match self {
            Self::None => Ok(None),
            Self::Index(i) if *i < names.len() => Ok(Some(*i)),
            Self::Index(i) => Err(PipelineError::Config(format!(
                "{role} channel index {i} out of range ({} channels)",
                names.len()
            ))),
            Self::Name(n) => names
                .iter()
                .position(|x| x == n)
                .map(Some)
                .ok_or_else(|| PipelineError::Config(format!("{role} channel `{n}` not found"))),
        }
    }
}

/// 三个通道的选择: 细胞核, lamin (可选), ORF1P.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelSelection {
    /// 细胞核 (DAPI) 通道, 用于分割.
    pub nucleus: ChannelChoice,
    /// lamin 通道. 允许为 [`ChannelChoice::None`].
    pub lamin: ChannelChoice,
    /// ORF1P 通道, 用于细胞质提取和强度测量.
    pub orf1p: ChannelChoice,
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self {
            nucleus: ChannelChoice::Index(0),
            lamin: ChannelChoice::Index(1),
            orf1p: ChannelChoice::Index(2),
        }
    }
}

/// 解析后的通道索引.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChannels {
    /// 细胞核通道索引.
    pub nucleus: usize,
    /// lamin 通道索引, 不使用时为 `None`.
    pub lamin: Option<usize>,
    /// ORF1P 通道索引.
    pub orf1p: usize,
}

impl ChannelSelection {
    /// 在通道名称列表 `names` 中解析三个通道.
    ///
    /// 细胞核和 ORF1P 通道是必需的, 选择 `None` 或找不到时返回 `Err`.
    pub fn resolve(&self, names: &[String]) -> PipelineResult<ResolvedChannels> {
        let required = |choice: &ChannelChoice, role: &str| {
            choice.resolve(names, role)?.ok_or_else(|| {
                PipelineError::Config(format!("{role} channel is required but `None` was chosen"))
            })
        };
        Ok(ResolvedChannels {
            nucleus: required(&self.nucleus, "nucleus")?,
            lamin: self.lamin.resolve(names, "lamin")?,
            orf1p: required(&self.orf1p, "ORF1P")?,
        })
    }
}

/// 细胞质提取参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CytoSettings {
    /// 高斯模糊 XY 方向 sigma, 单位为像素.
    pub sigma_xy: f64,
    /// 高斯模糊 Z 方向 sigma, 单位为切片.
    pub sigma_z: f64,
    /// 二值中值滤波的 XY 半径, 单位为像素. Z 半径按体素各向异性换算.
    pub median_radius: f64,
}

impl Default for CytoSettings {
    fn default() -> Self {
        Self {
            sigma_xy: DEFAULT_GAUSSIAN_SIGMA_XY,
            sigma_z: DEFAULT_GAUSSIAN_SIGMA_Z,
            median_radius: DEFAULT_MEDIAN_RADIUS,
        }
    }
}

/// 单幅图像处理失败时的策略.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// 终止整个批处理. 已写入的结果保持有效.
    #[default]
    Abort,
    /// 记录失败的图像并继续处理下一幅.
    SkipAndReport,
}

/// 处理流程的全部参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// 通道选择.
    pub channels: ChannelSelection,
    /// 细胞核体积过滤区间.
    pub size_filter: SizeFilter,
    /// 是否丢弃只跨越一层切片的物体.
    pub single_slice_filter: bool,
    /// 手动指定的标定. 为 `None` 时使用第一幅图像的元信息.
    pub calibration: Option<Calibration>,
    /// 分割服务参数.
    pub segment: SegmentSettings,
    /// 细胞质提取参数.
    pub cyto: CytoSettings,
    /// 输入图像扩展名 (不含 `.`).
    pub image_ext: String,
    /// 是否输出叠加可视化图像.
    pub render: bool,
    /// 单幅图像失败时的策略.
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: ChannelSelection::default(),
            size_filter: SizeFilter::default(),
            single_slice_filter: true,
            calibration: None,
            segment: SegmentSettings::default(),
            cyto: CytoSettings::default(),
            image_ext: "nii".to_string(),
            render: true,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// 参数确认步骤. 对应交互式参数对话框.
///
/// 返回 `None` 代表用户取消, 处理流程会以 [`PipelineError::UserCancelled`] 干净地结束.
pub trait ParameterDialog {
    /// 展示发现的通道名称 `channels` (末尾包含 `"None"`) 和标定 `calibration`,
    /// 返回最终确认的参数.
    fn review(
        &mut self,
        channels: &[String],
        calibration: &Calibration,
        config: PipelineConfig,
    ) -> Option<PipelineConfig>;
}

/// 不做任何修改, 直接接受给定参数.
#[derive(Copy, Clone, Debug, Default)]
pub struct AcceptDefaults;

impl ParameterDialog for AcceptDefaults {
    #[inline]
    fn review(&mut self, _: &[String], _: &Calibration, config: PipelineConfig) -> Option<PipelineConfig> {
        Some(config)
    }
}
