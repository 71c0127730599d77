//! 细胞核分割编排.
//!
//! 深度学习分割模型本身不在本 crate 内实现. [`SegmentationService`]
//! 抽象了 "输入灰度体数据, 输出三维标签体" 这一能力, 由 [`find_nuclei`]
//! 负责缩放, 调用服务, 恢复分辨率, 再交给细胞核种群构建.
//!
//! 自带两种实现:
//!
//! 1. [`NpyMaskService`]: 读取预先计算好的 `<图像名>_masks.npy`;
//! 2. [`CommandService`]: 以 `.npy` 文件为媒介调用外部程序.

use crate::config::SizeFilter;
use crate::consts::*;
use crate::error::{PipelineError, PipelineResult};
use crate::object::{build_population, Nucleus3d};
use crate::{Calibration, Channel, LabelVolume, VolumeAttr};
use ndarray::ArrayView3;

mod command;
mod npy;
mod resize;

pub use command::CommandService;
pub use npy::{read_labels, NpyMaskService};
pub use resize::{resize_xy, scaled_len};

/// 分割服务参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentSettings {
    /// 模型名称.
    pub model: String,
    /// 细胞核直径提示, 单位为源图像像素.
    pub diameter: u32,
    /// 相邻切片二维检测结果合并为三维物体所需的最小重叠比例.
    pub stitch_threshold: f64,
    /// 调用服务前 XY 方向的缩放比例. `None` 表示不缩放.
    pub resize_factor: Option<f64>,
    /// 是否使用 GPU.
    pub use_gpu: bool,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_SEGMENT_MODEL.to_string(),
            diameter: DEFAULT_SEGMENT_DIAMETER,
            stitch_threshold: DEFAULT_STITCH_THRESHOLD,
            resize_factor: Some(DEFAULT_RESIZE_FACTOR),
            use_gpu: false,
        }
    }
}

/// 一次分割请求.
#[derive(Clone, Debug)]
pub struct SegmentRequest<'a> {
    /// 图像名称 (不含扩展名).
    pub image_name: &'a str,
    /// 待分割的灰度体数据, 可能已经过缩放.
    pub volume: ArrayView3<'a, f32>,
    /// 模型名称.
    pub model: &'a str,
    /// 按缩放比例换算后的直径提示, 单位为 `volume` 的像素.
    pub diameter: f64,
    /// 切片合并阈值.
    pub stitch_threshold: f64,
    /// 是否使用 GPU.
    pub use_gpu: bool,
}

/// 外部分割服务.
pub trait SegmentationService {
    /// 服务名称, 用于日志与错误信息.
    fn name(&self) -> &str;

    /// 检查服务是否可用. 不可用时返回 [`PipelineError::MissingDependency`].
    ///
    /// 批处理会在创建任何输出之前调用该函数.
    fn check_available(&self) -> PipelineResult<()>;

    /// 分割 `request.volume`, 返回三维标签体.
    ///
    /// 返回的标签体应当与 `request.volume` 同形状, 也允许直接返回源分辨率的结果.
    fn segment(&self, request: &SegmentRequest<'_>) -> PipelineResult<LabelVolume>;
}

/// 分割细胞核通道并构建细胞核种群.
///
/// `settings.resize_factor` 为 `Some(f)` 且 `f != 1` 时, 先在 XY 平面最近邻缩放,
/// 直径提示同比例缩放, 分割结果再以最近邻恢复到源分辨率.
pub fn find_nuclei<S: SegmentationService + ?Sized>(
    service: &S,
    image_name: &str,
    channel: &Channel,
    settings: &SegmentSettings,
    cal: &Calibration,
    filter: &SizeFilter,
    single_slice_filter: bool,
) -> PipelineResult<Vec<Nucleus3d>> {
    let (len_z, src_h, src_w) = channel.shape();
    let factor = match settings.resize_factor {
        Some(f) if !(f.is_finite() && f > 0.0) => {
            return Err(PipelineError::Config(format!("invalid resize factor {f}")));
        }
        Some(f) if f != 1.0 => Some(f),
        _ => None,
    };

    let resized = factor.map(|f| {
        resize_xy(channel.data(), (scaled_len(src_h, f), scaled_len(src_w, f)))
    });
    let volume = resized.as_ref().map_or(channel.data(), |a| a.view());
    let request = SegmentRequest {
        image_name,
        volume,
        model: &settings.model,
        diameter: settings.diameter as f64 * factor.unwrap_or(1.0),
        stitch_threshold: settings.stitch_threshold,
        use_gpu: settings.use_gpu,
    };
    log::info!(
        "segmenting {image_name} with `{}` ({:?}, diameter {:.1})",
        service.name(),
        request.volume.dim(),
        request.diameter
    );
    let labels = service.segment(&request)?;
    let requested = request.volume.dim();
    drop(resized);

    let labels = if labels.shape() == channel.shape() {
        labels
    } else if labels.shape() == requested {
        LabelVolume::new(resize_xy(labels.data(), (src_h, src_w)))?
    } else {
        return Err(PipelineError::ShapeMismatch {
            context: "segmentation output",
            expected: (len_z, src_h, src_w),
            found: labels.shape(),
        });
    };

    let nuclei = build_population(&labels, cal, filter, single_slice_filter);
    log::info!("{image_name}: {} nuclei", nuclei.len());
    Ok(nuclei)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::cell::RefCell;

    /// 把强度大于 `level` 的体素标为 1, 并记录收到的请求.
    struct ThresholdStub {
        level: f32,
        seen: RefCell<Vec<((usize, usize, usize), f64)>>,
    }

    impl SegmentationService for ThresholdStub {
        fn name(&self) -> &str {
            "threshold-stub"
        }

        fn check_available(&self) -> PipelineResult<()> {
            Ok(())
        }

        fn segment(&self, request: &SegmentRequest<'_>) -> PipelineResult<LabelVolume> {
            self.seen.borrow_mut().push((request.volume.dim(), request.diameter));
            LabelVolume::new(request.volume.mapv(|v| u32::from(v > self.level)))
        }
    }

    fn stub() -> ThresholdStub {
        ThresholdStub {
            level: 0.5,
            seen: RefCell::new(vec![]),
        }
    }

    fn block_channel() -> Channel {
        let mut data = Array3::<f32>::zeros((3, 8, 8));
        for z in 0..3 {
            for h in 2..6 {
                for w in 2..6 {
                    data[(z, h, w)] = 1.0;
                }
            }
        }
        Channel::new(data).unwrap()
    }

    #[test]
    fn test_find_nuclei_resizes_and_restores() {
        let ch = block_channel();
        let s = stub();
        let f = SizeFilter::new(0.0, 1e9).unwrap();
        let settings = SegmentSettings::default();
        let nuclei = find_nuclei(&s, "img", &ch, &settings, &Calibration::unit_voxel(), &f, true).unwrap();

        assert_eq!(s.seen.borrow().as_slice(), &[((3, 4, 4), 50.0)]);
        assert_eq!(nuclei.len(), 1);
        assert_eq!(nuclei[0].voxel_count(), 3 * 16);
        let b = nuclei[0].bbox();
        assert_eq!((b.hmin, b.hmax, b.wmin, b.wmax), (2, 5, 2, 5));
    }

    #[test]
    fn test_find_nuclei_odd_size_truncates() {
        let data = Array3::<f32>::from_elem((2, 9, 7), 1.0);
        let ch = Channel::new(data).unwrap();
        let s = stub();
        let f = SizeFilter::new(0.0, 1e9).unwrap();
        let nuclei = find_nuclei(&s, "img", &ch, &SegmentSettings::default(), &Calibration::unit_voxel(), &f, true).unwrap();
        assert_eq!(s.seen.borrow()[0].0, (2, 4, 3));
        assert_eq!(nuclei[0].voxel_count(), 2 * 9 * 7);
    }

    #[test]
    fn test_find_nuclei_without_resize() {
        let ch = block_channel();
        let s = stub();
        let settings = SegmentSettings {
            resize_factor: None,
            ..Default::default()
        };
        let f = SizeFilter::new(0.0, 1e9).unwrap();
        let nuclei = find_nuclei(&s, "img", &ch, &settings, &Calibration::unit_voxel(), &f, true).unwrap();
        assert_eq!(s.seen.borrow()[0], ((3, 8, 8), 100.0));
        assert_eq!(nuclei[0].voxel_count(), 3 * 16);
    }

    #[test]
    fn test_find_nuclei_rejects_bad_output() {
        struct Wrong;
        impl SegmentationService for Wrong {
            fn name(&self) -> &str {
                "wrong"
            }
            fn check_available(&self) -> PipelineResult<()> {
                Ok(())
            }
            fn segment(&self, _: &SegmentRequest<'_>) -> PipelineResult<LabelVolume> {
                LabelVolume::background((1, 1, 1))
            }
        }
        let f = SizeFilter::default();
        let r = find_nuclei(&Wrong, "img", &block_channel(), &SegmentSettings::default(), &Calibration::unit_voxel(), &f, true);
        assert!(matches!(r, Err(PipelineError::ShapeMismatch { .. })));

        let bad = SegmentSettings {
            resize_factor: Some(0.0),
            ..Default::default()
        };
        let r = find_nuclei(&stub(), "img", &block_channel(), &bad, &Calibration::unit_voxel(), &f, true);
        assert!(matches!(r, Err(PipelineError::Config(_))));
    }
}
