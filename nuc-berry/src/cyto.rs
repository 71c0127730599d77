//! 细胞质提取.
//!
//! 在 ORF1P 通道上依次进行:
//!
//! 1. 三维高斯模糊;
//! 2. 以中间切片的 Huang 自动阈值对整个图像栈二值化 (暗背景);
//! 3. 椭球核二值中值滤波平滑;
//! 4. 擦除所有细胞核体素, 得到 "细胞质且非细胞核" 掩膜.
//!
//! 之后逐切片累加面积与原始强度, 得到细胞质体积与积分强度.

use crate::config::CytoSettings;
use crate::consts::gray::*;
use crate::data::middle_slice;
use crate::error::{PipelineError, PipelineResult};
use crate::filter::{binary_median, GaussianFilter, Histogram, MedianKernel};
use crate::object::{ensure_within, Nucleus3d};
use crate::{Calibration, Channel, CytoMask, VolumeAttr};
use itertools::izip;
use ndarray::{Axis, Zip};

/// 细胞质的聚合参数.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CytoParams {
    /// 物理体积, 即各切片面积之和乘以切片间距.
    pub volume: f64,
    /// 掩膜内的原始积分强度.
    pub raw_intensity: f64,
}

/// 由 ORF1P 通道和细胞核种群提取细胞质掩膜.
///
/// 返回的掩膜与 `channel` 同形状, 且不包含任何细胞核体素.
/// 当 `filter` 输出形状与输入不一致, 或有细胞核体素落在通道之外时返回 `Err`.
pub fn extract_cytoplasm<G: GaussianFilter + ?Sized>(
    channel: &Channel,
    nuclei: &[Nucleus3d],
    settings: &CytoSettings,
    cal: &Calibration,
    filter: &G,
) -> PipelineResult<CytoMask> {
    let shape = channel.shape();
    ensure_within(nuclei, shape, "cytoplasm extraction")?;

    let blurred = filter.blur(channel.data(), settings.sigma_xy, settings.sigma_z);
    if blurred.dim() != shape {
        return Err(PipelineError::ShapeMismatch {
            context: "gaussian filter output",
            expected: shape,
            found: blurred.dim(),
        });
    }

    let mid = middle_slice(channel.len_z());
    let hist = Histogram::from_slice(blurred.index_axis(Axis(0), mid));
    let level = hist.huang();
    log::debug!("huang level {level} on slice {mid}");
    let binary = blurred.mapv(|v| {
        if hist.bin_of(v) > level {
            MASK_FOREGROUND
        } else {
            MASK_BACKGROUND
        }
    });
    drop(blurred);

    let kernel = MedianKernel::for_calibration(settings.median_radius, cal);
    let mut mask = CytoMask::new(binary_median(binary.view(), &kernel))?;
    let erased: usize = nuclei.iter().map(|n| mask.erase(n.voxels())).sum();
    log::debug!(
        "cytoplasm mask: {} voxels after removing {erased} nucleus voxels",
        mask.count_foreground()
    );
    Ok(mask)
}

/// 逐切片计算细胞质面积与强度, 并汇总为体积与积分强度.
///
/// 空切片的面积与强度都为 0. `mask` 与 `channel` 形状不一致时返回 `Err`.
pub fn compute_cyto_parameters(
    mask: &CytoMask,
    channel: &Channel,
    cal: &Calibration,
) -> PipelineResult<CytoParams> {
    channel.ensure_same_shape(mask, "cytoplasm parameters")?;

    let mut area = 0.0f64;
    let mut raw_intensity = 0.0f64;
    let mut empty = 0usize;
    for (m, c) in izip!(mask.slice_iter(), channel.slice_iter()) {
        let (mut cnt, mut sum) = (0usize, 0.0f64);
        Zip::from(&m).and(&c).for_each(|&p, &v| {
            if is_foreground(p) {
                cnt += 1;
                sum += v as f64;
            }
        });
        if cnt == 0 {
            empty += 1;
        }
        area += cnt as f64 * cal.pixel_area();
        raw_intensity += sum;
    }
    if empty > 0 {
        log::debug!("{empty} of {} slices have no cytoplasm", mask.len_z());
    }

    Ok(CytoParams {
        volume: area * cal.pixel_depth(),
        raw_intensity,
    })
}
