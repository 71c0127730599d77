//! 细胞标记: 单个细胞核与整幅图像的背景校正统计.
//!
//! 背景值是逐体素的强度估计, 因此校正量按体素个数缩放:
//! `corrected = raw - background * voxels`. 细胞质的体素个数由其物理体积除以
//! 体素体积得到.

use crate::cyto::compute_cyto_parameters;
use crate::error::PipelineResult;
use crate::filter::estimate_background;
use crate::measure::{measure_shape, raw_intensity};
use crate::object::{ensure_within, Nucleus3d};
use crate::{Calibration, Channel, CytoMask, VolumeAttr};

/// 单个细胞核的测量结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NucleusRecord {
    /// 细胞核标签, 从 1 开始.
    pub label: u32,
    /// 物理体积.
    pub volume: f64,
    /// 紧致度.
    pub compactness: f64,
    /// 球形度.
    pub sphericity: f64,
    /// 伸长率.
    pub elongation: f64,
    /// 扁平率.
    pub flatness: f64,
    /// lamin 通道背景校正后的积分强度. 没有 lamin 通道时为 0.
    pub lamin_intensity: f64,
    /// ORF1P 通道背景校正后的积分强度.
    pub orf1p_intensity: f64,
}

/// 整幅图像的汇总结果.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlobalRecord {
    /// 细胞核个数.
    pub nucleus_count: usize,
    /// 细胞核总体积.
    pub total_nucleus_volume: f64,
    /// lamin 通道背景. 没有 lamin 通道时为 0.
    pub lamin_background: f64,
    /// 所有细胞核 lamin 校正强度之和.
    pub total_lamin_intensity: f64,
    /// ORF1P 通道背景.
    pub orf1p_background: f64,
    /// 所有细胞核 ORF1P 校正强度之和.
    pub total_orf1p_intensity: f64,
    /// 细胞质体积.
    pub cytoplasm_volume: f64,
    /// 细胞质 ORF1P 校正强度.
    pub cytoplasm_intensity: f64,
}

/// 以背景 `bg` 校正覆盖 `voxels` 个体素的原始积分强度 `raw`.
#[inline]
pub fn correct_background(raw: f64, bg: f64, voxels: f64) -> f64 {
    raw - bg * voxels
}

/// 计算单个细胞核与整幅图像的统计量.
///
/// `lamin` 为 `None` 时所有 lamin 相关字段都严格为 0.
/// 通道与掩膜形状不一致, 或细胞核越界时返回 `Err`, 不产生部分结果.
pub fn tag_cells(
    orf1p: &Channel,
    lamin: Option<&Channel>,
    cyto: &CytoMask,
    nuclei: &[Nucleus3d],
    cal: &Calibration,
) -> PipelineResult<(Vec<NucleusRecord>, GlobalRecord)> {
    if let Some(lamin) = lamin {
        orf1p.ensure_same_shape(lamin, "lamin channel")?;
    }
    ensure_within(nuclei, orf1p.shape(), "nucleus voxels")?;

    let orf1p_background = estimate_background(orf1p);
    let lamin_background = lamin.map_or(0.0, estimate_background);
    log::debug!("background: ORF1P {orf1p_background}, lamin {lamin_background}");

    let cyto_params = compute_cyto_parameters(cyto, orf1p, cal)?;
    let cyto_voxels = cyto_params.volume / cal.voxel_volume();
    let mut global = GlobalRecord {
        nucleus_count: nuclei.len(),
        lamin_background,
        orf1p_background,
        cytoplasm_volume: cyto_params.volume,
        cytoplasm_intensity: correct_background(cyto_params.raw_intensity, orf1p_background, cyto_voxels),
        ..Default::default()
    };

    let records: Vec<NucleusRecord> = nuclei
        .iter()
        .map(|n| {
            let shape = measure_shape(n, cal);
            let voxels = n.voxel_count() as f64;
            let orf1p_intensity = correct_background(raw_intensity(n, orf1p), orf1p_background, voxels);
            let lamin_intensity = lamin.map_or(0.0, |ch| {
                correct_background(raw_intensity(n, ch), lamin_background, voxels)
            });
            NucleusRecord {
                label: n.label(),
                volume: shape.volume,
                compactness: shape.compactness,
                sphericity: shape.sphericity,
                elongation: shape.elongation,
                flatness: shape.flatness,
                lamin_intensity,
                orf1p_intensity,
            }
        })
        .collect();

    for r in records.iter() {
        global.total_nucleus_volume += r.volume;
        global.total_lamin_intensity += r.lamin_intensity;
        global.total_orf1p_intensity += r.orf1p_intensity;
    }
    Ok((records, global))
}

#[cfg(test)]
mod tests {
    use super::{correct_background, tag_cells, GlobalRecord};
    use crate::object::Nucleus3d;
    use crate::{Calibration, Channel, CytoMask, PipelineError};
    use ndarray::Array3;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    /// 背景为 `bg`, `nucleus` 体素强度为 `value` 的通道.
    fn channel_with(shape: (usize, usize, usize), bg: f32, nucleus: &Nucleus3d, value: f32) -> Channel {
        let mut data = Array3::from_elem(shape, bg);
        for pos in nucleus.voxels() {
            data[pos] = value;
        }
        Channel::new(data).unwrap()
    }

    fn cube(label: u32, origin: (u16, u16, u16), side: u16) -> Nucleus3d {
        let mut v = vec![];
        for z in 0..side {
            for h in 0..side {
                for w in 0..side {
                    v.push((origin.0 + z, origin.1 + h, origin.2 + w));
                }
            }
        }
        Nucleus3d::new(label, v).unwrap()
    }

    #[test]
    fn test_correct_background() {
        assert_eq!(correct_background(100.0, 2.0, 10.0), 80.0);
    }

    #[test]
    fn test_uniform_nucleus_correction() {
        let shape = (4, 12, 12);
        let n = cube(1, (0, 2, 2), 3);
        let orf1p = channel_with(shape, 10.0, &n, 50.0);
        let lamin = channel_with(shape, 4.0, &n, 7.0);
        let cyto = CytoMask::from_bools(Array3::from_elem(shape, false)).unwrap();
        let cal = Calibration::new(0.5, 2.0).unwrap();

        let (records, global) = tag_cells(&orf1p, Some(&lamin), &cyto, &[n], &cal).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.label, 1);
        assert!(f64_eq(r.volume, 27.0 * 0.5));
        assert!(f64_eq(r.orf1p_intensity, (50.0 - 10.0) * 27.0));
        assert!(f64_eq(r.lamin_intensity, (7.0 - 4.0) * 27.0));

        assert_eq!(global.nucleus_count, 1);
        assert_eq!(global.orf1p_background, 10.0);
        assert_eq!(global.lamin_background, 4.0);
        assert!(f64_eq(global.total_orf1p_intensity, r.orf1p_intensity));
        assert_eq!(global.cytoplasm_volume, 0.0);
        assert_eq!(global.cytoplasm_intensity, 0.0);
    }

    #[test]
    fn test_missing_lamin_is_zero() {
        let shape = (3, 8, 8);
        let n = cube(1, (0, 0, 0), 2);
        let orf1p = channel_with(shape, 1.0, &n, 3.0);
        let mut m = Array3::from_elem(shape, false);
        m[(2, 7, 7)] = true;
        m[(1, 7, 7)] = true;
        let cyto = CytoMask::from_bools(m).unwrap();
        let cal = Calibration::unit_voxel();

        let (records, global) = tag_cells(&orf1p, None, &cyto, &[n], &cal).unwrap();
        assert_eq!(records[0].lamin_intensity, 0.0);
        assert_eq!(global.lamin_background, 0.0);
        assert_eq!(global.total_lamin_intensity, 0.0);
        // 细胞质: 2 个背景体素, 原始强度 2, 校正后为 0.
        assert!(f64_eq(global.cytoplasm_volume, 2.0));
        assert!(f64_eq(global.cytoplasm_intensity, 0.0));
        assert!(f64_eq(records[0].orf1p_intensity, 16.0));
    }

    #[test]
    fn test_no_nuclei() {
        let orf1p = Channel::uniform((2, 4, 4), 5.0).unwrap();
        let cyto = CytoMask::from_bools(Array3::from_elem((2, 4, 4), false)).unwrap();
        let (records, global) =
            tag_cells(&orf1p, None, &cyto, &[], &Calibration::unit_voxel()).unwrap();
        assert!(records.is_empty());
        assert_eq!(
            global,
            GlobalRecord {
                orf1p_background: 5.0,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let orf1p = Channel::uniform((2, 4, 4), 5.0).unwrap();
        let lamin = Channel::uniform((2, 4, 5), 5.0).unwrap();
        let cyto = CytoMask::from_bools(Array3::from_elem((2, 4, 4), false)).unwrap();
        let r = tag_cells(&orf1p, Some(&lamin), &cyto, &[], &Calibration::unit_voxel());
        assert!(matches!(r, Err(PipelineError::ShapeMismatch { .. })));

        let cyto = CytoMask::from_bools(Array3::from_elem((3, 4, 4), false)).unwrap();
        assert!(tag_cells(&orf1p, None, &cyto, &[], &Calibration::unit_voxel()).is_err());
    }
}
