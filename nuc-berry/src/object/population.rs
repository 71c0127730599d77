use super::Nucleus3d;
use crate::config::SizeFilter;
use crate::{idx3d_to_u16, Calibration, Idx3dU16, LabelVolume};
use std::collections::HashMap;

/// 由标签体构建细胞核种群.
///
/// 1. 以标签在行优先扫描中首次出现的顺序解码所有候选物体;
/// 2. `single_slice_filter` 为 `true` 时丢弃只占据一层切片的物体;
/// 3. 丢弃体积在 `filter` 区间之外的物体 (边界值保留);
/// 4. 将幸存物体按原顺序重新编号为 `1..=N`.
///
/// 标签体全为背景时返回空 `Vec`. 体素集合按行优先序排列.
pub fn build_population(
    labels: &LabelVolume,
    cal: &Calibration,
    filter: &SizeFilter,
    single_slice_filter: bool,
) -> Vec<Nucleus3d> {
    let mut order: HashMap<u32, usize> = HashMap::new();
    let mut groups: Vec<(u32, Vec<Idx3dU16>)> = Vec::new();
    for (pos, label) in labels.foreground_iter() {
        let i = *order.entry(label).or_insert_with(|| {
            groups.push((label, Vec::new()));
            groups.len() - 1
        });
        groups[i].1.push(idx3d_to_u16(&pos));
    }
    let candidates = groups.len();

    let mut single_slice = 0usize;
    let mut out_of_range = 0usize;
    let mut nuclei: Vec<Nucleus3d> = groups
        .into_iter()
        .filter_map(|(label, voxels)| Nucleus3d::new(label, voxels))
        .filter(|n| {
            if single_slice_filter && n.bbox().is_single_slice() {
                single_slice += 1;
                return false;
            }
            if !filter.keeps(n.volume(cal)) {
                out_of_range += 1;
                return false;
            }
            true
        })
        .collect();
    for (i, n) in nuclei.iter_mut().enumerate() {
        n.relabel(i as u32 + 1);
    }

    log::debug!(
        "{candidates} candidates, {single_slice} single-slice and {out_of_range} out-of-range dropped, {} kept",
        nuclei.len()
    );
    nuclei
}

#[cfg(test)]
mod tests {
    use super::build_population;
    use crate::config::SizeFilter;
    use crate::{Calibration, LabelVolume};
    use ndarray::Array3;

    /// 在 `data` 中以 `label` 填充 `z0..z1`, `h0..h1`, `w0..w1` 的长方体.
    fn fill(data: &mut Array3<u32>, label: u32, z: (usize, usize), h: (usize, usize), w: (usize, usize)) {
        for zz in z.0..z.1 {
            for hh in h.0..h.1 {
                for ww in w.0..w.1 {
                    data[(zz, hh, ww)] = label;
                }
            }
        }
    }

    #[test]
    fn test_empty_volume() {
        let lv = LabelVolume::background((3, 4, 4)).unwrap();
        let f = SizeFilter::new(0.0, 1e9).unwrap();
        assert!(build_population(&lv, &Calibration::unit_voxel(), &f, true).is_empty());
    }

    #[test]
    fn test_dense_relabel_in_appearance_order() {
        let mut data = Array3::<u32>::zeros((2, 6, 6));
        fill(&mut data, 40, (0, 2), (0, 2), (0, 2));
        fill(&mut data, 7, (0, 2), (3, 5), (3, 5));
        fill(&mut data, 12, (0, 2), (0, 2), (4, 6));
        let lv = LabelVolume::new(data).unwrap();
        let f = SizeFilter::new(0.0, 1e9).unwrap();
        let pop = build_population(&lv, &Calibration::unit_voxel(), &f, true);

        assert_eq!(pop.len(), 3);
        assert_eq!(pop.iter().map(|n| n.label()).collect::<Vec<_>>(), vec![1, 2, 3]);
        // 40 最先出现, 然后是 12 (第 0 行), 最后是 7.
        assert!(pop[0].voxels().all(|(_, h, w)| h < 2 && w < 2));
        assert!(pop[1].voxels().all(|(_, _, w)| w >= 4));
        assert!(pop[2].voxels().all(|(_, h, _)| h >= 3));
        assert!(pop.iter().all(|n| n.voxel_count() == 8));
    }

    #[test]
    fn test_single_slice_filter() {
        let mut data = Array3::<u32>::zeros((3, 4, 4));
        fill(&mut data, 1, (1, 2), (0, 4), (0, 4));
        fill(&mut data, 2, (0, 3), (0, 1), (0, 1));
        let lv = LabelVolume::new(data).unwrap();
        let f = SizeFilter::new(0.0, 1e9).unwrap();
        let cal = Calibration::unit_voxel();

        let pop = build_population(&lv, &cal, &f, true);
        assert_eq!(pop.len(), 1);
        assert_eq!(pop[0].bbox().z_extent(), 3);
        assert_eq!(pop[0].label(), 1);

        assert_eq!(build_population(&lv, &cal, &f, false).len(), 2);
    }

    #[test]
    fn test_volume_bounds_are_inclusive() {
        let mut data = Array3::<u32>::zeros((2, 10, 10));
        // 体积 (0.5 * 0.5 * 2.0 = 0.5 每体素): 4 => 2.0, 8 => 4.0, 20 => 10.0
        fill(&mut data, 1, (0, 2), (0, 1), (0, 2));
        fill(&mut data, 2, (0, 2), (2, 4), (0, 2));
        fill(&mut data, 3, (0, 2), (5, 10), (5, 7));
        let lv = LabelVolume::new(data).unwrap();
        let cal = Calibration::new(0.5, 2.0).unwrap();

        let pop = build_population(&lv, &cal, &SizeFilter::new(2.0, 4.0).unwrap(), true);
        assert_eq!(pop.len(), 2);
        assert_eq!(pop[0].voxel_count(), 4);
        assert_eq!(pop[1].voxel_count(), 8);

        let pop = build_population(&lv, &cal, &SizeFilter::new(2.1, 3.9).unwrap(), true);
        assert!(pop.is_empty());
    }
}
