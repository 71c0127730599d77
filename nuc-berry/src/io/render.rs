//! 结果可视化的持久化存储.

use crate::consts::{gray::*, LABEL_BACKGROUND};
use crate::error::{PipelineError, PipelineResult};
use crate::object::Nucleus3d;
use crate::{Channel, CytoMask, IntensityWindow, VolumeAttr};
use image::{Rgb, RgbImage};
use ndarray::{Array3, ArrayView2};
use std::path::{Path, PathBuf};

/// 细胞核内部像素的蓝色分量下限.
const NUCLEUS_FILL: u8 = 96;

/// 切片 `labels` 上的 `(h, w)` 是否位于某个细胞核的边缘 (4-邻域中存在不同标签)?
fn is_outline(labels: &ArrayView2<u32>, h: usize, w: usize) -> bool {
    let (len_h, len_w) = labels.dim();
    let l = labels[(h, w)];
    if l == LABEL_BACKGROUND {
        return false;
    }
    h == 0
        || w == 0
        || h + 1 == len_h
        || w + 1 == len_w
        || labels[(h - 1, w)] != l
        || labels[(h + 1, w)] != l
        || labels[(h, w - 1)] != l
        || labels[(h, w + 1)] != l
}

/// 将一幅图像的分析结果逐切片绘制为 RGB PNG, 保存在 `<out_dir>/<image_name>/` 下.
///
/// 灰度底图为 `channel` 经过覆盖其强度范围的 [`IntensityWindow`] 规范化的结果;
/// 绿色为细胞质掩膜; 蓝色为细胞核, 轮廓高亮.
///
/// 所有切片先写入 `out_dir` 下的临时目录, 全部成功后才整体移动到目标位置,
/// 因此失败时不会留下不完整的结果. 目标目录已存在时会被替换.
///
/// 返回保存目录.
pub fn render_composite(
    out_dir: &Path,
    image_name: &str,
    channel: &Channel,
    nuclei: &[Nucleus3d],
    cyto: &CytoMask,
) -> PipelineResult<PathBuf> {
    channel.ensure_same_shape(cyto, "composite rendering")?;
    let (lo, hi) = channel.min_max();
    let window = IntensityWindow::from_min_max(lo, hi)
        .ok_or_else(|| PipelineError::Config(format!("cannot render non-finite intensity range [{lo}, {hi}]")))?;

    let mut labels = Array3::<u32>::zeros(channel.shape());
    for n in nuclei {
        for pos in n.voxels() {
            labels[pos] = n.label();
        }
    }

    std::fs::create_dir_all(out_dir)?;
    let tmp = tempfile::Builder::new().prefix(".render-").tempdir_in(out_dir)?;
    let (_, height, width) = channel.shape();
    for (z, sli) in channel.slice_iter().enumerate() {
        let mask = cyto.slice_at(z);
        let lab = labels.index_axis(ndarray::Axis(0), z);
        let mut buf = RgbImage::new(width as u32, height as u32);
        for ((h, w), &v) in sli.indexed_iter() {
            let g = window.eval(v).unwrap_or(BLACK);
            let green = if is_foreground(mask[(h, w)]) { WHITE } else { g };
            let blue = if is_outline(&lab, h, w) {
                WHITE
            } else if lab[(h, w)] != LABEL_BACKGROUND {
                g.max(NUCLEUS_FILL)
            } else {
                g
            };
            buf.put_pixel(w as u32, h as u32, Rgb([g, green, blue]));
        }
        buf.save(tmp.path().join(format!("slice_{z:03}.png")))?;
    }

    let dir = out_dir.join(image_name);
    if dir.is_dir() {
        std::fs::remove_dir_all(&dir)?;
    }
    std::fs::rename(tmp.path(), &dir)?;
    log::debug!("rendered {} slices to {}", channel.len_z(), dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::{is_outline, render_composite};
    use crate::object::Nucleus3d;
    use crate::{Channel, CytoMask};
    use ndarray::{arr2, Array3};

    #[test]
    fn test_outline() {
        let l = arr2(&[
            [0, 0, 0, 0, 0],
            [0, 1, 1, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0u32],
        ]);
        let v = l.view();
        assert!(!is_outline(&v, 0, 0));
        assert!(is_outline(&v, 1, 1));
        assert!(is_outline(&v, 1, 2));
        assert!(!is_outline(&v, 2, 2));
    }

    #[test]
    fn test_render_composite() {
        let dir = tempfile::tempdir().unwrap();
        let mut data = Array3::<f32>::zeros((2, 6, 7));
        data[(0, 0, 0)] = 10.0;
        let ch = Channel::new(data).unwrap();
        let mut m = Array3::from_elem((2, 6, 7), false);
        m[(1, 5, 6)] = true;
        let cyto = CytoMask::from_bools(m).unwrap();
        let n = Nucleus3d::new(1, vec![(0, 2, 2), (1, 2, 2)]).unwrap();

        let out = render_composite(dir.path(), "img", &ch, &[n], &cyto).unwrap();
        let s0 = image::open(out.join("slice_000.png")).unwrap().to_rgb8();
        let s1 = image::open(out.join("slice_001.png")).unwrap().to_rgb8();
        assert_eq!(s0.dimensions(), (7, 6));
        assert_eq!(s0.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(s0.get_pixel(2, 2).0, [0, 0, 255]);
        assert_eq!(s1.get_pixel(6, 5).0, [0, 255, 0]);
        assert_eq!(s1.get_pixel(3, 3).0, [0, 0, 0]);
    }

    fn entries(dir: &std::path::Path) -> Vec<String> {
        let mut v: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_render_replaces_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let ch = Channel::new(Array3::<f32>::zeros((2, 3, 3))).unwrap();
        let cyto = CytoMask::from_bools(Array3::from_elem((2, 3, 3), false)).unwrap();
        let stale = dir.path().join("img");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("slice_009.png"), b"stale").unwrap();

        render_composite(dir.path(), "img", &ch, &[], &cyto).unwrap();
        assert_eq!(entries(dir.path()), vec!["img"]);
        assert_eq!(entries(&stale), vec!["slice_000.png", "slice_001.png"]);
    }

    #[test]
    fn test_render_failure_leaves_no_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let ch = Channel::new(Array3::<f32>::zeros((2, 3, 3))).unwrap();
        let cyto = CytoMask::from_bools(Array3::from_elem((2, 3, 3), false)).unwrap();
        // 目标位置被普通文件占据, 最后的移动会失败.
        std::fs::write(dir.path().join("img"), b"not a directory").unwrap();

        assert!(render_composite(dir.path(), "img", &ch, &[], &cyto).is_err());
        assert_eq!(entries(dir.path()), vec!["img"]);
        assert!(dir.path().join("img").is_file());
    }
}
