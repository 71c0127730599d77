use super::{SegmentRequest, SegmentationService};
use crate::error::{PipelineError, PipelineResult};
use crate::LabelVolume;
use ndarray::Array3;
use ndarray_npy::{read_npy, ReadNpyError, ReadableElement};
use std::path::{Path, PathBuf};

/// 尝试以 `T` 读取 npy 标签. 元素类型不符时返回 `Ok(None)`.
fn try_read<T: ReadableElement + num::ToPrimitive + Copy>(
    path: &Path,
) -> PipelineResult<Option<LabelVolume>> {
    match read_npy::<_, Array3<T>>(path) {
        Ok(data) => LabelVolume::from_ints(data).map(Some),
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 读取 `(z, h, w)` 组织的 npy 标签体. 支持 `u32`, `u16`, `u8`, `i32`, `i64` 元素.
pub fn read_labels<P: AsRef<Path>>(path: P) -> PipelineResult<LabelVolume> {
    let path = path.as_ref();
    if let Some(lv) = try_read::<u32>(path)? {
        return Ok(lv);
    }
    if let Some(lv) = try_read::<u16>(path)? {
        return Ok(lv);
    }
    if let Some(lv) = try_read::<u8>(path)? {
        return Ok(lv);
    }
    if let Some(lv) = try_read::<i32>(path)? {
        return Ok(lv);
    }
    try_read::<i64>(path)?.ok_or_else(|| {
        PipelineError::image_io(path, "unsupported label element type")
    })
}

/// 读取预先计算好的分割结果 `<dir>/<图像名>_masks.npy`.
///
/// 结果通常是源分辨率的, 忽略请求中的缩放与模型参数.
#[derive(Clone, Debug)]
pub struct NpyMaskService {
    dir: PathBuf,
}

impl NpyMaskService {
    /// 在目录 `dir` 中查找分割结果.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// 图像 `image_name` 对应的标签文件路径.
    pub fn mask_path(&self, image_name: &str) -> PathBuf {
        self.dir.join(format!("{image_name}_masks.npy"))
    }
}

impl SegmentationService for NpyMaskService {
    fn name(&self) -> &str {
        "npy-masks"
    }

    fn check_available(&self) -> PipelineResult<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(PipelineError::MissingDependency {
                name: self.name().to_string(),
                reason: format!("mask directory {} not found", self.dir.display()),
            })
        }
    }

    fn segment(&self, request: &SegmentRequest<'_>) -> PipelineResult<LabelVolume> {
        let path = self.mask_path(request.image_name);
        log::debug!("loading masks from {}", path.display());
        read_labels(&path).map_err(|e| PipelineError::Segmentation {
            service: self.name().to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{read_labels, NpyMaskService};
    use crate::segment::{SegmentRequest, SegmentationService};
    use crate::{PipelineError, VolumeAttr};
    use ndarray::{Array3, ArrayView3};
    use ndarray_npy::write_npy;

    fn request<'a>(name: &'a str, volume: ArrayView3<'a, f32>) -> SegmentRequest<'a> {
        SegmentRequest {
            image_name: name,
            volume,
            model: "cyto2",
            diameter: 50.0,
            stitch_threshold: 0.5,
            use_gpu: false,
        }
    }

    #[test]
    fn test_read_label_types() {
        let dir = tempfile::tempdir().unwrap();
        let p16 = dir.path().join("a.npy");
        let mut a = Array3::<u16>::zeros((2, 3, 4));
        a[(1, 2, 3)] = 7;
        write_npy(&p16, &a).unwrap();
        let lv = read_labels(&p16).unwrap();
        assert_eq!(lv.shape(), (2, 3, 4));
        assert_eq!(lv[(1, 2, 3)], 7);

        let p64 = dir.path().join("b.npy");
        write_npy(&p64, &Array3::<i64>::from_elem((1, 2, 2), 3)).unwrap();
        assert_eq!(read_labels(&p64).unwrap()[(0, 1, 1)], 3);

        let pf = dir.path().join("c.npy");
        write_npy(&pf, &Array3::<f32>::zeros((1, 2, 2))).unwrap();
        assert!(read_labels(&pf).is_err());
    }

    #[test]
    fn test_npy_mask_service() {
        let dir = tempfile::tempdir().unwrap();
        let svc = NpyMaskService::new(dir.path());
        svc.check_available().unwrap();
        write_npy(svc.mask_path("img01"), &Array3::<u32>::from_elem((2, 2, 2), 1)).unwrap();

        let vol = Array3::<f32>::zeros((2, 1, 1));
        let lv = svc.segment(&request("img01", vol.view())).unwrap();
        assert_eq!(lv.shape(), (2, 2, 2));
        let r = svc.segment(&request("img02", vol.view()));
        assert!(matches!(r, Err(PipelineError::Segmentation { .. })));

        let missing = NpyMaskService::new(dir.path().join("nope"));
        assert!(matches!(
            missing.check_available(),
            Err(PipelineError::MissingDependency { .. })
        ));
    }
}
