//! 数据集操作.

use crate::error::{PipelineError, PipelineResult};
use crate::io::source::{ImageSource, ImageStack};
use std::path::{Path, PathBuf};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 文件名是否以 `.{ext}` 结尾 (忽略大小写)?
fn has_ext(file_name: &str, ext: &str) -> bool {
    let suffix = format!(".{}", ext.to_ascii_lowercase());
    let lower = file_name.to_ascii_lowercase();
    lower.len() > suffix.len() && lower.ends_with(&suffix)
}

/// 列出目录 `dir` 中扩展名为 `ext` (不含 `.`, 如 `nii` 或 `nii.gz`) 的文件, 按文件名升序.
///
/// 隐藏文件 (以 `.` 开头) 被忽略. 目录无法读取或没有匹配文件时返回
/// [`PipelineError::NoInputFound`].
pub fn find_images<P: AsRef<Path>>(dir: P, ext: &str) -> PipelineResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let not_found = || PipelineError::NoInputFound {
        dir: dir.to_owned(),
        ext: ext.to_string(),
    };
    let entries = std::fs::read_dir(dir).map_err(|e| {
        log::warn!("cannot read {}: {e}", dir.display());
        not_found()
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.') && has_ext(n, ext))
        })
        .collect();
    if files.is_empty() {
        return Err(not_found());
    }
    files.sort();
    Ok(files)
}

/// 去掉扩展名 `.{ext}` 后的文件名, 用作图像名称.
///
/// 扩展名不符时退化为 [`Path::file_stem`].
pub fn image_stem(path: &Path, ext: &str) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if has_ext(&name, ext) {
        name[..name.len() - ext.len() - 1].to_string()
    } else {
        path.file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(name)
    }
}

/// 从文件列表和图像来源创建加载器. 每次迭代打开一幅图像.
pub fn image_loader<'a, S: ImageSource + ?Sized>(source: &'a S, paths: Vec<PathBuf>, ext: &str) -> ImageLoader<'a, S> {
    let mut paths = paths;
    paths.reverse();
    ImageLoader {
        source,
        paths_rev: paths,
        ext: ext.to_string(),
    }
}

/// 图像加载器, 按顺序给出 `(图像名称, 路径, 打开结果)`.
///
/// 上一幅图像的缓冲区在调用方丢弃迭代结果时释放, 加载器本身不缓存任何数据.
pub struct ImageLoader<'a, S: ImageSource + ?Sized> {
    source: &'a S,
    paths_rev: Vec<PathBuf>,
    ext: String,
}

impl<S: ImageSource + ?Sized> Iterator for ImageLoader<'_, S> {
    type Item = (String, PathBuf, PipelineResult<ImageStack>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths_rev.pop()?;
        let name = image_stem(&path, &self.ext);
        let stack = self.source.open(&path);
        Some((name, path, stack))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.paths_rev.len(), Some(self.paths_rev.len()))
    }
}

impl<S: ImageSource + ?Sized> ExactSizeIterator for ImageLoader<'_, S> {
    #[inline]
    fn len(&self) -> usize {
        self.paths_rev.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Calibration, Channel};
    use std::fs::File;

    struct Dummy;

    impl ImageSource for Dummy {
        fn open(&self, path: &Path) -> PipelineResult<ImageStack> {
            if path.to_string_lossy().contains("bad") {
                return Err(PipelineError::image_io(path, "corrupted"));
            }
            ImageStack::new(
                Calibration::unit_voxel(),
                None,
                vec![Channel::uniform((1, 2, 2), 0.0)?],
            )
        }
    }

    #[test]
    fn test_find_images() {
        let dir = tempfile::tempdir().unwrap();
        for n in ["b.nii", "a.nii", ".hidden.nii", "c.tif", "d.NII", "e.nii.gz"] {
            File::create(dir.path().join(n)).unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.nii")).unwrap();

        let found = find_images(dir.path(), "nii").unwrap();
        let names: Vec<String> = found.iter().map(|p| image_stem(p, "nii")).collect();
        assert_eq!(names, vec!["a", "b", "d"]);

        let gz = find_images(dir.path(), "nii.gz").unwrap();
        assert_eq!(image_stem(&gz[0], "nii.gz"), "e");

        assert!(matches!(
            find_images(dir.path(), "czi"),
            Err(PipelineError::NoInputFound { .. })
        ));
        assert!(matches!(
            find_images(dir.path().join("missing"), "nii"),
            Err(PipelineError::NoInputFound { .. })
        ));
    }

    #[test]
    fn test_image_stem() {
        assert_eq!(image_stem(Path::new("/x/img01.nii.gz"), "nii.gz"), "img01");
        assert_eq!(image_stem(Path::new("/x/img01.nii"), "tif"), "img01");
    }

    #[test]
    fn test_image_loader() {
        let paths = vec![PathBuf::from("ok1.nii"), PathBuf::from("bad.nii"), PathBuf::from("ok2.nii")];
        let loader = image_loader(&Dummy, paths, "nii");
        assert_eq!(loader.len(), 3);
        let items: Vec<_> = loader.collect();
        assert_eq!(items[0].0, "ok1");
        assert!(items[0].2.is_ok());
        assert!(items[1].2.is_err());
        assert_eq!(items[2].0, "ok2");
    }
}
