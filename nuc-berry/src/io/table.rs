//! 制表符分隔的结果表.

use crate::error::{PipelineError, PipelineResult};
use crate::tagger::{GlobalRecord, NucleusRecord};
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};

/// 单个细胞核结果表文件名.
pub const DETAILED_TABLE: &str = "detailed_results.tsv";

/// 整幅图像汇总结果表文件名.
pub const GLOBAL_TABLE: &str = "global_results.tsv";

/// 失败图像表文件名. 只在 [`FailurePolicy::SkipAndReport`] 下会有数据行.
///
/// [`FailurePolicy::SkipAndReport`]: crate::config::FailurePolicy::SkipAndReport
pub const FAILED_TABLE: &str = "failed_images.tsv";

/// 失败图像表的表头.
pub const FAILED_HEADER: [&str; 2] = ["Image name", "Error"];

/// 单个细胞核结果表的表头.
pub const DETAILED_HEADER: [&str; 9] = [
    "Image name",
    "Nucleus ID",
    "Nucleus volume (µm3)",
    "Nucleus compactness",
    "Nucleus sphericity",
    "Nucleus elongation",
    "Nucleus flatness",
    "Nucleus bg corr. total intensity in lamin channel",
    "Nucleus bg corr. total intensity in ORF1P channel",
];

/// 整幅图像汇总结果表的表头.
pub const GLOBAL_HEADER: [&str; 9] = [
    "Image name",
    "Nb nuclei",
    "Nuclei total volume (µm3)",
    "Lamin background",
    "Nuclei bg corr. total intensity in lamin channel",
    "ORF1P background",
    "Nuclei bg corr. total intensity in ORF1P channel",
    "ORF1P cytoplasm total volume (µm3)",
    "ORF1P cytoplasm bg corr. total intensity",
];

/// 结果表: 单个细胞核表, 汇总表, 以及被跳过的图像表.
/// 创建时写入表头, 每处理完一幅图像追加并刷新.
///
/// 某幅图像之后发生的失败不会影响已经写入的行.
pub struct ResultTables {
    detailed: Writer<File>,
    global: Writer<File>,
    failed: Writer<File>,
    dir: PathBuf,
}

fn tsv_writer(path: &Path, header: &[&str]) -> PipelineResult<Writer<File>> {
    let mut w = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    w.write_record(header)?;
    w.flush()?;
    Ok(w)
}

impl ResultTables {
    /// 在目录 `dir` 下创建 (或覆盖) 两张结果表.
    pub fn create<P: AsRef<Path>>(dir: P) -> PipelineResult<Self> {
        let dir = dir.as_ref().to_owned();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            detailed: tsv_writer(&dir.join(DETAILED_TABLE), &DETAILED_HEADER)?,
            global: tsv_writer(&dir.join(GLOBAL_TABLE), &GLOBAL_HEADER)?,
            failed: tsv_writer(&dir.join(FAILED_TABLE), &FAILED_HEADER)?,
            dir,
        })
    }

    /// 输出目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入一幅图像的所有结果行并刷新.
    pub fn write_image(
        &mut self,
        image_name: &str,
        nuclei: &[NucleusRecord],
        global: &GlobalRecord,
    ) -> PipelineResult<()> {
        for r in nuclei {
            self.detailed.write_record([
                image_name.to_string(),
                r.label.to_string(),
                r.volume.to_string(),
                r.compactness.to_string(),
                r.sphericity.to_string(),
                r.elongation.to_string(),
                r.flatness.to_string(),
                r.lamin_intensity.to_string(),
                r.orf1p_intensity.to_string(),
            ])?;
        }
        self.global.write_record([
            image_name.to_string(),
            global.nucleus_count.to_string(),
            global.total_nucleus_volume.to_string(),
            global.lamin_background.to_string(),
            global.total_lamin_intensity.to_string(),
            global.orf1p_background.to_string(),
            global.total_orf1p_intensity.to_string(),
            global.cytoplasm_volume.to_string(),
            global.cytoplasm_intensity.to_string(),
        ])?;
        self.detailed.flush()?;
        self.global.flush()?;
        Ok(())
    }

    /// 记录一幅被跳过的图像及其失败原因并刷新.
    pub fn write_failure(&mut self, image_name: &str, error: &PipelineError) -> PipelineResult<()> {
        self.failed.write_record([image_name.to_string(), error.to_string()])?;
        self.failed.flush()?;
        Ok(())
    }
}
