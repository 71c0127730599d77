use super::npy::read_labels;
use super::{SegmentRequest, SegmentationService};
use crate::error::{PipelineError, PipelineResult};
use crate::LabelVolume;
use ndarray_npy::write_npy;
use std::path::{Path, PathBuf};
use std::process::Command;

/// 调用外部程序完成分割.
///
/// 输入体数据被写入临时目录中的 `input.npy` (`f32`, `(z, h, w)`),
/// 外部程序需要将标签体写入 `output.npy`. 参数中的以下占位符会被替换:
///
/// | 占位符 | 含义 |
/// |---|---|
/// | `{input}` | 输入文件路径 |
/// | `{output}` | 输出文件路径 |
/// | `{model}` | 模型名称 |
/// | `{diameter}` | 缩放后的直径提示 |
/// | `{stitch}` | 切片合并阈值 |
/// | `{gpu}` | `true` / `false` |
/// | `{name}` | 图像名称 |
#[derive(Clone, Debug)]
pub struct CommandService {
    program: String,
    args: Vec<String>,
}

impl CommandService {
    /// 以程序名 (或路径) `program` 和参数模板 `args` 创建服务.
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expand(&self, request: &SegmentRequest<'_>, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let diameter = request.diameter.to_string();
        let stitch = request.stitch_threshold.to_string();
        let gpu = request.use_gpu.to_string();
        self.args
            .iter()
            .map(|a| {
                a.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{model}", request.model)
                    .replace("{diameter}", &diameter)
                    .replace("{stitch}", &stitch)
                    .replace("{gpu}", &gpu)
                    .replace("{name}", request.image_name)
            })
            .collect()
    }

    fn failure(&self, reason: impl ToString) -> PipelineError {
        PipelineError::Segmentation {
            service: self.program.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SegmentationService for CommandService {
    fn name(&self) -> &str {
        &self.program
    }

    fn check_available(&self) -> PipelineResult<()> {
        which::which(&self.program)
            .map(|path: PathBuf| log::debug!("segmentation program: {}", path.display()))
            .map_err(|e| PipelineError::MissingDependency {
                name: self.program.clone(),
                reason: e.to_string(),
            })
    }

    fn segment(&self, request: &SegmentRequest<'_>) -> PipelineResult<LabelVolume> {
        let dir = tempfile::Builder::new().prefix("nuc-berry-").tempdir()?;
        let input = dir.path().join("input.npy");
        let output = dir.path().join("output.npy");
        write_npy(&input, &request.volume)?;

        let args = self.expand(request, &input, &output);
        log::debug!("running {} {}", self.program, args.join(" "));
        let out = Command::new(&self.program).args(&args).output()?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(self.failure(format!("{}: {}", out.status, stderr.trim())));
        }
        if !output.is_file() {
            return Err(self.failure("no output.npy produced"));
        }
        read_labels(&output)
    }
}
