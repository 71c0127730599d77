//! 批处理.
//!
//! 1. 检查分割服务是否可用;
//! 2. 发现输入图像;
//! 3. 打开第一幅图像, 获得标定与通道名称, 确认参数并解析通道;
//! 4. 创建结果表;
//! 5. 逐幅图像处理: 分割 => 细胞质提取 => 细胞标记 => 可视化 => 写入结果.
//!
//! 第 1 至 3 步的错误总在创建任何输出文件之前返回. 每幅图像的缓冲区都在
//! 下一幅图像开始之前释放.

use crate::config::{FailurePolicy, ParameterDialog, PipelineConfig, ResolvedChannels};
use crate::cyto::extract_cytoplasm;
use crate::dataset::{find_images, image_loader};
use crate::error::{PipelineError, PipelineResult};
use crate::filter::GaussianFilter;
use crate::io::render::render_composite;
use crate::io::source::{ImageSource, ImageStack};
use crate::io::table::ResultTables;
use crate::segment::{find_nuclei, SegmentationService};
use crate::tagger::{tag_cells, GlobalRecord};
use crate::Calibration;
use std::path::Path;

/// 批处理结果.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 成功处理的图像名称, 按处理顺序.
    pub processed: Vec<String>,
    /// 处理失败而被跳过的图像及原因. 仅在 [`FailurePolicy::SkipAndReport`] 下非空,
    /// 同时也会写入失败图像表.
    pub failed: Vec<(String, PipelineError)>,
}

/// 一次批处理中所有图像共用的只读上下文.
struct Context<'a> {
    config: &'a PipelineConfig,
    cal: &'a Calibration,
    channels: ResolvedChannels,
    segmenter: &'a dyn SegmentationService,
    filter: &'a dyn GaussianFilter,
    out_dir: &'a Path,
}

impl Context<'_> {
    /// 处理一幅图像并写入结果. 返回该图像的汇总结果.
    fn process(
        &self,
        name: &str,
        stack: ImageStack,
        tables: &mut ResultTables,
    ) -> PipelineResult<GlobalRecord> {
        let nucleus = stack.channel(self.channels.nucleus)?;
        let orf1p = stack.channel(self.channels.orf1p)?;
        let lamin = self.channels.lamin.map(|i| stack.channel(i)).transpose()?;

        let cfg = self.config;
        let nuclei = find_nuclei(
            self.segmenter,
            name,
            nucleus,
            &cfg.segment,
            self.cal,
            &cfg.size_filter,
            cfg.single_slice_filter,
        )?;
        log::info!("{name}: extracting cytoplasm");
        let cyto = extract_cytoplasm(orf1p, &nuclei, &cfg.cyto, self.cal, self.filter)?;
        let (records, global) = tag_cells(orf1p, lamin, &cyto, &nuclei, self.cal)?;
        if cfg.render {
            render_composite(self.out_dir, name, orf1p, &nuclei, &cyto)?;
        }
        tables.write_image(name, &records, &global)?;
        Ok(global)
    }
}

/// 对 `input_dir` 中的所有图像运行完整处理流程, 结果写入 `out_dir`.
///
/// `dialog` 返回 `None` 时以 [`PipelineError::UserCancelled`] 结束, 不创建任何输出.
/// 单幅图像失败时的行为由 `config.failure_policy` 决定; 无论哪种策略,
/// 已写入的结果行都保持有效.
pub fn run_batch(
    config: PipelineConfig,
    dialog: &mut dyn ParameterDialog,
    source: &dyn ImageSource,
    segmenter: &dyn SegmentationService,
    filter: &dyn GaussianFilter,
    input_dir: &Path,
    out_dir: &Path,
) -> PipelineResult<BatchReport> {
    segmenter.check_available()?;
    let paths = find_images(input_dir, &config.image_ext)?;
    log::info!("found {} image(s) in {}", paths.len(), input_dir.display());

    let (config, cal, channels) = {
        let first = source.open(&paths[0])?;
        let config = dialog
            .review(&first.channel_choices(), first.calibration(), config)
            .ok_or(PipelineError::UserCancelled)?;
        if config.size_filter.min_volume > config.size_filter.max_volume {
            return Err(PipelineError::Config(format!(
                "min volume {} exceeds max volume {}",
                config.size_filter.min_volume, config.size_filter.max_volume
            )));
        }
        let channels = config.channels.resolve(first.channel_names())?;
        let cal = config
            .calibration
            .clone()
            .unwrap_or_else(|| first.calibration().clone());
        (config, cal, channels)
    };
    log::info!(
        "voxel {} x {} x {} {}, channels {channels:?}",
        cal.pixel_width(),
        cal.pixel_width(),
        cal.pixel_depth(),
        cal.unit()
    );

    let mut tables = ResultTables::create(out_dir)?;
    let ctx = Context {
        config: &config,
        cal: &cal,
        channels,
        segmenter,
        filter,
        out_dir,
    };

    let mut report = BatchReport::default();
    let total = paths.len();
    for (i, (name, path, stack)) in image_loader(source, paths, &config.image_ext).enumerate() {
        log::info!("[{}/{total}] {}", i + 1, path.display());
        let result = stack.and_then(|stack| ctx.process(&name, stack, &mut tables));
        match result {
            Ok(global) => {
                log::info!(
                    "{name}: {} nuclei, cytoplasm volume {:.1}",
                    global.nucleus_count,
                    global.cytoplasm_volume
                );
                report.processed.push(name);
            }
            Err(e) if config.failure_policy == FailurePolicy::SkipAndReport => {
                log::warn!("{name}: skipped, {e}");
                tables.write_failure(&name, &e)?;
                report.failed.push((name, e));
            }
            Err(e) => {
                log::error!("{name}: {e}");
                return Err(e);
            }
        }
    }
    Ok(report)
}
