//! 程序运行函数.

use crate::dialog::StdinDialog;
use crate::Args;
use anyhow::{anyhow, Context};
use nuc_berry::config::{AcceptDefaults, ChannelSelection, ParameterDialog};
use nuc_berry::prelude::*;
use nuc_berry::segment::{CommandService, NpyMaskService};
use std::path::{Path, PathBuf};
use utils::loader;

/// 外部分割程序的缺省参数模板.
const DEFAULT_COMMAND_ARGS: [&str; 2] = ["{input}", "{output}"];

/// 由命令行参数构建处理参数.
pub fn build_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let size_filter = SizeFilter::new(args.min_volume, args.max_volume).ok_or_else(|| {
        anyhow!(
            "invalid volume range [{}, {}]",
            args.min_volume,
            args.max_volume
        )
    })?;
    let calibration = match (args.pixel_width, args.pixel_depth) {
        (Some(w), Some(d)) => Some(Calibration::new(w, d)?),
        _ => None,
    };
    let resize_factor = (args.resize_factor != 1.0).then_some(args.resize_factor);
    Ok(PipelineConfig {
        channels: ChannelSelection {
            nucleus: ChannelChoice::parse(&args.nucleus),
            lamin: ChannelChoice::parse(&args.lamin),
            orf1p: ChannelChoice::parse(&args.orf1p),
        },
        size_filter,
        single_slice_filter: !args.keep_single_slice,
        calibration,
        segment: SegmentSettings {
            model: args.model.clone(),
            diameter: args.diameter,
            stitch_threshold: args.stitch_threshold,
            resize_factor,
            use_gpu: args.gpu,
        },
        cyto: CytoSettings {
            sigma_xy: args.sigma_xy,
            sigma_z: args.sigma_z,
            median_radius: args.median_radius,
        },
        image_ext: args.ext.clone(),
        render: !args.no_render,
        failure_policy: if args.skip_failed {
            FailurePolicy::SkipAndReport
        } else {
            FailurePolicy::Abort
        },
    })
}

/// 由命令行参数选择分割服务.
fn build_segmenter(args: &Args, input_dir: &Path) -> Box<dyn SegmentationService> {
    match &args.segment_cmd {
        Some(cmd) => {
            let template = if args.segment_arg.is_empty() {
                DEFAULT_COMMAND_ARGS.iter().map(|s| s.to_string()).collect()
            } else {
                args.segment_arg.clone()
            };
            Box::new(CommandService::new(cmd.as_str(), template))
        }
        None => Box::new(NpyMaskService::new(
            args.masks.clone().unwrap_or_else(|| input_dir.to_owned()),
        )),
    }
}

fn resolve_dir(given: Option<&PathBuf>, fallback: Option<PathBuf>, what: &str) -> anyhow::Result<PathBuf> {
    given
        .cloned()
        .or(fallback)
        .ok_or_else(|| anyhow!("cannot determine {what} directory, pass it explicitly"))
}

/// 实际运行. 用户取消时返回 `Ok(None)`.
pub fn run(args: &Args) -> anyhow::Result<Option<BatchReport>> {
    let input_dir = resolve_dir(args.input.as_ref(), loader::input_dir_from_env_or_home(), "input")?;
    let out_dir = resolve_dir(args.output.as_ref(), loader::output_dir_from_env_or_home(), "output")?;
    let config = build_config(args)?;
    let segmenter = build_segmenter(args, &input_dir);

    let mut dialog: Box<dyn ParameterDialog> = if args.interactive {
        Box::new(StdinDialog::default())
    } else {
        Box::new(AcceptDefaults)
    };

    println!(
        "Processing {} -> {} with `{}`...",
        input_dir.display(),
        out_dir.display(),
        segmenter.name()
    );
    match run_batch(
        config,
        dialog.as_mut(),
        &NiftiSource,
        segmenter.as_ref(),
        &CpuGaussian,
        &input_dir,
        &out_dir,
    ) {
        Ok(report) => Ok(Some(report)),
        Err(PipelineError::UserCancelled) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("batch over {} failed", input_dir.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_build_config() {
        let args = Args::parse_from([
            "lamin-orf1p",
            "--lamin",
            "None",
            "--orf1p",
            "ORF1P",
            "--resize-factor",
            "1",
            "--pixel-width",
            "0.2",
            "--pixel-depth",
            "0.5",
            "--skip-failed",
        ]);
        let c = build_config(&args).unwrap();
        assert_eq!(c.channels.nucleus, ChannelChoice::Index(0));
        assert_eq!(c.channels.lamin, ChannelChoice::None);
        assert_eq!(c.channels.orf1p, ChannelChoice::Name("ORF1P".into()));
        assert_eq!(c.segment.resize_factor, None);
        assert_eq!(c.calibration, Some(Calibration::new(0.2, 0.5).unwrap()));
        assert_eq!(c.failure_policy, FailurePolicy::SkipAndReport);
        assert!(c.single_slice_filter);
        assert!(c.render);
    }

    #[test]
    fn test_build_config_rejects_bad_values() {
        let args = Args::parse_from(["lamin-orf1p", "--min-volume", "20", "--max-volume", "10"]);
        assert!(build_config(&args).is_err());
        let args = Args::parse_from(["lamin-orf1p", "--pixel-width", "0", "--pixel-depth", "1"]);
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_segmenter_choice() {
        let args = Args::parse_from(["lamin-orf1p", "--segment-cmd", "seg3d"]);
        assert_eq!(build_segmenter(&args, Path::new(".")).name(), "seg3d");
        let args = Args::parse_from(["lamin-orf1p"]);
        assert_eq!(build_segmenter(&args, Path::new(".")).name(), "npy-masks");
    }
}
