//! 批量测量细胞核与细胞质中的 lamin / ORF1P 强度.
//!
//! ```bash
//! # 使用 `$NUC_BERRY_INPUT_DIR` 中的图像及同目录下预先计算的 `<name>_masks.npy`
//! lamin-orf1p --nucleus DAPI --lamin None --orf1p ORF1P
//!
//! # 调用外部分割程序
//! lamin-orf1p -i ./images -o ./results --segment-cmd cellpose-3d \
//!     --segment-arg=--model --segment-arg={model} --segment-arg={input} --segment-arg={output}
//! ```

mod dialog;
mod result;
mod runner;

use clap::Parser;
use nuc_berry::consts::*;
use std::path::PathBuf;

/// Nucleus / cytoplasm lamin and ORF1P intensity measurement
#[derive(Parser, Debug)]
#[command(name = "lamin-orf1p")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input image directory (default: $NUC_BERRY_INPUT_DIR or ~/dataset/nuclei)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory (default: $NUC_BERRY_OUTPUT_DIR or ~/dataset/nuclei_results)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input image extension, without the leading dot
    #[arg(long, default_value = "nii")]
    pub ext: String,

    /// Nucleus channel: index, name, or `None`
    #[arg(long, default_value = "0")]
    pub nucleus: String,

    /// Lamin channel: index, name, or `None`
    #[arg(long, default_value = "1")]
    pub lamin: String,

    /// ORF1P channel: index, name, or `None`
    #[arg(long, default_value = "2")]
    pub orf1p: String,

    /// Minimum nucleus volume (µm³)
    #[arg(long, default_value_t = DEFAULT_MIN_NUCLEUS_VOLUME)]
    pub min_volume: f64,

    /// Maximum nucleus volume (µm³)
    #[arg(long, default_value_t = DEFAULT_MAX_NUCLEUS_VOLUME)]
    pub max_volume: f64,

    /// Keep objects spanning a single Z slice
    #[arg(long)]
    pub keep_single_slice: bool,

    /// Override pixel width (µm); requires --pixel-depth
    #[arg(long, requires = "pixel_depth")]
    pub pixel_width: Option<f64>,

    /// Override slice spacing (µm); requires --pixel-width
    #[arg(long, requires = "pixel_width")]
    pub pixel_depth: Option<f64>,

    /// Directory of precomputed `<name>_masks.npy` label volumes (default: input directory)
    #[arg(long, conflicts_with = "segment_cmd")]
    pub masks: Option<PathBuf>,

    /// External segmentation program
    #[arg(long)]
    pub segment_cmd: Option<String>,

    /// Argument template for the segmentation program (repeatable).
    /// Placeholders: {input} {output} {model} {diameter} {stitch} {gpu} {name}
    #[arg(long, allow_hyphen_values = true)]
    pub segment_arg: Vec<String>,

    /// Segmentation model
    #[arg(long, default_value = DEFAULT_SEGMENT_MODEL)]
    pub model: String,

    /// Expected nucleus diameter (pixels, before resizing)
    #[arg(long, default_value_t = DEFAULT_SEGMENT_DIAMETER)]
    pub diameter: u32,

    /// Stitch threshold across Z slices
    #[arg(long, default_value_t = DEFAULT_STITCH_THRESHOLD)]
    pub stitch_threshold: f64,

    /// XY resize factor before segmentation (1 disables resizing)
    #[arg(long, default_value_t = DEFAULT_RESIZE_FACTOR)]
    pub resize_factor: f64,

    /// Ask the segmentation program to use the GPU
    #[arg(long)]
    pub gpu: bool,

    /// Gaussian sigma in XY (pixels)
    #[arg(long, default_value_t = DEFAULT_GAUSSIAN_SIGMA_XY)]
    pub sigma_xy: f64,

    /// Gaussian sigma in Z (slices)
    #[arg(long, default_value_t = DEFAULT_GAUSSIAN_SIGMA_Z)]
    pub sigma_z: f64,

    /// Binary median radius in XY (pixels)
    #[arg(long, default_value_t = DEFAULT_MEDIAN_RADIUS)]
    pub median_radius: f64,

    /// Do not write per-slice PNG overlays
    #[arg(long)]
    pub no_render: bool,

    /// Skip images that fail instead of aborting the batch
    #[arg(long)]
    pub skip_failed: bool,

    /// Review channels and parameters interactively before running
    #[arg(long)]
    pub interactive: bool,

    /// Worker threads for filters (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or_else(utils::cpus))
        .build_global()?;

    let Some(report) = runner::run(&args)? else {
        log::info!("cancelled, nothing written");
        return Ok(());
    };
    result::summarize(&report)?;
    if !report.failed.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}
