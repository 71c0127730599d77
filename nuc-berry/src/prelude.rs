//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{Calibration, Channel, CytoMask, LabelVolume, VolumeAttr};

pub use crate::config::{ChannelChoice, CytoSettings, FailurePolicy, PipelineConfig, SizeFilter};
pub use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};

pub use crate::cyto::{compute_cyto_parameters, extract_cytoplasm, CytoParams};
pub use crate::filter::{estimate_background, CpuGaussian, GaussianFilter};
pub use crate::measure::{measure_shape, ShapeMeasures};
pub use crate::object::{build_population, BoundingBox, Nucleus3d};
pub use crate::tagger::{tag_cells, GlobalRecord, NucleusRecord};

pub use crate::io::source::{ImageSource, ImageStack, NiftiSource};
pub use crate::io::table::ResultTables;
pub use crate::segment::{find_nuclei, SegmentSettings, SegmentationService};

pub use crate::error::{PipelineError, PipelineResult};
pub use crate::pipeline::{run_batch, BatchReport};
