//! 图像输入与结果输出.

pub mod render;
pub mod source;
pub mod table;

pub use render::render_composite;
pub use source::{ImageSource, ImageStack, NiftiSource};
pub use table::ResultTables;
