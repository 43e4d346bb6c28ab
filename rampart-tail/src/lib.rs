pub mod pipeline;
pub mod tailer;

pub use pipeline::{Disposition, Pipeline};
pub use tailer::LogTailer;
