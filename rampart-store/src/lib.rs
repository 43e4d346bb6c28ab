pub mod cache;

pub use cache::{ReportCache, format_elapsed};
