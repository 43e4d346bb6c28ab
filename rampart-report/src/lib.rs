pub mod client;
pub mod selfip;

pub use client::{AbuseReporter, HttpReporter, ReportOutcome};
pub use selfip::SelfAddrs;
