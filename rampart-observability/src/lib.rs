pub mod digest;
pub mod sink;
pub mod webhook;

pub use sink::{NotifySink, NullSink, Severity};
pub use webhook::WebhookSink;
