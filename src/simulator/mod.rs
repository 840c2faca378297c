/// Fixed-rate load generation.
pub mod config;
pub mod driver;
pub mod record;

pub use config::{DriverConfig, FailurePolicy};
pub use driver::{CompletionStream, DriverHandle, LoadDriver};
pub use record::{CompletionRecord, DriverSummary};
