/// triton-loadgen library - exposes modules for testing and external use.
pub mod error;
pub mod http;
pub mod models;
pub mod output;
pub mod payload;
pub mod simulator;
pub mod telemetry;
