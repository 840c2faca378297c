/// HTTP access to inference servers.
pub mod client;
pub mod providers;

pub use client::{fetch_schema, ClientConfig, InferenceClient};
pub use providers::triton::TritonClient;
