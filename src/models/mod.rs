/// Wire types exchanged with the inference server.
pub mod schema;
pub mod tensor;

pub use schema::{InputSpec, ModelSchema};
pub use tensor::{InferenceRequest, InputTensor};
