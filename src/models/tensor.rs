/// Request body for `POST /v2/models/{model}/infer`.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete inference request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub inputs: Vec<InputTensor>,
}

/// One input tensor in the v2 JSON tensor encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTensor {
    pub name: String,
    /// Wire datatype, e.g. `FP32`.
    pub datatype: String,
    pub shape: Vec<i64>,
    /// Flat row-major data, one JSON value per element.
    pub data: Vec<Value>,
}

impl InferenceRequest {
    /// Serialize to the JSON body sent to the server.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
