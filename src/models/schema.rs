/// Model configuration as returned by `GET /v2/models/{model}/config`.
use serde::{Deserialize, Serialize};

/// Input contract of a served model.
///
/// Only the fields needed to synthesize requests are decoded; everything else
/// in the server's config document is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Maximum batch size. `0` means the model does not batch and its inputs
    /// are sent with their declared dims only.
    #[serde(default)]
    pub max_batch_size: i64,
    /// Declared inputs, in server order.
    #[serde(default, rename = "input")]
    pub inputs: Vec<InputSpec>,
}

/// One declared model input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    /// Datatype in model-config form, e.g. `TYPE_FP32`.
    pub data_type: String,
    #[serde(default)]
    pub dims: Vec<i64>,
    #[serde(default)]
    pub optional: bool,
}

impl ModelSchema {
    /// Whether a leading batch dimension is prepended to every input.
    pub fn batching_enabled(&self) -> bool {
        self.max_batch_size >= 1
    }

    /// Inputs that must be present in every request, in declared order.
    pub fn required_inputs(&self) -> impl Iterator<Item = &InputSpec> {
        self.inputs.iter().filter(|input| !input.optional)
    }
}
