/// Builds zero-filled inference requests from a model schema.
use crate::error::PayloadError;
use crate::models::{InferenceRequest, InputSpec, InputTensor, ModelSchema};
use crate::payload::datatype::{wire_datatype, DatatypeTable};
use std::sync::OnceLock;

/// Request synthesizer backed by a datatype table.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    table: DatatypeTable,
}

impl PayloadBuilder {
    pub fn new(table: DatatypeTable) -> Self {
        Self { table }
    }

    /// Build a request containing every non-optional input of `schema`.
    ///
    /// Inputs keep schema order. With batching enabled each shape gets a
    /// leading dimension of 1.
    ///
    /// # Errors
    ///
    /// Fails on the first input whose datatype is not in the table, whose
    /// dims contain a negative value, or whose element count overflows.
    pub fn build(&self, schema: &ModelSchema) -> Result<InferenceRequest, PayloadError> {
        let inputs = schema
            .required_inputs()
            .map(|spec| self.build_tensor(spec, schema.batching_enabled()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InferenceRequest { inputs })
    }

    fn build_tensor(&self, spec: &InputSpec, batched: bool) -> Result<InputTensor, PayloadError> {
        let shape = effective_shape(&spec.dims, batched);
        let datatype = wire_datatype(&spec.data_type);
        let count = element_count(&spec.name, &shape)?;
        let data = self.table.zeros(datatype, count)?;

        Ok(InputTensor {
            name: spec.name.clone(),
            datatype: datatype.to_string(),
            shape,
            data,
        })
    }
}

/// Build a request with the default datatype table.
pub fn build_request(schema: &ModelSchema) -> Result<InferenceRequest, PayloadError> {
    static DEFAULT: OnceLock<PayloadBuilder> = OnceLock::new();
    DEFAULT.get_or_init(PayloadBuilder::default).build(schema)
}

/// Declared dims, with a leading batch dimension of 1 when batching.
pub fn effective_shape(dims: &[i64], batched: bool) -> Vec<i64> {
    if batched {
        let mut shape = Vec::with_capacity(dims.len() + 1);
        shape.push(1);
        shape.extend_from_slice(dims);
        shape
    } else {
        dims.to_vec()
    }
}

/// Product of `shape`; an empty shape is a scalar with one element.
pub fn element_count(input: &str, shape: &[i64]) -> Result<usize, PayloadError> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        let dim = usize::try_from(dim).map_err(|_| PayloadError::NegativeDimension {
            input: input.to_string(),
            dim,
        })?;
        acc.checked_mul(dim).ok_or_else(|| PayloadError::ShapeOverflow {
            input: input.to_string(),
            shape: shape.to_vec(),
        })
    })
}
