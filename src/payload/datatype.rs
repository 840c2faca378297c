/// Datatype table mapping wire datatype names to zero-value encoders.
use crate::error::PayloadError;
use serde_json::Value;
use std::collections::HashMap;

/// Prefix used by model configs for element types (`TYPE_FP32`).
pub const CONFIG_TYPE_PREFIX: &str = "TYPE_";

/// Produces the JSON encoding of a zero element.
pub type ZeroEncoder = fn() -> Value;

/// Strip the config prefix to get the wire datatype (`TYPE_FP32` -> `FP32`).
///
/// Names without the prefix are returned unchanged.
pub fn wire_datatype(config_type: &str) -> &str {
    config_type
        .strip_prefix(CONFIG_TYPE_PREFIX)
        .unwrap_or(config_type)
}

fn zero_number() -> Value {
    Value::from(0u8)
}

fn zero_bool() -> Value {
    Value::Bool(false)
}

fn zero_bytes() -> Value {
    Value::String(String::new())
}

const NUMERIC_TYPES: &[&str] = &[
    "UINT8", "UINT16", "UINT32", "UINT64", "INT8", "INT16", "INT32", "INT64", "FP16", "FP32",
    "FP64",
];

/// Lookup table from wire datatype to zero encoder.
#[derive(Debug, Clone)]
pub struct DatatypeTable {
    encoders: HashMap<String, ZeroEncoder>,
}

impl DatatypeTable {
    /// Table with no datatypes registered.
    pub fn empty() -> Self {
        Self {
            encoders: HashMap::new(),
        }
    }

    /// Table that only knows `FP32`.
    pub fn fp32_only() -> Self {
        let mut table = Self::empty();
        table.register("FP32", zero_number);
        table
    }

    /// Register (or replace) the encoder for a wire datatype.
    pub fn register(&mut self, datatype: impl Into<String>, encoder: ZeroEncoder) {
        self.encoders.insert(datatype.into(), encoder);
    }

    pub fn supports(&self, datatype: &str) -> bool {
        self.encoders.contains_key(datatype)
    }

    /// Look up the encoder for a wire datatype.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::UnsupportedDatatype` naming the datatype when
    /// no encoder is registered for it.
    pub fn encoder(&self, datatype: &str) -> Result<ZeroEncoder, PayloadError> {
        self.encoders
            .get(datatype)
            .copied()
            .ok_or_else(|| PayloadError::UnsupportedDatatype {
                datatype: datatype.to_string(),
            })
    }

    /// `count` zero elements of `datatype`.
    pub fn zeros(&self, datatype: &str, count: usize) -> Result<Vec<Value>, PayloadError> {
        let encoder = self.encoder(datatype)?;
        Ok(vec![encoder(); count])
    }
}

impl Default for DatatypeTable {
    /// All element types of the v2 JSON tensor encoding.
    fn default() -> Self {
        let mut table = Self::empty();
        for name in NUMERIC_TYPES {
            table.register(*name, zero_number);
        }
        table.register("BOOL", zero_bool);
        table.register("BYTES", zero_bytes);
        table
    }
}
