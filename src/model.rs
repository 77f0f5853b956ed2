//! Dynamic model records and the typed `Model` bridge.

use crate::config::ModelDef;
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// One model instance, keyed by field name (`Name`, `CreditCardID`, `Addresses`).
pub type Record = Map<String, Value>;

/// Zero value check in the ORM's sense: null, false, 0, empty string, empty list or object.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// A Rust type that can be registered as a model and converted to and from records.
pub trait Model: Serialize + DeserializeOwned {
    fn model_def() -> ModelDef;

    fn to_record(&self) -> Result<Record, AppError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(AppError::BadRequest(format!(
                "model {} did not serialize to an object: {}",
                Self::model_def().name,
                other
            ))),
        }
    }

    fn from_record(record: Record) -> Result<Self, AppError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }
}
