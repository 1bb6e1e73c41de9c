//! Submitted answers
//!
//! Answer values arrive as arbitrary JSON. The common shapes get their own
//! variants; anything else is kept verbatim in `Other` so validation can
//! report a type mismatch rather than rejecting the whole request.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Value of a single answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    #[serde(serialize_with = "serialize_number")]
    Number(f64),
    Choices(Vec<String>),
    Other(Value),
}

/// Whole numbers go back out as integers, so `5` is echoed as `5`, not `5.0`
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl Default for AnswerValue {
    fn default() -> Self {
        AnswerValue::Other(Value::Null)
    }
}

impl AnswerValue {
    /// Short name of the value's shape, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            AnswerValue::Text(_) => "string",
            AnswerValue::Number(_) => "number",
            AnswerValue::Choices(_) => "array",
            AnswerValue::Other(Value::Null) => "null",
            AnswerValue::Other(Value::Bool(_)) => "bool",
            AnswerValue::Other(Value::Array(_)) => "array",
            AnswerValue::Other(Value::Object(_)) => "object",
            AnswerValue::Other(_) => "value",
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl From<i64> for AnswerValue {
    fn from(value: i64) -> Self {
        AnswerValue::Number(value as f64)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(value: Vec<String>) -> Self {
        AnswerValue::Choices(value)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(value: Vec<&str>) -> Self {
        AnswerValue::Choices(value.into_iter().map(str::to_string).collect())
    }
}

/// One answer to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub field_id: String,
    #[serde(default)]
    pub value: AnswerValue,
}

impl Answer {
    pub fn new(field_id: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        Self {
            field_id: field_id.into(),
            value: value.into(),
        }
    }
}
