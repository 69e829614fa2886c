//! Concrete input values supplied by callers
//!
//! Inputs arrive as JSON-like trees. Scalars are field elements (numbers or
//! decimal / `0x` / `-`-prefixed strings) or booleans; arrays and tuples are
//! JSON arrays; structs are JSON objects keyed by field name.

use crate::error::FieldError;
use crate::field::FieldElement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Inputs keyed by parameter name
pub type InputMap = BTreeMap<String, InputValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum InputValue {
    Field(FieldElement),
    Bool(bool),
    /// Array or tuple elements
    Vec(Vec<InputValue>),
    Struct(BTreeMap<String, InputValue>),
}

impl InputValue {
    pub fn field(value: u64) -> Self {
        InputValue::Field(FieldElement::from_u64(value))
    }

    pub fn signed(value: i128) -> Self {
        InputValue::Field(FieldElement::from_i128(value))
    }

    /// Short description of the value's shape, used in mismatch messages
    pub fn kind(&self) -> String {
        match self {
            InputValue::Field(_) => "number".to_string(),
            InputValue::Bool(_) => "boolean".to_string(),
            InputValue::Vec(items) => format!("list of {}", items.len()),
            InputValue::Struct(_) => "object".to_string(),
        }
    }
}

impl From<FieldElement> for InputValue {
    fn from(value: FieldElement) -> Self {
        InputValue::Field(value)
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Bool(value)
    }
}

impl TryFrom<serde_json::Value> for InputValue {
    type Error = FieldError;

    fn try_from(value: serde_json::Value) -> Result<Self, FieldError> {
        use serde_json::Value;
        match value {
            Value::Bool(b) => Ok(InputValue::Bool(b)),
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Ok(InputValue::field(v))
                } else if let Some(v) = n.as_i64() {
                    Ok(InputValue::signed(i128::from(v)))
                } else {
                    Err(FieldError::InvalidLiteral(n.to_string()))
                }
            }
            Value::String(s) => Ok(InputValue::Field(s.parse()?)),
            Value::Array(items) => items
                .into_iter()
                .map(InputValue::try_from)
                .collect::<Result<_, _>>()
                .map(InputValue::Vec),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, InputValue::try_from(v)?)))
                .collect::<Result<_, FieldError>>()
                .map(InputValue::Struct),
            Value::Null => Err(FieldError::InvalidLiteral("null".to_string())),
        }
    }
}

impl From<InputValue> for serde_json::Value {
    fn from(value: InputValue) -> Self {
        use serde_json::Value;
        match value {
            InputValue::Field(f) => Value::String(f.to_string()),
            InputValue::Bool(b) => Value::Bool(b),
            InputValue::Vec(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            InputValue::Struct(fields) => {
                Value::Object(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Field(value) => write!(f, "{}", value),
            InputValue::Bool(value) => write!(f, "{}", value),
            InputValue::Vec(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            InputValue::Struct(fields) => {
                f.write_str("{ ")?;
                for (i, (name, item)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, item)?;
                }
                f.write_str(" }")
            }
        }
    }
}
