//! Scalar values and the remote wire encoding of statement parameters.

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Core value type for statement parameters and result cells.
///
/// The set is closed: anything that is not an integer, float, boolean or null
/// is carried as its string form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    /// Canonicalize an arbitrary displayable value (dates, decimals, ids...)
    /// to its text form.
    pub fn display(value: impl fmt::Display) -> Self {
        Self::Text(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats; SQLite hands back `REAL` columns holding whole
    /// numbers as integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            Self::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Decode a JSON cell from a remote response.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(v) => Self::Boolean(*v),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => Self::Integer(v),
                None => n.as_f64().map(Self::Float).unwrap_or_else(|| Self::display(n)),
            },
            JsonValue::String(v) => Self::Text(v.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Integer(v) => JsonValue::from(*v),
            Self::Float(v) => JsonValue::from(*v),
            Self::Boolean(v) => JsonValue::Bool(*v),
            Self::Text(v) => JsonValue::String(v.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(|v| Value::from_json(&v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map(Self::Integer).unwrap_or_else(|_| Self::display(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Float(r),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Self::Float(v) => ToSqlOutput::Borrowed(ValueRef::Real(*v)),
            Self::Boolean(v) => ToSqlOutput::Borrowed(ValueRef::Integer(i64::from(*v))),
            Self::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
        })
    }
}

/// Type tag of a parameter on the remote wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    Integer,
    Float,
    Boolean,
    Null,
    Text,
}

/// One positional parameter as the remote endpoint expects it:
/// `{"type": "integer", "value": 1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireParam {
    #[serde(rename = "type")]
    pub kind: WireType,
    pub value: JsonValue,
}

impl WireParam {
    /// Inverse of [`encode`], used by endpoints receiving the wire format.
    pub fn to_value(&self) -> Value {
        match self.kind {
            WireType::Null => Value::Null,
            WireType::Text => match &self.value {
                JsonValue::String(s) => Value::Text(s.clone()),
                other => Value::Text(other.to_string()),
            },
            _ => Value::from_json(&self.value),
        }
    }
}

/// Encode a parameter for the remote endpoint.
pub fn encode(value: &Value) -> WireParam {
    let kind = match value {
        Value::Null => WireType::Null,
        Value::Integer(_) => WireType::Integer,
        Value::Float(_) => WireType::Float,
        Value::Boolean(_) => WireType::Boolean,
        Value::Text(_) => WireType::Text,
    };
    WireParam {
        kind,
        value: value.to_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CalendarDate {
        year: u16,
        month: u8,
        day: u8,
    }

    impl fmt::Display for CalendarDate {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
        }
    }

    #[test]
    fn booleans_never_encode_as_integers() {
        let param = encode(&Value::from(true));
        assert_eq!(param.kind, WireType::Boolean);
        assert_eq!(param.value, json!(true));

        let param = encode(&Value::from(1_i64));
        assert_eq!(param.kind, WireType::Integer);
        assert_eq!(param.value, json!(1));
    }

    #[test]
    fn absent_values_encode_as_null() {
        let missing: Option<i64> = None;
        let param = encode(&Value::from(missing));
        assert_eq!(param.kind, WireType::Null);
        assert_eq!(param.value, JsonValue::Null);
    }

    #[test]
    fn non_primitives_travel_as_their_string_form() {
        let date = CalendarDate { year: 2024, month: 3, day: 9 };
        let param = encode(&Value::display(&date));
        assert_eq!(param.kind, WireType::Text);
        assert_eq!(param.value, json!("2024-03-09"));

        let huge = encode(&Value::from(u64::MAX));
        assert_eq!(huge.kind, WireType::Text);
        assert_eq!(huge.value, json!(u64::MAX.to_string()));
    }

    #[test]
    fn wire_param_serializes_with_type_tag() {
        let body = serde_json::to_value(encode(&Value::from(19.99))).unwrap();
        assert_eq!(body, json!({"type": "float", "value": 19.99}));
    }

    #[test]
    fn wire_param_decodes_back_to_value() {
        let param: WireParam = serde_json::from_value(json!({"type": "text", "value": "abc"})).unwrap();
        assert_eq!(param.to_value(), Value::Text("abc".into()));
        let param: WireParam = serde_json::from_value(json!({"type": "boolean", "value": false})).unwrap();
        assert_eq!(param.to_value(), Value::Boolean(false));
    }

    #[test]
    fn json_cells_decode_by_shape() {
        assert_eq!(Value::from_json(&json!(7)), Value::Integer(7));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
        assert_eq!(Value::from_json(&json!([1, 2])), Value::Text("[1,2]".into()));
    }

    #[test]
    fn integers_widen_to_floats() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("3".into()).as_f64(), None);
    }
}
