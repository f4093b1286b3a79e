use serde::{Serialize, Serializer};
use std::fmt;

/// A bindable parameter or result cell value.
///
/// Every kind a provider can bind or return is an explicit variant; there is
/// no runtime type sniffing anywhere in the stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Bytes(Vec<u8>),
    I32(i32),
    I64(i64),
    F64(f64),
    String(String),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
    Json(serde_json::Value),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for a string value containing a SQL `LIKE` wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        matches!(self, Value::String(value) if value.contains('%'))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::I32(value) => write!(f, "{value}"),
            Value::I64(value) => write!(f, "{value}"),
            Value::F64(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{value}"),
            Value::Time(value) => write!(f, "{value}"),
            Value::DateTime(value) => write!(f, "{value}"),
            Value::Json(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(value) => serializer.serialize_bool(value),
            Value::Bytes(ref value) => serializer.serialize_bytes(value),
            Value::I32(value) => serializer.serialize_i32(value),
            Value::I64(value) => serializer.serialize_i64(value),
            Value::F64(value) => serializer.serialize_f64(value),
            Value::String(ref value) => serializer.serialize_str(value),
            Value::Date(value) => serializer.serialize_str(&value.to_string()),
            Value::Time(value) => serializer.serialize_str(&value.to_string()),
            Value::DateTime(value) => serializer.serialize_str(&value.to_string()),
            Value::Json(ref value) => value.serialize(serializer),
        }
    }
}

impl From<Option<Value>> for Value {
    fn from(value: Option<Value>) -> Self {
        value.unwrap_or(Value::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<chrono::NaiveDate> for Value {
    fn from(value: chrono::NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<chrono::NaiveTime> for Value {
    fn from(value: chrono::NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(value: chrono::NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde_json::json;

    #[test]
    fn test_null() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(json!(Value::Null), json!(serde_json::Value::Null));
    }

    #[test]
    fn test_bool() {
        assert!(!Value::Bool(true).is_null());
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(json!(Value::Bool(true)), json!(true));
    }

    #[test]
    fn test_bytes() {
        assert_eq!(Value::Bytes(vec![0x2a, 0xff]).to_string(), "2aff");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(Value::I32(i32::MAX).to_string(), "2147483647");
        assert_eq!(Value::I64(-42).to_string(), "-42");
        assert_eq!(Value::F64(12_345.678_9).to_string(), "12345.6789");
        assert_eq!(json!(Value::I64(42)), json!(42));
    }

    #[test]
    fn test_string() {
        assert_eq!(Value::String("foo".to_string()).to_string(), "foo");
        assert!(!Value::String("foo".to_string()).has_wildcard());
        assert!(Value::String("foo%".to_string()).has_wildcard());
        assert!(!Value::I64(42).has_wildcard());
    }

    #[test]
    fn test_date_time() {
        let date = NaiveDate::from_ymd_opt(2000, 12, 31).expect("date");
        let time = NaiveTime::from_hms_opt(12, 13, 14).expect("time");
        assert_eq!(Value::Date(date).to_string(), "2000-12-31");
        assert_eq!(Value::Time(time).to_string(), "12:13:14");
        assert_eq!(
            Value::DateTime(NaiveDateTime::new(date, time)).to_string(),
            "2000-12-31 12:13:14"
        );
        assert_eq!(json!(Value::Date(date)), json!("2000-12-31"));
    }

    #[test]
    fn test_json() {
        let value = json!({"foo": "bar", "baz": 123});
        assert_eq!(
            Value::Json(value.clone()).to_string(),
            r#"{"foo":"bar","baz":123}"#
        );
        assert_eq!(json!(Value::Json(value.clone())), value);
    }

    #[test]
    fn test_from() {
        assert_eq!(Value::from(None::<Value>), Value::Null);
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(vec![42u8]), Value::Bytes(vec![42]));
        assert_eq!(Value::from(42i32), Value::I32(42));
        assert_eq!(Value::from(42i64), Value::I64(42));
        assert_eq!(Value::from(4.2f64), Value::F64(4.2));
        assert_eq!(Value::from("foo"), Value::String("foo".to_string()));
        assert_eq!(
            Value::from("foo".to_string()),
            Value::String("foo".to_string())
        );
        assert_eq!(
            Value::from(json!([1, 2])),
            Value::Json(json!([1, 2]))
        );
    }
}
