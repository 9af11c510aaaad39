//! `TryGetable` for safe value extraction
//!
//! Stores are loose about integer widths (SQLite hands back every integer as
//! 64-bit, PostgreSQL `COUNT(*)` is `BIGINT`), so integer targets accept any
//! integer variant and range-check the conversion. Text-encoded JSON, UUID and
//! timestamp values are parsed, which is how SQLite returns them.

use chrono::NaiveDateTime;
use sea_query::Value;
use uuid::Uuid;

use crate::value::{is_null, ValueType};

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExtractionError {
    /// The value is null (None variant)
    NullValue,
    /// The value type doesn't match the expected type
    TypeMismatch { expected: String, actual: String },
    /// Value conversion failed (e.g., overflow, invalid format)
    ConversionError(String),
}

impl std::fmt::Display for ValueExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueExtractionError::NullValue => write!(f, "Value is null"),
            ValueExtractionError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            ValueExtractionError::ConversionError(msg) => {
                write!(f, "Conversion error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValueExtractionError {}

/// Error-aware extraction of a Rust value from `sea_query::Value`.
///
/// ```rust
/// use quarry::{TryGetable, ValueExtractionError};
/// use sea_query::Value;
///
/// assert_eq!(i32::try_get(Value::BigInt(Some(42))), Ok(42));
/// assert_eq!(i32::try_get(Value::Int(None)), Err(ValueExtractionError::NullValue));
/// assert_eq!(Option::<i32>::try_get(Value::Int(None)), Ok(None));
/// ```
pub trait TryGetable: ValueType {
    /// Returns:
    /// - `Ok(T)` if the value converts and is not null
    /// - `Err(ValueExtractionError::NullValue)` if the value is null
    /// - `Err(ValueExtractionError::TypeMismatch)` if the variant is incompatible
    /// - `Err(ValueExtractionError::ConversionError)` if conversion fails (e.g., overflow)
    fn try_get(value: Value) -> Result<Self, ValueExtractionError>;

    /// Like `try_get`, but a null value yields `Ok(None)`.
    fn try_get_opt(value: Value) -> Result<Option<Self>, ValueExtractionError> {
        match Self::try_get(value) {
            Ok(v) => Ok(Some(v)),
            Err(ValueExtractionError::NullValue) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn mismatch(expected: &str, value: &Value) -> ValueExtractionError {
    ValueExtractionError::TypeMismatch {
        expected: expected.to_string(),
        actual: format!("{:?}", value),
    }
}

fn integer(value: &Value) -> Option<i128> {
    match value {
        Value::TinyInt(Some(v)) => Some(i128::from(*v)),
        Value::SmallInt(Some(v)) => Some(i128::from(*v)),
        Value::Int(Some(v)) => Some(i128::from(*v)),
        Value::BigInt(Some(v)) => Some(i128::from(*v)),
        Value::TinyUnsigned(Some(v)) => Some(i128::from(*v)),
        Value::SmallUnsigned(Some(v)) => Some(i128::from(*v)),
        Value::Unsigned(Some(v)) => Some(i128::from(*v)),
        Value::BigUnsigned(Some(v)) => Some(i128::from(*v)),
        _ => None,
    }
}

macro_rules! impl_try_getable_integer {
    ($type:ty, $expected:expr) => {
        impl TryGetable for $type {
            fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
                if is_null(&value) {
                    return Err(ValueExtractionError::NullValue);
                }
                let n = integer(&value).ok_or_else(|| mismatch($expected, &value))?;
                <$type>::try_from(n).map_err(|_| {
                    ValueExtractionError::ConversionError(format!(
                        "{} out of range for {}",
                        n, $expected
                    ))
                })
            }
        }
    };
}

impl_try_getable_integer!(i16, "SmallInt");
impl_try_getable_integer!(i32, "Int");
impl_try_getable_integer!(i64, "BigInt");
impl_try_getable_integer!(u32, "Unsigned");

impl TryGetable for bool {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        if is_null(&value) {
            return Err(ValueExtractionError::NullValue);
        }
        match value {
            Value::Bool(Some(v)) => Ok(v),
            // SQLite has no boolean storage class
            ref other => match integer(other) {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(mismatch("Bool", other)),
            },
        }
    }
}

impl TryGetable for f64 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        if is_null(&value) {
            return Err(ValueExtractionError::NullValue);
        }
        match value {
            Value::Double(Some(v)) => Ok(v),
            Value::Float(Some(v)) => Ok(f64::from(v)),
            ref other => integer(other)
                .map(|n| n as f64)
                .ok_or_else(|| mismatch("Double", other)),
        }
    }
}

impl TryGetable for f32 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Float(Some(v)) => Ok(v),
            other => f64::try_get(other).map(|v| v as f32),
        }
    }
}

impl TryGetable for String {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::String(Some(v)) => Ok(v),
            Value::Char(Some(c)) => Ok(c.to_string()),
            ref other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl TryGetable for Vec<u8> {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Bytes(Some(v)) => Ok(v),
            ref other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("Bytes", &other)),
        }
    }
}

impl TryGetable for serde_json::Value {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Json(Some(v)) => {
                let json: &serde_json::Value = &v;
                Ok(json.clone())
            }
            Value::String(Some(text)) => serde_json::from_str(&text)
                .map_err(|e| ValueExtractionError::ConversionError(e.to_string())),
            ref other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("Json", &other)),
        }
    }
}

impl TryGetable for Uuid {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Uuid(Some(v)) => {
                let id: &Uuid = &v;
                Ok(*id)
            }
            Value::String(Some(text)) => Uuid::parse_str(&text)
                .map_err(|e| ValueExtractionError::ConversionError(e.to_string())),
            Value::Bytes(Some(bytes)) => Uuid::from_slice(&bytes)
                .map_err(|e| ValueExtractionError::ConversionError(e.to_string())),
            ref other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("Uuid", &other)),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl TryGetable for NaiveDateTime {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::ChronoDateTime(Some(v)) => {
                let dt: &NaiveDateTime = &v;
                Ok(*dt)
            }
            Value::String(Some(text)) => DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
                .ok_or_else(|| {
                    ValueExtractionError::ConversionError(format!(
                        "`{}` is not a timestamp",
                        text
                    ))
                }),
            ref other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(mismatch("DateTime", &other)),
        }
    }
}

impl<T: TryGetable> TryGetable for Option<T> {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        T::try_get_opt(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_get_success() {
        let value = Value::Int(Some(42));
        let result: Result<i32, _> = TryGetable::try_get(value);
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_try_get_null() {
        let value = Value::Int(None);
        let result: Result<i32, _> = TryGetable::try_get(value);
        assert!(matches!(result, Err(ValueExtractionError::NullValue)));
    }

    #[test]
    fn test_try_get_type_mismatch() {
        let value = Value::String(Some("hello".to_string()));
        let result: Result<i32, _> = TryGetable::try_get(value);
        assert!(matches!(result, Err(ValueExtractionError::TypeMismatch { .. })));
    }

    #[test]
    fn test_integer_widening_and_range() {
        assert_eq!(i64::try_get(Value::Int(Some(7))), Ok(7));
        assert_eq!(i32::try_get(Value::BigInt(Some(7))), Ok(7));
        assert!(matches!(
            i32::try_get(Value::BigInt(Some(i64::MAX))),
            Err(ValueExtractionError::ConversionError(_))
        ));
        assert!(matches!(
            u32::try_get(Value::BigInt(Some(-1))),
            Err(ValueExtractionError::ConversionError(_))
        ));
    }

    #[test]
    fn test_option_flattens_null() {
        assert_eq!(Option::<i32>::try_get(Value::BigInt(None)), Ok(None));
        assert_eq!(Option::<i32>::try_get(Value::BigInt(Some(3))), Ok(Some(3)));
        assert_eq!(Option::<String>::try_get(Value::String(None)), Ok(None));
    }

    #[test]
    fn test_bool_from_integer() {
        assert_eq!(bool::try_get(Value::BigInt(Some(1))), Ok(true));
        assert_eq!(bool::try_get(Value::BigInt(Some(0))), Ok(false));
        assert!(bool::try_get(Value::BigInt(Some(2))).is_err());
    }

    #[test]
    fn test_text_encoded_values() {
        let id = Uuid::new_v4();
        assert_eq!(Uuid::try_get(Value::String(Some(id.to_string()))), Ok(id));

        let json = serde_json::Value::try_get(Value::String(Some("{\"a\":1}".into())));
        assert_eq!(json, Ok(serde_json::json!({"a": 1})));

        let dt = NaiveDateTime::try_get(Value::String(Some("2024-01-02 03:04:05".into())));
        assert_eq!(dt.map(|d| d.to_string()), Ok("2024-01-02 03:04:05".to_string()));
    }

    #[test]
    fn test_double_from_integer() {
        assert_eq!(f64::try_get(Value::BigInt(Some(2))), Ok(2.0));
        assert_eq!(f32::try_get(Value::Double(Some(1.5))), Ok(1.5));
    }
}
