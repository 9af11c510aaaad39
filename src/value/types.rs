//! `ValueType` and `FieldType`
//!
//! `ValueType` maps a Rust type to the `sea_query::Value` variant it is bound
//! as, and to the `FieldType` recorded for it in an entity descriptor table.
//! The derive macro reads `FIELD_TYPE` and `NULLABLE` through this trait, so
//! any field type used on an entity must implement it.
//!
//! Implemented for:
//!
//! - Integer types: `i16`, `i32`, `i64`, `u32`
//! - Floating point: `f32`, `f64`
//! - `bool`, `String`, `Vec<u8>`, `serde_json::Value`
//! - `uuid::Uuid`, `chrono::NaiveDateTime`
//! - `Option<T>` for all of the above

use chrono::NaiveDateTime;
use sea_query::Value;
use uuid::Uuid;

/// Declared storage type of an entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    SmallInt,
    Int,
    BigInt,
    Unsigned,
    Float,
    Double,
    String,
    Bytes,
    Json,
    Uuid,
    DateTime,
}

impl FieldType {
    /// Integer columns are the ones a store can generate values for.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::SmallInt | FieldType::Int | FieldType::BigInt | FieldType::Unsigned
        )
    }

    /// The typed null bound for this column.
    pub fn null_value(self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(None),
            FieldType::SmallInt => Value::SmallInt(None),
            FieldType::Int => Value::Int(None),
            FieldType::BigInt => Value::BigInt(None),
            FieldType::Unsigned => Value::Unsigned(None),
            FieldType::Float => Value::Float(None),
            FieldType::Double => Value::Double(None),
            FieldType::String => Value::String(None),
            FieldType::Bytes => Value::Bytes(None),
            FieldType::Json => Value::Json(None),
            FieldType::Uuid => Value::Uuid(None),
            FieldType::DateTime => Value::ChronoDateTime(None),
        }
    }

    /// Whether a non-null literal can be compared with a column of this type.
    ///
    /// Integer widths are interchangeable, and floating columns also accept
    /// integers. Everything else must match its own variant.
    pub fn accepts(self, value: &Value) -> bool {
        let integer = matches!(
            value,
            Value::TinyInt(_)
                | Value::SmallInt(_)
                | Value::Int(_)
                | Value::BigInt(_)
                | Value::TinyUnsigned(_)
                | Value::SmallUnsigned(_)
                | Value::Unsigned(_)
                | Value::BigUnsigned(_)
        );
        match self {
            FieldType::SmallInt | FieldType::Int | FieldType::BigInt | FieldType::Unsigned => {
                integer
            }
            FieldType::Float | FieldType::Double => {
                integer || matches!(value, Value::Float(_) | Value::Double(_))
            }
            FieldType::Bool => matches!(value, Value::Bool(_)),
            FieldType::String => matches!(value, Value::String(_) | Value::Char(_)),
            FieldType::Bytes => matches!(value, Value::Bytes(_)),
            FieldType::Json => matches!(value, Value::Json(_)),
            FieldType::Uuid => matches!(value, Value::Uuid(_)),
            FieldType::DateTime => matches!(value, Value::ChronoDateTime(_)),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Maps a Rust type to its `sea_query::Value` variant.
///
/// ```rust
/// use quarry::{FieldType, ValueType};
/// use sea_query::Value;
///
/// assert!(matches!(42i32.into_value(), Value::Int(Some(42))));
/// assert!(matches!(None::<i32>.into_value(), Value::Int(None)));
/// assert_eq!(<Option<String> as ValueType>::FIELD_TYPE, FieldType::String);
/// ```
pub trait ValueType: Sized {
    /// Declared column type.
    const FIELD_TYPE: FieldType;
    /// `true` only for `Option<T>`.
    const NULLABLE: bool = false;

    /// Convert this value into a `sea_query::Value`.
    fn into_value(self) -> Value;

    /// Return the null variant for this type.
    fn null_value() -> Value {
        Self::FIELD_TYPE.null_value()
    }
}

macro_rules! impl_value_type {
    ($type:ty, $field:ident, $variant:ident) => {
        impl ValueType for $type {
            const FIELD_TYPE: FieldType = FieldType::$field;

            fn into_value(self) -> Value {
                Value::$variant(Some(self))
            }
        }
    };
}

impl_value_type!(bool, Bool, Bool);
impl_value_type!(i16, SmallInt, SmallInt);
impl_value_type!(i32, Int, Int);
impl_value_type!(i64, BigInt, BigInt);
impl_value_type!(u32, Unsigned, Unsigned);
impl_value_type!(f32, Float, Float);
impl_value_type!(f64, Double, Double);
impl_value_type!(String, String, String);
impl_value_type!(Vec<u8>, Bytes, Bytes);

impl ValueType for serde_json::Value {
    const FIELD_TYPE: FieldType = FieldType::Json;

    fn into_value(self) -> Value {
        Value::Json(Some(Box::new(self)))
    }
}

impl ValueType for Uuid {
    const FIELD_TYPE: FieldType = FieldType::Uuid;

    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl ValueType for NaiveDateTime {
    const FIELD_TYPE: FieldType = FieldType::DateTime;

    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl<T: ValueType> ValueType for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => T::null_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_to_typed_null() {
        assert_eq!(None::<i64>.into_value(), Value::BigInt(None));
        assert_eq!(None::<String>.into_value(), Value::String(None));
        assert_eq!(Some(7i64).into_value(), Value::BigInt(Some(7)));
        assert!(<Option<i32> as ValueType>::NULLABLE);
        assert!(!<i32 as ValueType>::NULLABLE);
    }

    #[test]
    fn test_json_is_boxed() {
        let value = serde_json::json!({"a": 1}).into_value();
        assert!(matches!(value, Value::Json(Some(_))));
    }

    #[test]
    fn test_integer_field_types() {
        assert!(FieldType::Int.is_integer());
        assert!(FieldType::BigInt.is_integer());
        assert!(!FieldType::Uuid.is_integer());
        assert!(!FieldType::String.is_integer());
    }

    #[test]
    fn test_accepts_across_integer_widths() {
        assert!(FieldType::Int.accepts(&Value::BigInt(Some(1))));
        assert!(FieldType::BigInt.accepts(&Value::Int(Some(1))));
        assert!(FieldType::Double.accepts(&Value::Int(Some(1))));
        assert!(!FieldType::Int.accepts(&Value::String(Some("1".into()))));
        assert!(!FieldType::String.accepts(&Value::Int(Some(1))));
    }
}
