//! Value type system
//!
//! Rust types cross the store boundary as `sea_query::Value`. This module holds
//! the conversions in both directions plus the declared column type that the
//! entity descriptor tables carry for each property.
//!
//! ## Traits
//!
//! - **`ValueType`** - Maps Rust types to a `sea_query::Value` variant and a `FieldType`
//! - **`TryGetable`** - Error-aware extraction, lenient across integer widths

pub mod types;
pub mod try_getable;

pub use types::{FieldType, ValueType};
pub use try_getable::{TryGetable, ValueExtractionError};

use sea_query::Value;

/// Returns `true` when the value is the null of its variant.
pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Bool(v) => v.is_none(),
        Value::TinyInt(v) => v.is_none(),
        Value::SmallInt(v) => v.is_none(),
        Value::Int(v) => v.is_none(),
        Value::BigInt(v) => v.is_none(),
        Value::TinyUnsigned(v) => v.is_none(),
        Value::SmallUnsigned(v) => v.is_none(),
        Value::Unsigned(v) => v.is_none(),
        Value::BigUnsigned(v) => v.is_none(),
        Value::Float(v) => v.is_none(),
        Value::Double(v) => v.is_none(),
        Value::String(v) => v.is_none(),
        Value::Char(v) => v.is_none(),
        Value::Bytes(v) => v.is_none(),
        Value::Json(v) => v.is_none(),
        Value::Uuid(v) => v.is_none(),
        Value::ChronoDate(v) => v.is_none(),
        Value::ChronoTime(v) => v.is_none(),
        Value::ChronoDateTime(v) => v.is_none(),
        Value::ChronoDateTimeUtc(v) => v.is_none(),
        Value::ChronoDateTimeLocal(v) => v.is_none(),
        Value::ChronoDateTimeWithTimeZone(v) => v.is_none(),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// Short rendering of a value for diagnostics (`Int(Some(5))` becomes `5`).
pub(crate) fn describe(value: &Value) -> String {
    if is_null(value) {
        return "NULL".to_string();
    }
    match value {
        Value::String(Some(s)) => format!("{:?}", s),
        Value::Bool(Some(b)) => b.to_string(),
        Value::TinyInt(Some(v)) => v.to_string(),
        Value::SmallInt(Some(v)) => v.to_string(),
        Value::Int(Some(v)) => v.to_string(),
        Value::BigInt(Some(v)) => v.to_string(),
        Value::Unsigned(Some(v)) => v.to_string(),
        Value::BigUnsigned(Some(v)) => v.to_string(),
        Value::Double(Some(v)) => v.to_string(),
        other => format!("{:?}", other),
    }
}
