//! Error taxonomy for the translation pipeline.
//!
//! Errors fall into four families:
//! - **Configuration**: the entity/convention setup cannot support the request
//!   (missing identity, unknown property, empty names). Never retried.
//! - **Translation**: the requested query shape cannot be lowered to SQL.
//!   Raised before any command reaches the store.
//! - **Map**: a result row could not be materialized into the target type.
//! - **Store**: opaque failures from the execution collaborator, propagated
//!   unchanged.

use sea_query::Value;
use thiserror::Error;

use crate::value::ValueExtractionError;

/// Result alias used throughout the crate.
pub type Result<T, E = QuarryError> = std::result::Result<T, E>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Entity or convention setup error
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Query shape cannot be translated
    #[error("translation error: {0}")]
    Translation(#[from] TranslationError),
    /// Row materialization failure
    #[error("mapping error: {0}")]
    Map(#[from] MapError),
    /// Failure reported by the execution collaborator
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("entity `{entity}` has no identity property")]
    MissingIdentity { entity: String },
    #[error("entity `{entity}` has no mapped property `{property}`")]
    MissingProperty { entity: String, property: String },
    #[error("entity `{entity}` has no navigation `{navigation}`")]
    MissingNavigation { entity: String, navigation: String },
    #[error("convention produced an empty table name for entity `{entity}`")]
    EmptyTableName { entity: String },
    #[error("convention produced an empty column name for `{entity}.{property}`")]
    EmptyColumnName { entity: String, property: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// The predicate uses a construct the parser does not translate.
    #[error("unsupported predicate construct: {construct}")]
    UnsupportedPredicate { construct: String },
    #[error("value {value} is not compatible with `{property}` of type {expected}")]
    TypeMismatch {
        property: String,
        expected: String,
        value: String,
    },
    #[error("`top` cannot be combined with a join; select the ids with `top` first, then query them with the join")]
    TopWithJoin,
    #[error("`top` cannot be combined with `page`")]
    TopWithPage,
    #[error("`page` cannot be combined with a collection join")]
    PageWithCollectionJoin,
    #[error("join through `{navigation}` widens the result; joins must follow a to-one navigation back to the root")]
    WideningJoin { navigation: String },
    #[error("navigation `{navigation}` on `{entity}` does not lead to `{expected}`")]
    JoinTargetMismatch {
        entity: String,
        navigation: String,
        expected: String,
    },
    #[error("only one collection join is supported per query")]
    MultipleCollectionJoins,
    #[error("a projection cannot be combined with joins")]
    ProjectionWithJoin,
    #[error("update of `{entity}` has no assignments")]
    NoAssignments { entity: String },
    #[error("page size must be greater than zero")]
    EmptyPage,
}

impl TranslationError {
    pub(crate) fn unsupported(construct: impl Into<String>) -> Self {
        TranslationError::UnsupportedPredicate {
            construct: construct.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// The target type has no property with this name
    #[error("`{entity}` has no property `{property}`")]
    MissingProperty { entity: String, property: String },
    /// A column alias the mapper needs is absent from the row
    #[error("row has no column `{alias}` for `{entity}`")]
    UnresolvableAlias { entity: String, alias: String },
    /// A value could not be converted into the property's Rust type
    #[error("cannot assign {value:?} to `{entity}.{property}`: {source}")]
    Conversion {
        entity: String,
        property: String,
        value: Value,
        #[source]
        source: ValueExtractionError,
    },
    /// A related instance of the wrong type was attached to a navigation
    #[error("`{entity}.{navigation}` cannot hold the supplied related entity")]
    NavigationMismatch { entity: String, navigation: String },
}

/// Failure reported by the execution collaborator.
///
/// The core never inspects or retries these; the message and the driver's
/// source error are kept for the caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
