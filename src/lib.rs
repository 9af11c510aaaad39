//! # Quarry
//!
//! Convention-driven object/relational mapping: entities described by a
//! derive, filters written as typed predicates, SQL generated per dialect
//! with sea-query, and results materialized back into entity graphs.
//!
//! ```no_run
//! use quarry::expr::prop;
//! use quarry::{Database, DatabaseConfig, Entity};
//!
//! #[derive(Debug, Default, Entity)]
//! pub struct User {
//!     pub id: i32,
//!     pub username: String,
//! }
//!
//! # fn main() -> quarry::Result<()> {
//! let db = Database::from_config(&DatabaseConfig::load()?)?;
//! let mut user = User { username: "ferris".into(), ..Default::default() };
//! db.insert(&mut user)?;
//! let found = db.query::<User>().filter(prop("Username").eq("ferris".to_string())).execute()?;
//! # Ok(())
//! # }
//! ```

// Lets the derive's `::quarry::` paths resolve inside this crate's own tests.
extern crate self as quarry;

pub mod config;
pub mod convention;
pub mod database;
pub mod entity;
pub mod error;
pub mod executor;
pub mod expr;
pub mod mapper;
pub mod query;
pub mod runner;
pub mod sql;
pub mod value;

#[cfg(test)]
mod tests_cfg;

pub use quarry_derive::Entity;
pub use sea_query;

pub use config::{DatabaseConfig, Naming};
pub use convention::{Convention, ConventionReader, DefaultConvention, SnakeCaseConvention};
pub use database::Database;
pub use entity::{EntityInfo, NavigationInfo, PropertyInfo};
pub use error::{ConfigurationError, MapError, QuarryError, Result, StoreError, TranslationError};
pub use executor::CommandExecutor;
pub use mapper::{EntityMapper, Row};
pub use query::{Query, QuerySpecification};
pub use runner::AsyncTask;
pub use sql::{GeneratedCommand, Provider, SqlGenerator};
pub use value::{FieldType, TryGetable, ValueExtractionError, ValueType};

// Trait re-export; shares the name of the derive macro above
pub use entity::Entity;
