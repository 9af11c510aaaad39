//! SQL generation
//!
//! [`SqlGenerator`] lowers query specifications and entity writes into
//! parameterized [`GeneratedCommand`]s for one [`Dialect`]. Statements are
//! assembled with `sea-query` and rendered by the dialect's back-end, so
//! literals always travel as bound values.

mod command;
mod dialect;
mod generator;

pub use command::{GeneratedCommand, InsertCommand, ScalarCommand};
pub use dialect::{Dialect, IdentityStrategy, MySql, Postgres, Provider, Sqlite};
pub use generator::SqlGenerator;

use sea_query::Iden;

/// Runtime identifier (table, column or alias name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ident(pub String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Ident(name.into())
    }
}

impl Iden for Ident {
    fn unquoted(&self) -> &str {
        &self.0
    }
}
