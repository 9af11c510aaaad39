use std::sync::Arc;

use sea_query::{
    DeleteStatement, InsertStatement, MysqlQueryBuilder, PostgresQueryBuilder, SelectStatement,
    SqliteQueryBuilder, UpdateStatement,
};
use serde::Deserialize;

use crate::sql::command::GeneratedCommand;

/// How a store reports the identity it generated for an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// `INSERT ... RETURNING "<id>"`
    Returning,
    /// A session-scoped query run right after the insert
    FollowUp(&'static str),
}

/// A SQL back-end: renders `sea-query` statements and knows how identities
/// come back from inserts.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn identity_strategy(&self) -> IdentityStrategy;

    fn build_select(&self, statement: &SelectStatement) -> GeneratedCommand;

    fn build_insert(&self, statement: &InsertStatement) -> GeneratedCommand;

    fn build_update(&self, statement: &UpdateStatement) -> GeneratedCommand;

    fn build_delete(&self, statement: &DeleteStatement) -> GeneratedCommand;
}

macro_rules! impl_dialect {
    ($type:ident, $name:expr, $builder:ident, $strategy:expr) => {
        impl Dialect for $type {
            fn name(&self) -> &'static str {
                $name
            }

            fn identity_strategy(&self) -> IdentityStrategy {
                $strategy
            }

            fn build_select(&self, statement: &SelectStatement) -> GeneratedCommand {
                statement.build($builder).into()
            }

            fn build_insert(&self, statement: &InsertStatement) -> GeneratedCommand {
                statement.build($builder).into()
            }

            fn build_update(&self, statement: &UpdateStatement) -> GeneratedCommand {
                statement.build($builder).into()
            }

            fn build_delete(&self, statement: &DeleteStatement) -> GeneratedCommand {
                statement.build($builder).into()
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl_dialect!(Postgres, "postgres", PostgresQueryBuilder, IdentityStrategy::Returning);
impl_dialect!(
    MySql,
    "mysql",
    MysqlQueryBuilder,
    IdentityStrategy::FollowUp("SELECT LAST_INSERT_ID()")
);
impl_dialect!(
    Sqlite,
    "sqlite",
    SqliteQueryBuilder,
    IdentityStrategy::FollowUp("SELECT last_insert_rowid()")
);

/// Configured store kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl Provider {
    pub fn dialect(self) -> Arc<dyn Dialect> {
        match self {
            Provider::Postgres => Arc::new(Postgres),
            Provider::Mysql => Arc::new(MySql),
            Provider::Sqlite => Arc::new(Sqlite),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Provider::Postgres),
            "mysql" => Ok(Provider::Mysql),
            "sqlite" => Ok(Provider::Sqlite),
            other => Err(format!("unknown provider `{}`", other)),
        }
    }
}
