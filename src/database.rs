//! The caller-facing handle
//!
//! A [`Database`] ties a convention reader, a dialect-specific generator and
//! an executor to one connection string. It is cheap to clone and safe to
//! share across coroutines.

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::convention::ConventionReader;
use crate::entity::Entity;
use crate::error::{ConfigurationError, Result};
use crate::executor::CommandExecutor;
use crate::expr::prop;
use crate::query::{DeleteBuilder, Query, UpdateBuilder};
use crate::runner::AsyncTask;
use crate::sql::{Dialect, GeneratedCommand, InsertCommand, Provider, SqlGenerator};
use crate::value::ValueType;

struct Inner {
    reader: Arc<ConventionReader>,
    generator: SqlGenerator,
    executor: Arc<dyn CommandExecutor>,
    connection_string: String,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.inner.generator.dialect().name())
            .field("connection_string", &self.inner.connection_string)
            .finish()
    }
}

impl Database {
    pub fn new(
        dialect: Arc<dyn Dialect>,
        reader: Arc<ConventionReader>,
        executor: Arc<dyn CommandExecutor>,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                generator: SqlGenerator::new(dialect, reader.clone()),
                reader,
                executor,
                connection_string: connection_string.into(),
            }),
        }
    }

    /// Build a handle from loaded settings, using the bundled executor for
    /// the configured provider.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let executor: Arc<dyn CommandExecutor> = match config.provider {
            #[cfg(feature = "postgres")]
            Provider::Postgres => Arc::new(crate::executor::MayPostgresExecutor::new()),
            #[cfg(feature = "sqlite")]
            Provider::Sqlite => Arc::new(crate::executor::SqliteExecutor::new()),
            other => {
                return Err(ConfigurationError::Invalid(format!(
                    "no bundled executor for provider {:?}; use Database::new with your own",
                    other
                ))
                .into())
            }
        };
        let reader = Arc::new(ConventionReader::with_convention(config.naming.convention()));
        log::debug!("quarry database configured for {:?}", config.provider);
        Ok(Self::new(config.provider.dialect(), reader, executor, config.url.clone()))
    }

    pub fn reader(&self) -> &ConventionReader {
        &self.inner.reader
    }

    pub fn generator(&self) -> &SqlGenerator {
        &self.inner.generator
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.inner.executor.as_ref()
    }

    pub fn connection_string(&self) -> &str {
        &self.inner.connection_string
    }

    pub fn query<E: Entity>(&self) -> Query<E> {
        Query::new(self.clone())
    }

    /// The entity whose identity equals `id`.
    pub fn find<E: Entity>(&self, id: impl ValueType) -> Result<Option<E>> {
        let metadata = self.reader().metadata::<E>()?;
        let identity = metadata.identity()?.name();
        self.query::<E>().filter(prop(identity).eq(id)).execute()
    }

    /// Insert `entity`. A store-generated identity is written back into it.
    pub fn insert<E: Entity>(&self, entity: &mut E) -> Result<()> {
        match self.generator().insert(entity)? {
            InsertCommand::Plain(command) => {
                self.execute(std::slice::from_ref(&command))?;
            }
            InsertCommand::Identity(command) => {
                let id = self
                    .executor()
                    .execute_scalar(&command, self.connection_string())?;
                let identity = self.reader().metadata::<E>()?.identity()?.name();
                entity.set(identity, id)?;
            }
        }
        Ok(())
    }

    pub fn update<E: Entity>(&self) -> UpdateBuilder<E> {
        UpdateBuilder::new(self.clone())
    }

    pub fn delete<E: Entity>(&self) -> DeleteBuilder<E> {
        DeleteBuilder::new(self.clone())
    }

    /// Write every mapped property of `entity` to the row with its identity.
    pub fn update_entity<E: Entity>(&self, entity: &E) -> Result<u64> {
        let command = self.generator().update_by_identity(entity)?;
        self.execute(std::slice::from_ref(&command))
    }

    pub fn delete_entity<E: Entity>(&self, entity: &E) -> Result<u64> {
        let command = self.generator().delete_by_identity(entity)?;
        self.execute(std::slice::from_ref(&command))
    }

    /// Run `commands` in one transaction, returning the affected row count.
    pub fn execute(&self, commands: &[GeneratedCommand]) -> Result<u64> {
        self.executor()
            .execute_non_query(commands, self.connection_string())
    }

    /// Run `operation` against a clone of this handle on its own coroutine.
    pub fn spawn<T, F>(&self, operation: F) -> AsyncTask<T>
    where
        T: Send + 'static,
        F: FnOnce(Database) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        AsyncTask::spawn(move || operation(db))
    }
}
