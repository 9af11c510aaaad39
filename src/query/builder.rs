use std::marker::PhantomData;

use crate::database::Database;
use crate::entity::Entity;
use crate::error::{QuarryError, Result};
use crate::expr::{ExpressionParser, Predicate};
use crate::mapper::EntityMapper;
use crate::query::{Direction, JoinDescriptor, QuerySpecification};
use crate::runner::AsyncTask;
use crate::value::TryGetable;

/// Fluent select builder for entity `E`.
///
/// Builder calls never fail on their own: the first error (unknown property,
/// untranslatable predicate) is held and returned by the terminal call,
/// before anything reaches the store. Terminal calls consume the builder.
///
/// ```no_run
/// # use quarry::{Database, Entity};
/// # use quarry::expr::prop;
/// # #[derive(Default, Entity)] pub struct Post { pub id: i32, pub title: String }
/// # fn example(db: &Database) -> quarry::Result<()> {
/// let titles: Vec<String> = db
///     .query::<Post>()
///     .select("Title")
///     .filter(prop("Id").eq(3))
///     .order_by("Title")
///     .execute_scalar_list()?;
/// # Ok(())
/// # }
/// ```
pub struct Query<E: Entity> {
    db: Database,
    spec: QuerySpecification,
    error: Option<QuarryError>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            spec: QuerySpecification::of::<E>(),
            error: None,
            _entity: PhantomData,
        }
    }

    fn check(mut self, result: Result<()>) -> Self {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
        self
    }

    fn check_property(&self, property: &str) -> Result<()> {
        self.db
            .reader()
            .metadata::<E>()?
            .require_property(property)
            .map(|_| ())
    }

    /// Project a single property instead of the whole entity.
    pub fn select(mut self, property: impl Into<String>) -> Self {
        let property = property.into();
        let checked = self.check_property(&property);
        self.spec.projection = Some(property);
        self.check(checked)
    }

    /// Add a filter, conjoined with any filter already installed.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        let parsed = ExpressionParser::new(self.db.reader()).parse::<E>(predicate);
        match parsed {
            Ok(expression) => {
                self.spec.add_predicate(expression);
                self
            }
            Err(e) => self.check(Err(e)),
        }
    }

    pub fn order_by(self, property: impl Into<String>) -> Self {
        self.order(property.into(), Direction::Asc)
    }

    pub fn order_by_desc(self, property: impl Into<String>) -> Self {
        self.order(property.into(), Direction::Desc)
    }

    fn order(mut self, property: String, direction: Direction) -> Self {
        let checked = self.check_property(&property);
        self.spec.ordering.push((property, direction));
        self.check(checked)
    }

    /// Cap the number of rows. Cannot be combined with joins or paging.
    pub fn top(mut self, n: u64) -> Self {
        self.spec.top = Some(n);
        self
    }

    /// Zero-based page `index` of `size` rows.
    pub fn page(mut self, index: u64, size: u64) -> Self {
        self.spec.page = Some((index, size));
        self
    }

    /// Join child entity `C` through its to-one `navigation` back to `E`,
    /// appending each child to `E`'s `collection`.
    pub fn join<C: Entity>(mut self, navigation: impl Into<String>, collection: impl Into<String>) -> Self {
        self.spec.joins.push(JoinDescriptor::collection(
            navigation,
            collection,
            E::info().name,
            C::info(),
        ));
        self
    }

    /// Load `E`'s to-one `navigation` (of type `R`) in the same select.
    pub fn include<R: Entity>(mut self, navigation: impl Into<String>) -> Self {
        self.spec
            .joins
            .push(JoinDescriptor::reference(navigation, E::info().name, R::info()));
        self
    }

    /// Finish building.
    pub fn specification(self) -> Result<QuerySpecification> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.spec),
        }
    }

    fn into_parts(self) -> Result<(Database, QuerySpecification)> {
        let db = self.db.clone();
        self.specification().map(|spec| (db, spec))
    }

    /// First matching entity, if any.
    pub fn execute(mut self) -> Result<Option<E>> {
        // A join spreads one root over several rows, so only a plain select
        // can be cut to a single row
        if self.spec.joins.is_empty() && self.spec.page.is_none() && self.spec.top.is_none() {
            self.spec.top = Some(1);
        }
        Ok(self.execute_list()?.into_iter().next())
    }

    pub fn execute_list(self) -> Result<Vec<E>> {
        let (db, spec) = self.into_parts()?;
        let command = db.generator().select(&spec)?;
        let rows = db.executor().execute_reader(&command, db.connection_string())?;
        EntityMapper::new(db.reader()).materialize_list::<E>(&rows, &spec.joins)
    }

    /// First column of the first row, `None` when there are no rows or the
    /// value is NULL.
    pub fn execute_scalar<T: TryGetable>(self) -> Result<Option<T>> {
        let (db, spec) = self.into_parts()?;
        let command = db.generator().select(&spec)?;
        let rows = db.executor().execute_reader(&command, db.connection_string())?;
        match rows.first() {
            Some(row) => EntityMapper::new(db.reader()).scalar::<Option<T>>(row),
            None => Ok(None),
        }
    }

    /// First column of every row.
    pub fn execute_scalar_list<T: TryGetable>(self) -> Result<Vec<T>> {
        let (db, spec) = self.into_parts()?;
        let command = db.generator().select(&spec)?;
        let rows = db.executor().execute_reader(&command, db.connection_string())?;
        let mapper = EntityMapper::new(db.reader());
        rows.iter().map(|row| mapper.scalar::<T>(row)).collect()
    }

    /// Number of entities matching the filter.
    pub fn count(self) -> Result<u64> {
        let (db, spec) = self.into_parts()?;
        let command = db.generator().count(&spec)?;
        let rows = db.executor().execute_reader(&command, db.connection_string())?;
        let count = match rows.first() {
            Some(row) => EntityMapper::new(db.reader()).scalar::<i64>(row)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub fn execute_async(self) -> AsyncTask<Option<E>> {
        AsyncTask::spawn(move || self.execute())
    }

    pub fn execute_list_async(self) -> AsyncTask<Vec<E>> {
        AsyncTask::spawn(move || self.execute_list())
    }
}
