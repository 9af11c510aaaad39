use std::marker::PhantomData;

use sea_query::Value;

use crate::database::Database;
use crate::entity::Entity;
use crate::error::{QuarryError, Result};
use crate::expr::{Expression, ExpressionParser, Predicate};
use crate::value::ValueType;
use crate::sql::GeneratedCommand;

/// Shared filter state of the set-based write builders.
struct Filter {
    predicate: Option<Expression>,
    error: Option<QuarryError>,
}

impl Filter {
    fn new() -> Self {
        Self {
            predicate: None,
            error: None,
        }
    }

    fn add<E: Entity>(&mut self, db: &Database, predicate: Predicate) {
        match ExpressionParser::new(db.reader()).parse::<E>(predicate) {
            Ok(expression) => {
                self.predicate = Some(match self.predicate.take() {
                    Some(existing) => Expression::and([existing, expression]),
                    None => expression,
                });
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
    }
}

fn run(db: &Database, command: GeneratedCommand) -> Result<u64> {
    db.executor()
        .execute_non_query(std::slice::from_ref(&command), db.connection_string())
}

/// Set-based `UPDATE` of every `E` matching the filter.
///
/// Without a filter every row of the table is updated.
pub struct UpdateBuilder<E: Entity> {
    db: Database,
    assignments: Vec<(String, Value)>,
    filter: Filter,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> UpdateBuilder<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            assignments: Vec::new(),
            filter: Filter::new(),
            _entity: PhantomData,
        }
    }

    /// Assign `value` to `property`. A later assignment to the same property
    /// replaces the earlier one.
    pub fn set<V: ValueType>(mut self, property: impl Into<String>, value: V) -> Self {
        let property = property.into();
        let value = value.into_value();
        match self.assignments.iter_mut().find(|(p, _)| *p == property) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((property, value)),
        }
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.add::<E>(&self.db, predicate);
        self
    }

    /// Returns the number of affected rows.
    pub fn execute(self) -> Result<u64> {
        if let Some(e) = self.filter.error {
            return Err(e);
        }
        let command = self.db.generator().update(
            E::info(),
            &self.assignments,
            self.filter.predicate.as_ref(),
        )?;
        run(&self.db, command)
    }
}

/// Set-based `DELETE` of every `E` matching the filter.
pub struct DeleteBuilder<E: Entity> {
    db: Database,
    filter: Filter,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> DeleteBuilder<E> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            filter: Filter::new(),
            _entity: PhantomData,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.add::<E>(&self.db, predicate);
        self
    }

    /// Returns the number of affected rows.
    pub fn execute(self) -> Result<u64> {
        if let Some(e) = self.filter.error {
            return Err(e);
        }
        let command = self
            .db
            .generator()
            .delete(E::info(), self.filter.predicate.as_ref())?;
        run(&self.db, command)
    }
}
