//! Lowering of specifications and writes into commands

use std::collections::HashSet;
use std::sync::Arc;

use sea_query::{
    Asterisk, Condition, DeleteStatement, Expr, ExprTrait, Func, InsertStatement, JoinType, Order,
    SelectStatement, UpdateStatement, Value,
};

use crate::convention::{ConventionReader, EntityMetadata, IdentityKind};
use crate::entity::{Cardinality, Entity, EntityInfo};
use crate::error::{ConfigurationError, Result, TranslationError};
use crate::expr::Expression;
use crate::query::{Direction, JoinDescriptor, JoinKind, QuerySpecification};
use crate::sql::command::{GeneratedCommand, InsertCommand, ScalarCommand};
use crate::sql::dialect::{Dialect, IdentityStrategy};
use crate::sql::Ident;
use crate::value::{describe, is_null};

/// What to write for a to-one foreign key whose navigation is not loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unloaded {
    Null,
    // Entities read without an include leave the navigation empty
    Skip,
}

/// Per-dialect SQL generator.
///
/// Generation is pure: the same specification always yields the same text
/// and values.
#[derive(Debug, Clone)]
pub struct SqlGenerator {
    dialect: Arc<dyn Dialect>,
    reader: Arc<ConventionReader>,
}

impl SqlGenerator {
    pub fn new(dialect: Arc<dyn Dialect>, reader: Arc<ConventionReader>) -> Self {
        Self { dialect, reader }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn reader(&self) -> &Arc<ConventionReader> {
        &self.reader
    }

    /// `SELECT * FROM "<table>" [WHERE "<col>" = ? AND ...]`
    pub fn generate_select_query(&self, table: &str, filters: &[(&str, Value)]) -> GeneratedCommand {
        let mut select = SelectStatement::default();
        select.column(Asterisk).from(Ident::new(table));
        for (column, value) in filters {
            select.and_where(Expr::col(Ident::new(*column)).eq(value.clone()));
        }
        self.log(self.dialect.build_select(&select))
    }

    pub fn select(&self, spec: &QuerySpecification) -> Result<GeneratedCommand> {
        self.validate(spec)?;
        let root = self.reader.metadata_for(spec.entity)?;

        let mut select = SelectStatement::default();
        if spec.joins.is_empty() {
            self.select_plain(&mut select, spec, &root)?;
        } else {
            self.select_joined(&mut select, spec, &root)?;
        }

        if let Some(predicate) = &spec.predicate {
            let qualifier = (!spec.joins.is_empty()).then_some(root.name());
            select.cond_where(self.lower(spec.entity, predicate, qualifier)?);
        }

        self.apply_window(&mut select, spec, &root)?;
        Ok(self.log(self.dialect.build_select(&select)))
    }

    /// `SELECT COUNT(*)` over the specification's filter. Ordering, paging
    /// and joins do not change the number of root rows and are ignored.
    pub fn count(&self, spec: &QuerySpecification) -> Result<GeneratedCommand> {
        let root = self.reader.metadata_for(spec.entity)?;
        let mut select = SelectStatement::default();
        select
            .expr(Func::count(Expr::col(Asterisk)))
            .from(Ident::new(&root.table));
        if let Some(predicate) = &spec.predicate {
            select.cond_where(self.lower(spec.entity, predicate, None)?);
        }
        Ok(self.log(self.dialect.build_select(&select)))
    }

    fn select_plain(
        &self,
        select: &mut SelectStatement,
        spec: &QuerySpecification,
        root: &EntityMetadata,
    ) -> Result<()> {
        match &spec.projection {
            Some(property) => {
                select.column(Ident::new(root.column(property)?));
            }
            None => {
                for property in &root.properties {
                    select.column(Ident::new(&property.column));
                }
            }
        }
        select.from(Ident::new(&root.table));
        Ok(())
    }

    fn select_joined(
        &self,
        select: &mut SelectStatement,
        spec: &QuerySpecification,
        root: &EntityMetadata,
    ) -> Result<()> {
        let root_alias = root.name();
        select.from_as(Ident::new(&root.table), Ident::new(root_alias));
        self.select_aliased(select, root, root_alias);

        for join in &spec.joins {
            let child = self.reader.metadata_for(join.entity)?;
            // The to-one side stores the foreign key; the other side is
            // matched on its identity.
            let on = match join.kind {
                JoinKind::Reference => {
                    let fk = self.reader.foreign_key_column(spec.entity, &join.navigation)?;
                    let target_id = child.identity()?;
                    Expr::col((Ident::new(&join.parent_alias), Ident::new(fk)))
                        .equals((Ident::new(&join.child_alias), Ident::new(&target_id.column)))
                }
                JoinKind::Collection { .. } => {
                    let fk = self.reader.foreign_key_column(join.entity, &join.navigation)?;
                    let root_id = root.identity()?;
                    Expr::col((Ident::new(&join.child_alias), Ident::new(fk)))
                        .equals((Ident::new(&join.parent_alias), Ident::new(&root_id.column)))
                }
            };
            select.join_as(
                JoinType::LeftJoin,
                Ident::new(&child.table),
                Ident::new(&join.child_alias),
                on,
            );
            self.select_aliased(select, &child, &join.child_alias);
        }
        Ok(())
    }

    fn select_aliased(&self, select: &mut SelectStatement, metadata: &EntityMetadata, alias: &str) {
        for property in &metadata.properties {
            select.expr_as(
                Expr::col((Ident::new(alias), Ident::new(&property.column))),
                Ident::new(format!("{} {}", alias, property.column)),
            );
        }
    }

    fn apply_window(
        &self,
        select: &mut SelectStatement,
        spec: &QuerySpecification,
        root: &EntityMetadata,
    ) -> Result<()> {
        let qualifier = (!spec.joins.is_empty()).then_some(root.name());
        let column = |name: &str| -> Expr {
            match qualifier {
                Some(alias) => Expr::col((Ident::new(alias), Ident::new(name))),
                None => Expr::col(Ident::new(name)),
            }
        };

        for (property, direction) in &spec.ordering {
            let order = match direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            select.order_by_expr(column(root.column(property)?), order);
        }

        if let Some((index, size)) = spec.page {
            if spec.ordering.is_empty() {
                // Unordered paging is not stable across calls
                select.order_by_expr(column(&root.identity()?.column), Order::Asc);
            }
            select.limit(size).offset(index.saturating_mul(size));
        } else if let Some(top) = spec.top {
            select.limit(top);
        }
        Ok(())
    }

    /// Reject specification shapes that have no well-defined SQL.
    fn validate(&self, spec: &QuerySpecification) -> Result<()> {
        if spec.top.is_some() && !spec.joins.is_empty() {
            return Err(TranslationError::TopWithJoin.into());
        }
        if spec.top.is_some() && spec.page.is_some() {
            return Err(TranslationError::TopWithPage.into());
        }
        if let Some((_, 0)) = spec.page {
            return Err(TranslationError::EmptyPage.into());
        }
        if spec.projection.is_some() && !spec.joins.is_empty() {
            return Err(TranslationError::ProjectionWithJoin.into());
        }
        let collections = spec.joins.iter().filter(|j| j.is_collection()).count();
        if collections > 1 {
            return Err(TranslationError::MultipleCollectionJoins.into());
        }
        if collections == 1 && spec.page.is_some() {
            return Err(TranslationError::PageWithCollectionJoin.into());
        }

        let mut aliases = HashSet::new();
        aliases.insert(spec.entity.name);
        for join in &spec.joins {
            self.validate_join(spec.entity, join)?;
            if !aliases.insert(join.child_alias.as_str()) {
                return Err(ConfigurationError::Invalid(format!(
                    "`{}` is joined more than once",
                    join.child_alias
                ))
                .into());
            }
        }
        Ok(())
    }

    fn validate_join(&self, root: &'static EntityInfo, join: &JoinDescriptor) -> Result<()> {
        // The navigation is to-one on whichever side holds the foreign key
        let (owner, target) = match join.kind {
            JoinKind::Reference => (root, join.entity),
            JoinKind::Collection { .. } => (join.entity, root),
        };
        let nav = owner.navigation(&join.navigation).ok_or_else(|| {
            ConfigurationError::MissingNavigation {
                entity: owner.name.to_string(),
                navigation: join.navigation.clone(),
            }
        })?;
        if nav.cardinality != Cardinality::Reference {
            return Err(TranslationError::WideningJoin {
                navigation: join.navigation.clone(),
            }
            .into());
        }
        if !std::ptr::eq(nav.target(), target) {
            return Err(TranslationError::JoinTargetMismatch {
                entity: owner.name.to_string(),
                navigation: join.navigation.clone(),
                expected: target.name.to_string(),
            }
            .into());
        }

        if let JoinKind::Collection { collection } = &join.kind {
            let slot = root.navigation(collection).ok_or_else(|| {
                ConfigurationError::MissingNavigation {
                    entity: root.name.to_string(),
                    navigation: collection.clone(),
                }
            })?;
            if !slot.is_collection() || !std::ptr::eq(slot.target(), join.entity) {
                return Err(TranslationError::JoinTargetMismatch {
                    entity: root.name.to_string(),
                    navigation: collection.clone(),
                    expected: join.entity.name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Lower a predicate to a condition on `entity`'s columns, optionally
    /// qualified with a table alias.
    pub fn lower(
        &self,
        entity: &'static EntityInfo,
        expression: &Expression,
        qualifier: Option<&str>,
    ) -> Result<Condition> {
        let metadata = self.reader.metadata_for(entity)?;
        let mut condition = Condition::all();
        for term in expression.terms() {
            condition = condition.add(self.lower_term(entity, &metadata, term, qualifier)?);
        }
        Ok(condition)
    }

    fn lower_term(
        &self,
        entity: &'static EntityInfo,
        metadata: &EntityMetadata,
        term: &Expression,
        qualifier: Option<&str>,
    ) -> Result<Expr> {
        let Expression::Equals(left, right) = term else {
            return Err(TranslationError::unsupported(format!("{:?}", term)).into());
        };
        let column = match left.as_ref() {
            Expression::Property { name, .. } => metadata.column(name)?.to_string(),
            Expression::EntityReference { navigation, .. } => {
                self.reader.foreign_key_column(entity, navigation)?
            }
            other => return Err(TranslationError::unsupported(format!("{:?}", other)).into()),
        };
        let Expression::Value(value) = right.as_ref() else {
            return Err(TranslationError::unsupported("member-to-member comparison").into());
        };

        let column = match qualifier {
            Some(alias) => Expr::col((Ident::new(alias), Ident::new(column))),
            None => Expr::col(Ident::new(column)),
        };
        // `= NULL` never matches
        if is_null(value) {
            Ok(column.is_null())
        } else {
            Ok(column.eq(value.clone()))
        }
    }

    /// Insert an entity. A store-generated identity is left out of the column
    /// list and read back through the dialect's identity strategy.
    pub fn insert<E: Entity>(&self, entity: &E) -> Result<InsertCommand> {
        let metadata = self.reader.metadata::<E>()?;
        let generated = metadata.identity_kind == IdentityKind::Generated;
        let skip = generated
            .then(|| metadata.identity.as_ref().map(|id| id.name()))
            .flatten();

        let assignments = self.entity_assignments(entity, &metadata, skip, Unloaded::Null)?;
        let (columns, values): (Vec<_>, Vec<_>) = assignments.into_iter().unzip();

        let mut insert = InsertStatement::default();
        insert
            .into_table(Ident::new(&metadata.table))
            .columns(columns.into_iter().map(Ident::new));
        if values.is_empty() {
            insert.or_default_values();
        } else {
            insert.values_panic(values.into_iter().map(Expr::val));
        }

        if !generated {
            return Ok(InsertCommand::Plain(self.log(self.dialect.build_insert(&insert))));
        }

        let identity = metadata.identity()?;
        let command = match self.dialect.identity_strategy() {
            IdentityStrategy::Returning => {
                insert.returning_col(Ident::new(&identity.column));
                ScalarCommand::new(Vec::new(), self.log(self.dialect.build_insert(&insert)))
            }
            IdentityStrategy::FollowUp(sql) => ScalarCommand::new(
                vec![self.log(self.dialect.build_insert(&insert))],
                GeneratedCommand::new(sql, Vec::new()),
            ),
        };
        Ok(InsertCommand::Identity(command))
    }

    /// `UPDATE <table> SET <assignments> [WHERE <predicate>]`, where each
    /// assignment names a property and its value must fit the declared type.
    pub fn update(
        &self,
        entity: &'static EntityInfo,
        assignments: &[(String, Value)],
        predicate: Option<&Expression>,
    ) -> Result<GeneratedCommand> {
        let metadata = self.reader.metadata_for(entity)?;
        let mut columns = Vec::with_capacity(assignments.len());
        for (property, value) in assignments {
            let mapping = metadata.require_property(property)?;
            let field_type = mapping.property.field_type;
            if !is_null(value) && !field_type.accepts(value) {
                return Err(TranslationError::TypeMismatch {
                    property: property.clone(),
                    expected: field_type.to_string(),
                    value: describe(value),
                }
                .into());
            }
            columns.push((mapping.column.clone(), value.clone()));
        }
        self.update_columns(&metadata, &columns, predicate)
    }

    /// Write every mapped property of `entity` to the row with its identity.
    /// A to-one foreign key is written only when its navigation is loaded.
    pub fn update_by_identity<E: Entity>(&self, entity: &E) -> Result<GeneratedCommand> {
        let metadata = self.reader.metadata::<E>()?;
        let identity = metadata.identity()?;
        let columns = self.entity_assignments(entity, &metadata, Some(identity.name()), Unloaded::Skip)?;
        self.update_columns(&metadata, &columns, Some(&self.identity_predicate(entity)?))
    }

    /// Assignments here are already resolved to column names.
    fn update_columns(
        &self,
        metadata: &EntityMetadata,
        columns: &[(String, Value)],
        predicate: Option<&Expression>,
    ) -> Result<GeneratedCommand> {
        if columns.is_empty() {
            return Err(TranslationError::NoAssignments {
                entity: metadata.name().to_string(),
            }
            .into());
        }

        let mut update = UpdateStatement::default();
        update.table(Ident::new(&metadata.table));
        for (column, value) in columns {
            update.value(Ident::new(column), Expr::val(value.clone()));
        }
        if let Some(predicate) = predicate {
            update.cond_where(self.lower(metadata.info, predicate, None)?);
        }
        Ok(self.log(self.dialect.build_update(&update)))
    }

    /// `DELETE FROM <table> [WHERE <predicate>]`
    pub fn delete(&self, entity: &'static EntityInfo, predicate: Option<&Expression>) -> Result<GeneratedCommand> {
        let metadata = self.reader.metadata_for(entity)?;
        let mut delete = DeleteStatement::default();
        delete.from_table(Ident::new(&metadata.table));
        if let Some(predicate) = predicate {
            delete.cond_where(self.lower(entity, predicate, None)?);
        }
        Ok(self.log(self.dialect.build_delete(&delete)))
    }

    pub fn delete_by_identity<E: Entity>(&self, entity: &E) -> Result<GeneratedCommand> {
        self.delete(E::info(), Some(&self.identity_predicate(entity)?))
    }

    /// `Id = <value>` for the entity's current identity.
    pub fn identity_predicate<E: Entity>(&self, entity: &E) -> Result<Expression> {
        let metadata = self.reader.metadata::<E>()?;
        let identity = metadata.identity()?;
        Ok(Expression::equals(
            Expression::Property {
                name: identity.name().to_string(),
                declared_type: identity.property.field_type,
            },
            Expression::Value(self.reader.identity_value(entity)?),
        ))
    }

    /// Column/value pairs for every mapped property except `skip`, followed by
    /// the foreign keys of to-one navigations not already mapped as properties.
    fn entity_assignments<E: Entity>(
        &self,
        entity: &E,
        metadata: &EntityMetadata,
        skip: Option<&str>,
        unloaded: Unloaded,
    ) -> Result<Vec<(String, Value)>> {
        let mut assignments = Vec::with_capacity(metadata.properties.len());
        for property in &metadata.properties {
            if Some(property.name()) == skip {
                continue;
            }
            let value = entity
                .get(property.name())
                .unwrap_or_else(|| property.property.field_type.null_value());
            assignments.push((property.column.clone(), value));
        }

        for nav in metadata.info.navigations {
            if nav.cardinality != Cardinality::Reference {
                continue;
            }
            let column = self.reader.foreign_key_column(metadata.info, nav.name)?;
            if metadata.properties.iter().any(|p| p.column == column) {
                continue;
            }
            let target_identity = self.reader.identity_property(nav.target())?;
            match (entity.reference_key(nav.name, target_identity.name()), unloaded) {
                (Some(value), _) => assignments.push((column, value)),
                (None, Unloaded::Null) => {
                    assignments.push((column, target_identity.property.field_type.null_value()))
                }
                (None, Unloaded::Skip) => {}
            }
        }
        Ok(assignments)
    }

    fn log(&self, command: GeneratedCommand) -> GeneratedCommand {
        log::debug!(
            "[{}] {} ({} parameters)",
            self.dialect.name(),
            command.sql,
            command.values.len()
        );
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::{Convention, SnakeCaseConvention};
    use crate::error::QuarryError;
    use crate::sql::Postgres;
    use crate::tests_cfg::{Blog, Post, Tag};

    fn generator(reader: ConventionReader) -> SqlGenerator {
        SqlGenerator::new(Arc::new(Postgres), Arc::new(reader))
    }

    fn post(blog: Option<Blog>) -> Post {
        Post {
            id: 1,
            title: "t".to_string(),
            body: None,
            blog,
        }
    }

    #[test]
    fn test_generate_select_query() {
        let generator = generator(ConventionReader::default());
        let all = generator.generate_select_query("table", &[]);
        assert_eq!(all.sql, r#"SELECT * FROM "table""#);
        assert!(all.values.is_empty());

        let filtered = generator.generate_select_query("table", &[("Col", Value::Int(Some(7)))]);
        assert_eq!(filtered.sql, r#"SELECT * FROM "table" WHERE "Col" = $1"#);
        assert_eq!(filtered.values, vec![Value::Int(Some(7))]);
    }

    #[test]
    fn test_update_by_identity_writes_loaded_reference() {
        let generator = generator(ConventionReader::default());
        let blog = Blog {
            id: 2,
            ..Default::default()
        };
        let command = generator.update_by_identity(&post(Some(blog))).unwrap();
        assert_eq!(
            command.sql,
            r#"UPDATE "Post" SET "Title" = $1, "Body" = $2, "BlogId" = $3 WHERE "Id" = $4"#
        );
        assert_eq!(command.values[2], Value::Int(Some(2)));
        assert_eq!(command.values[3], Value::Int(Some(1)));
    }

    #[test]
    fn test_update_by_identity_leaves_unloaded_reference_alone() {
        let generator = generator(ConventionReader::default());
        let command = generator.update_by_identity(&post(None)).unwrap();
        assert_eq!(
            command.sql,
            r#"UPDATE "Post" SET "Title" = $1, "Body" = $2 WHERE "Id" = $3"#
        );

        // Inserts still write the key, as NULL
        let InsertCommand::Identity(insert) = generator.insert(&post(None)).unwrap() else {
            panic!("expected a generated identity");
        };
        assert_eq!(
            insert.result.sql,
            r#"INSERT INTO "Post" ("Title", "Body", "BlogId") VALUES ($1, $2, $3) RETURNING "Id""#
        );
        assert_eq!(insert.result.values[2], Value::Int(None));
    }

    #[test]
    fn test_update_by_identity_uses_convention_columns() {
        let generator = generator(ConventionReader::new(SnakeCaseConvention));
        let blog = Blog {
            id: 1,
            title: "t".to_string(),
            ..Default::default()
        };
        let command = generator.update_by_identity(&blog).unwrap();
        assert_eq!(command.sql, r#"UPDATE "blog" SET "title" = $1 WHERE "id" = $2"#);

        let command = generator
            .update_by_identity(&post(Some(Blog {
                id: 3,
                ..Default::default()
            })))
            .unwrap();
        assert_eq!(
            command.sql,
            r#"UPDATE "post" SET "title" = $1, "body" = $2, "blog_id" = $3 WHERE "id" = $4"#
        );
    }

    #[test]
    fn test_update_resolves_property_names() {
        let generator = generator(ConventionReader::new(SnakeCaseConvention));
        let command = generator
            .update(
                Blog::info(),
                &[("Title".to_string(), Value::from("x".to_string()))],
                None,
            )
            .unwrap();
        assert_eq!(command.sql, r#"UPDATE "blog" SET "title" = $1"#);

        let err = generator
            .update(Blog::info(), &[("title".to_string(), Value::from("x".to_string()))], None)
            .unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Configuration(ConfigurationError::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_empty_page_is_rejected() {
        let generator = generator(ConventionReader::default());
        let mut spec = QuerySpecification::of::<Blog>();
        spec.page = Some((0, 0));
        let err = generator.select(&spec).unwrap_err();
        assert!(matches!(err, QuarryError::Translation(TranslationError::EmptyPage)));
    }

    #[test]
    fn test_second_collection_join_is_rejected() {
        let generator = generator(ConventionReader::default());
        let mut spec = QuerySpecification::of::<Blog>();
        spec.joins = vec![JoinDescriptor::collection("Blog", "Posts", "Blog", Post::info()); 2];
        let err = generator.select(&spec).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Translation(TranslationError::MultipleCollectionJoins)
        ));
    }

    #[test]
    fn test_join_to_the_wrong_entity_is_rejected() {
        let generator = generator(ConventionReader::default());
        let mut spec = QuerySpecification::of::<Post>();
        spec.joins = vec![JoinDescriptor::reference("Blog", "Post", Tag::info())];
        let err = generator.select(&spec).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Translation(TranslationError::JoinTargetMismatch { ref expected, .. })
                if expected == "Tag"
        ));
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let generator = generator(ConventionReader::default());
        let mut spec = QuerySpecification::of::<Post>();
        spec.joins = vec![JoinDescriptor::reference("Blog", "Post", Blog::info()); 2];
        let err = generator.select(&spec).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Configuration(ConfigurationError::Invalid(ref message))
                if message.contains("`Blog`")
        ));
    }

    #[test]
    fn test_empty_column_name_is_rejected() {
        struct Blank;
        impl Convention for Blank {
            fn column_name(&self, _property: &str) -> String {
                String::new()
            }
        }
        let generator = generator(ConventionReader::new(Blank));
        let err = generator.select(&QuerySpecification::of::<Blog>()).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Configuration(ConfigurationError::EmptyColumnName { .. })
        ));
    }
}
