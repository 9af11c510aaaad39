use crate::entity::{Entity, EntityInfo};
use crate::expr::Expression;

/// Sort direction of an ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKind {
    /// The root's own to-one navigation, populated as a nested instance
    Reference,
    /// A child entity whose to-one navigation points back at the root;
    /// children are appended to the root's `collection`
    Collection { collection: String },
}

/// One join of a select.
///
/// `navigation` is always a to-one navigation: on the root for a reference
/// join, on the joined child for a collection join. Aliases are entity names;
/// they qualify table references in SQL and prefix result column aliases.
#[derive(Debug, Clone)]
pub struct JoinDescriptor {
    pub navigation: String,
    pub parent_alias: String,
    pub child_alias: String,
    /// The joined entity
    pub entity: &'static EntityInfo,
    pub kind: JoinKind,
}

impl JoinDescriptor {
    pub fn reference(
        navigation: impl Into<String>,
        parent_alias: impl Into<String>,
        entity: &'static EntityInfo,
    ) -> Self {
        Self {
            navigation: navigation.into(),
            parent_alias: parent_alias.into(),
            child_alias: entity.name.to_string(),
            entity,
            kind: JoinKind::Reference,
        }
    }

    pub fn collection(
        navigation: impl Into<String>,
        collection: impl Into<String>,
        parent_alias: impl Into<String>,
        entity: &'static EntityInfo,
    ) -> Self {
        Self {
            navigation: navigation.into(),
            parent_alias: parent_alias.into(),
            child_alias: entity.name.to_string(),
            entity,
            kind: JoinKind::Collection {
                collection: collection.into(),
            },
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, JoinKind::Collection { .. })
    }
}

/// Everything a select needs, accumulated by [`Query`](crate::query::Query).
#[derive(Debug, Clone)]
pub struct QuerySpecification {
    pub entity: &'static EntityInfo,
    /// Single-property projection
    pub projection: Option<String>,
    pub predicate: Option<Expression>,
    pub ordering: Vec<(String, Direction)>,
    pub top: Option<u64>,
    /// Zero-based `(index, size)`
    pub page: Option<(u64, u64)>,
    pub joins: Vec<JoinDescriptor>,
}

impl QuerySpecification {
    pub fn new(entity: &'static EntityInfo) -> Self {
        Self {
            entity,
            projection: None,
            predicate: None,
            ordering: Vec::new(),
            top: None,
            page: None,
            joins: Vec::new(),
        }
    }

    pub fn of<E: Entity>() -> Self {
        Self::new(E::info())
    }

    /// Install a filter, conjoined with any filter already present.
    pub fn add_predicate(&mut self, expression: Expression) {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Expression::and([existing, expression]),
            None => expression,
        });
    }

    pub fn collection_join(&self) -> Option<&JoinDescriptor> {
        self.joins.iter().find(|j| j.is_collection())
    }
}
