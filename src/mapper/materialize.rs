use std::any::Any;
use std::collections::HashMap;

use crate::convention::{ConventionReader, IdentityKey};
use crate::entity::Entity;
use crate::error::{MapError, Result};
use crate::mapper::{ColumnValue, Row};
use crate::query::{JoinDescriptor, JoinKind};
use crate::value::{is_null, TryGetable};

/// Builds entities from result rows.
///
/// Rows from a non-joined select carry bare column names. Rows from a joined
/// select carry `"<Entity> <Column>"` aliases for every entity in the join,
/// which is how values are routed to the root, to included references and to
/// collection children.
pub struct EntityMapper<'a> {
    reader: &'a ConventionReader,
}

impl<'a> EntityMapper<'a> {
    pub fn new(reader: &'a ConventionReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &ConventionReader {
        self.reader
    }

    /// Construct `E` through `Default` and assign every mapped property from
    /// `row`. With an alias, columns are looked up as `"<alias> <Column>"`.
    pub fn materialize<E: Entity>(&self, row: &Row, alias: Option<&str>) -> Result<E> {
        let metadata = self.reader.metadata::<E>()?;
        if let Some(alias) = alias {
            if !row.has_alias(alias) {
                return Err(MapError::UnresolvableAlias {
                    entity: metadata.name().to_string(),
                    alias: alias.to_string(),
                }
                .into());
            }
        }

        let mut entity = E::default();
        for property in &metadata.properties {
            let key = ColumnValue::alias(alias, &property.column);
            let value = row.get(&key).ok_or_else(|| MapError::MissingProperty {
                entity: metadata.name().to_string(),
                property: key.clone(),
            })?;
            entity.set(property.name(), value.clone())?;
        }
        Ok(entity)
    }

    /// Materialize a result set, honouring the joins that produced it.
    ///
    /// Reference joins populate the nested instance from the same row, left
    /// unset when its identity is NULL. A collection join groups rows by the
    /// root identity: each root is built once, in first-seen order, and every
    /// row contributes its child unless the child identity is NULL.
    pub fn materialize_list<E: Entity>(&self, rows: &[Row], joins: &[JoinDescriptor]) -> Result<Vec<E>> {
        if joins.is_empty() {
            return rows.iter().map(|row| self.materialize::<E>(row, None)).collect();
        }

        let root_alias = E::info().name;
        let collection = joins
            .iter()
            .find(|join| matches!(join.kind, JoinKind::Collection { .. }));

        let Some(collection) = collection else {
            return rows
                .iter()
                .map(|row| self.materialize_root::<E>(row, root_alias, joins))
                .collect();
        };

        let identity = self.reader.metadata::<E>()?.identity()?.column.clone();
        let identity_alias = ColumnValue::alias(Some(root_alias), &identity);

        let mut roots: Vec<E> = Vec::new();
        let mut seen: HashMap<IdentityKey, usize> = HashMap::new();
        for row in rows {
            let id = row.get(&identity_alias).ok_or_else(|| MapError::MissingProperty {
                entity: root_alias.to_string(),
                property: identity_alias.clone(),
            })?;
            let key = IdentityKey::from_value(id);
            let index = match seen.get(&key) {
                Some(&index) => index,
                None => {
                    roots.push(self.materialize_root::<E>(row, root_alias, joins)?);
                    seen.insert(key, roots.len() - 1);
                    roots.len() - 1
                }
            };

            if let JoinKind::Collection { collection: property } = &collection.kind {
                if let Some(child) = (collection.entity.materialize)(self, row, Some(&collection.child_alias))? {
                    roots[index].attach(property, child)?;
                }
            }
        }
        Ok(roots)
    }

    fn materialize_root<E: Entity>(&self, row: &Row, alias: &str, joins: &[JoinDescriptor]) -> Result<E> {
        let mut root = self.materialize::<E>(row, Some(alias))?;
        for join in joins {
            if join.kind != JoinKind::Reference {
                continue;
            }
            if let Some(nested) = (join.entity.materialize)(self, row, Some(&join.child_alias))? {
                root.attach(&join.navigation, nested)?;
            }
        }
        Ok(root)
    }

    /// Convert the first column of a projection row.
    pub fn scalar<T: TryGetable>(&self, row: &Row) -> Result<T> {
        let (column, value) = row.first().ok_or_else(|| MapError::UnresolvableAlias {
            entity: std::any::type_name::<T>().to_string(),
            alias: "<first column>".to_string(),
        })?;
        T::try_get(value.clone()).map_err(|source| {
            MapError::Conversion {
                entity: std::any::type_name::<T>().to_string(),
                property: column.clone(),
                value: value.clone(),
                source,
            }
            .into()
        })
    }
}

/// Erased entry point stored in every `EntityInfo`.
///
/// Returns `Ok(None)` when the aliased identity column is NULL, the shape a
/// left join produces for a missing related row.
pub fn materialize_erased<E: Entity>(
    mapper: &EntityMapper<'_>,
    row: &Row,
    alias: Option<&str>,
) -> Result<Option<Box<dyn Any>>> {
    let metadata = mapper.reader().metadata::<E>()?;
    if let Some(identity) = &metadata.identity {
        let key = ColumnValue::alias(alias, &identity.column);
        if row.get(&key).map_or(false, is_null) {
            return Ok(None);
        }
    }
    Ok(Some(Box::new(mapper.materialize::<E>(row, alias)?)))
}
