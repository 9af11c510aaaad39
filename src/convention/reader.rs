//! Convention reader and per-entity metadata cache

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use sea_query::Value;

use crate::convention::{Convention, DefaultConvention};
use crate::entity::{Entity, EntityInfo, PropertyInfo};
use crate::error::{ConfigurationError, Result};
use crate::value::describe;

/// How an entity's identity gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// Assigned by the store on insert
    Generated,
    /// Supplied by the caller
    Natural,
    /// The entity has no identity property
    None,
}

/// A mapped property and the column it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMapping {
    pub property: &'static PropertyInfo,
    pub column: String,
}

impl PropertyMapping {
    pub fn name(&self) -> &'static str {
        self.property.name
    }
}

/// Convention applied to one entity.
#[derive(Debug)]
pub struct EntityMetadata {
    pub info: &'static EntityInfo,
    pub table: String,
    /// Mapped properties in declaration order.
    pub properties: Vec<PropertyMapping>,
    pub identity: Option<PropertyMapping>,
    pub identity_kind: IdentityKind,
}

impl EntityMetadata {
    pub fn name(&self) -> &'static str {
        self.info.name
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMapping> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn require_property(&self, name: &str) -> Result<&PropertyMapping> {
        self.property(name).ok_or_else(|| {
            ConfigurationError::MissingProperty {
                entity: self.name().to_string(),
                property: name.to_string(),
            }
            .into()
        })
    }

    pub fn identity(&self) -> Result<&PropertyMapping> {
        self.identity.as_ref().ok_or_else(|| {
            ConfigurationError::MissingIdentity {
                entity: self.name().to_string(),
            }
            .into()
        })
    }

    pub fn column(&self, property: &str) -> Result<&str> {
        self.require_property(property).map(|p| p.column.as_str())
    }
}

/// Comparable, hashable rendering of an identity value.
///
/// Integer widths collapse (`Int(5)` and `BigInt(5)` give the same key), so
/// keys built from parameters and from rows agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn from_value(value: &Value) -> Self {
        IdentityKey(describe(value))
    }

    pub fn is_null(&self) -> bool {
        self.0 == "NULL"
    }
}

/// Applies conventions to entity descriptor tables.
///
/// The reader is shared for the life of the process. Metadata is computed
/// once per entity and the cache only ever grows.
///
/// ```rust
/// use quarry::{ConventionReader, DefaultConvention, SnakeCaseConvention};
/// # use quarry::Entity;
/// # #[derive(Default, Entity)]
/// # pub struct Audit { pub id: i32, pub created_by: String }
///
/// let reader = ConventionReader::new(DefaultConvention)
///     .with_override::<Audit>(SnakeCaseConvention);
/// let audit = reader.metadata::<Audit>().unwrap();
/// assert_eq!(audit.table, "audit");
/// assert_eq!(audit.column("CreatedBy").unwrap(), "created_by");
/// ```
pub struct ConventionReader {
    default: Arc<dyn Convention>,
    overrides: HashMap<usize, Arc<dyn Convention>>,
    cache: RwLock<HashMap<usize, Arc<EntityMetadata>>>,
}

impl Default for ConventionReader {
    fn default() -> Self {
        Self::new(DefaultConvention)
    }
}

impl std::fmt::Debug for ConventionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConventionReader")
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

impl ConventionReader {
    pub fn new(default: impl Convention + 'static) -> Self {
        Self::with_convention(Arc::new(default))
    }

    pub fn with_convention(default: Arc<dyn Convention>) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Use `convention` instead of the default for every command about `E`.
    pub fn with_override<E: Entity>(mut self, convention: impl Convention + 'static) -> Self {
        let info = E::info();
        self.overrides.insert(info.key(), Arc::new(convention));
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(&info.key());
        }
        self
    }

    pub fn convention_for(&self, info: &'static EntityInfo) -> &dyn Convention {
        &**self.overrides.get(&info.key()).unwrap_or(&self.default)
    }

    pub fn metadata<E: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        self.metadata_for(E::info())
    }

    pub fn metadata_for(&self, info: &'static EntityInfo) -> Result<Arc<EntityMetadata>> {
        let key = info.key();
        if let Some(found) = self.cache.read().ok().and_then(|c| c.get(&key).cloned()) {
            return Ok(found);
        }

        let built = Arc::new(self.build_metadata(info)?);
        match self.cache.write() {
            Ok(mut cache) => Ok(cache.entry(key).or_insert(built).clone()),
            // A poisoned cache only costs recomputation
            Err(_) => Ok(built),
        }
    }

    fn build_metadata(&self, info: &'static EntityInfo) -> Result<EntityMetadata> {
        let convention = self.convention_for(info);

        let table = convention.table_name(info);
        if table.is_empty() {
            return Err(ConfigurationError::EmptyTableName {
                entity: info.name.to_string(),
            }
            .into());
        }

        let mut properties = Vec::with_capacity(info.properties.len());
        for property in info.properties {
            if !convention.should_map_property(property) {
                continue;
            }
            let column = convention.column_name(property.name);
            if column.is_empty() {
                return Err(ConfigurationError::EmptyColumnName {
                    entity: info.name.to_string(),
                    property: property.name.to_string(),
                }
                .into());
            }
            properties.push(PropertyMapping { property, column });
        }

        let identity = properties
            .iter()
            .find(|p| convention.is_id_property(p.name()))
            .cloned();
        let identity_kind = match &identity {
            None => IdentityKind::None,
            Some(id) if convention.has_identity_id(info, Some(id.property)) => {
                IdentityKind::Generated
            }
            Some(_) => IdentityKind::Natural,
        };

        log::debug!(
            "entity {} maps to table {} ({} columns, identity {:?})",
            info.name,
            table,
            properties.len(),
            identity_kind
        );

        Ok(EntityMetadata {
            info,
            table,
            properties,
            identity,
            identity_kind,
        })
    }

    /// The identity property of an entity, or `MissingIdentity`.
    pub fn identity_property(&self, info: &'static EntityInfo) -> Result<PropertyMapping> {
        self.metadata_for(info)?.identity().cloned()
    }

    pub fn identity_value<E: Entity>(&self, entity: &E) -> Result<Value> {
        let metadata = self.metadata::<E>()?;
        let identity = metadata.identity()?;
        Ok(entity
            .get(identity.name())
            .unwrap_or_else(|| identity.property.field_type.null_value()))
    }

    pub fn identity_key<E: Entity>(&self, entity: &E) -> Result<IdentityKey> {
        self.identity_value(entity)
            .map(|value| IdentityKey::from_value(&value))
    }

    /// Two instances are equal iff their identity values are equal. Other
    /// properties are ignored.
    pub fn identity_eq<E: Entity>(&self, a: &E, b: &E) -> Result<bool> {
        Ok(self.identity_key(a)? == self.identity_key(b)?)
    }

    /// Hash consistent with `identity_eq`.
    pub fn identity_hash<E: Entity>(&self, entity: &E) -> Result<u64> {
        let mut hasher = DefaultHasher::new();
        self.identity_key(entity)?.hash(&mut hasher);
        Ok(hasher.finish())
    }

    /// Column on `info`'s table holding the foreign key for a to-one
    /// navigation: the navigation name joined with the target's identity
    /// property (`Blog` + `Id` is `BlogId`), then named by `info`'s convention.
    pub fn foreign_key_column(&self, info: &'static EntityInfo, navigation: &str) -> Result<String> {
        let nav = info
            .navigation(navigation)
            .ok_or_else(|| ConfigurationError::MissingNavigation {
                entity: info.name.to_string(),
                navigation: navigation.to_string(),
            })?;
        let target_identity = self.identity_property(nav.target())?;
        let column = self
            .convention_for(info)
            .column_name(&format!("{}{}", nav.name, target_identity.name()));
        if column.is_empty() {
            return Err(ConfigurationError::EmptyColumnName {
                entity: info.name.to_string(),
                property: navigation.to_string(),
            }
            .into());
        }
        Ok(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::SnakeCaseConvention;
    use crate::error::QuarryError;
    use crate::tests_cfg::{Blog, Note, Post, Tag};

    #[test]
    fn test_metadata_default_convention() {
        let reader = ConventionReader::default();
        let post = reader.metadata::<Post>().unwrap();
        assert_eq!(post.table, "Post");
        let columns: Vec<_> = post.properties.iter().map(|p| p.column.as_str()).collect();
        assert_eq!(columns, vec!["Id", "Title", "Body"]);
        assert_eq!(post.identity().unwrap().name(), "Id");
        assert_eq!(post.identity_kind, IdentityKind::Generated);
    }

    #[test]
    fn test_identity_kinds() {
        let reader = ConventionReader::default();
        assert_eq!(reader.metadata::<Tag>().unwrap().identity_kind, IdentityKind::Natural);
        assert_eq!(reader.metadata::<Note>().unwrap().identity_kind, IdentityKind::None);

        let err = reader.identity_property(Note::info()).unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Configuration(ConfigurationError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn test_metadata_is_cached() {
        let reader = ConventionReader::default();
        let a = reader.metadata::<Blog>().unwrap();
        let b = reader.metadata::<Blog>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_override_applies_only_to_its_entity() {
        let reader = ConventionReader::default().with_override::<Post>(SnakeCaseConvention);
        assert_eq!(reader.metadata::<Post>().unwrap().table, "post");
        assert_eq!(reader.metadata::<Blog>().unwrap().table, "Blog");
        assert_eq!(reader.foreign_key_column(Post::info(), "Blog").unwrap(), "blog_id");
    }

    #[test]
    fn test_foreign_key_column() {
        let reader = ConventionReader::default();
        assert_eq!(reader.foreign_key_column(Post::info(), "Blog").unwrap(), "BlogId");
        let err = reader.foreign_key_column(Post::info(), "Author").unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Configuration(ConfigurationError::MissingNavigation { .. })
        ));
    }

    #[test]
    fn test_empty_names_are_rejected() {
        struct Blank;
        impl Convention for Blank {
            fn table_name(&self, _entity: &EntityInfo) -> String {
                String::new()
            }
        }
        let reader = ConventionReader::new(Blank);
        let err = reader.metadata::<Blog>().unwrap_err();
        assert!(matches!(
            err,
            QuarryError::Configuration(ConfigurationError::EmptyTableName { .. })
        ));
    }

    #[test]
    fn test_identity_equality_ignores_other_properties() {
        let reader = ConventionReader::default();
        let a = Post {
            id: 4,
            title: "first".into(),
            ..Default::default()
        };
        let b = Post {
            id: 4,
            title: "second".into(),
            body: Some("x".into()),
            ..Default::default()
        };
        let c = Post {
            id: 5,
            title: "first".into(),
            ..Default::default()
        };
        assert!(reader.identity_eq(&a, &b).unwrap());
        assert!(!reader.identity_eq(&a, &c).unwrap());
        assert_eq!(reader.identity_hash(&a).unwrap(), reader.identity_hash(&b).unwrap());
    }

    #[test]
    fn test_identity_key_collapses_integer_widths() {
        assert_eq!(
            IdentityKey::from_value(&Value::Int(Some(5))),
            IdentityKey::from_value(&Value::BigInt(Some(5)))
        );
        assert!(IdentityKey::from_value(&Value::Int(None)).is_null());
    }
}
