//! Entity descriptor tables
//!
//! The convention reader introspects entities through an `EntityInfo` that
//! `#[derive(Entity)]` emits as a `static`: the entity name, its properties in
//! declaration order, its navigations and an erased materializer used when a
//! related instance must be built without knowing its Rust type.
//!
//! Field access goes through `Entity::get` / `Entity::set`, keyed by property
//! name, so the generator and the mapper never need the concrete type.

use std::any::Any;

use sea_query::Value;

use crate::error::{MapError, Result};
use crate::mapper::{EntityMapper, Row};
use crate::value::FieldType;

/// Erased construction entry point. Returns `Ok(None)` when the row carries a
/// null identity for the requested alias.
pub type Materializer = fn(&EntityMapper<'_>, &Row, Option<&str>) -> Result<Option<Box<dyn Any>>>;

/// One property as declared on the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
    pub readable: bool,
    pub writable: bool,
}

/// Direction of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// To-one: the owning entity stores the foreign key
    Reference,
    /// To-many: the related entity stores the foreign key
    Collection,
}

#[derive(Clone, Copy)]
pub struct NavigationInfo {
    pub name: &'static str,
    pub target: fn() -> &'static EntityInfo,
    pub cardinality: Cardinality,
}

impl NavigationInfo {
    pub fn target(&self) -> &'static EntityInfo {
        (self.target)()
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Collection
    }
}

impl std::fmt::Debug for NavigationInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationInfo")
            .field("name", &self.name)
            .field("target", &self.target().name)
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

/// Static description of an entity type.
pub struct EntityInfo {
    pub name: &'static str,
    pub properties: &'static [PropertyInfo],
    pub navigations: &'static [NavigationInfo],
    pub materialize: Materializer,
}

impl EntityInfo {
    pub fn property(&self, name: &str) -> Option<&'static PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn navigation(&self, name: &str) -> Option<&'static NavigationInfo> {
        self.navigations.iter().find(|n| n.name == name)
    }

    /// Stable key for caches: descriptor tables are statics.
    pub(crate) fn key(&'static self) -> usize {
        self as *const EntityInfo as usize
    }
}

impl std::fmt::Debug for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityInfo")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .field("navigations", &self.navigations)
            .finish()
    }
}

/// A mapped data type.
///
/// Usually derived:
///
/// ```rust
/// use quarry::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// pub struct Blog {
///     pub id: i32,
///     pub title: String,
///     #[quarry(collection)]
///     pub posts: Vec<Post>,
/// }
///
/// #[derive(Debug, Default, Entity)]
/// pub struct Post {
///     pub id: i32,
///     pub body: String,
///     #[quarry(reference)]
///     pub blog: Option<Blog>,
/// }
///
/// assert_eq!(Blog::info().name, "Blog");
/// assert_eq!(Post::info().properties[1].name, "Body");
/// ```
///
/// The `Default` bound is the construction contract: the mapper builds every
/// instance through it before assigning properties.
pub trait Entity: Default + Send + 'static {
    fn info() -> &'static EntityInfo;

    /// Current value of a readable property, `None` for unknown names.
    fn get(&self, property: &str) -> Option<Value>;

    /// Assign a writable property.
    fn set(&mut self, property: &str, value: Value) -> std::result::Result<(), MapError>;

    /// Read `property` of the instance held by a to-one navigation, `None`
    /// when the navigation is unset or unknown.
    fn reference_key(&self, navigation: &str, property: &str) -> Option<Value>;

    /// Store a related instance in a navigation: replaces a reference, appends
    /// to a collection.
    fn attach(&mut self, navigation: &str, related: Box<dyn Any>)
        -> std::result::Result<(), MapError>;
}

/// Field shapes usable as navigations: `Option<T>` for references and
/// `Vec<T>` for collections.
pub trait Navigation {
    type Target: Entity;

    fn attach(&mut self, related: Self::Target);

    fn referenced(&self) -> Option<&Self::Target>;
}

impl<T: Entity> Navigation for Option<T> {
    type Target = T;

    fn attach(&mut self, related: T) {
        *self = Some(related);
    }

    fn referenced(&self) -> Option<&T> {
        self.as_ref()
    }
}

impl<T: Entity> Navigation for Vec<T> {
    type Target = T;

    fn attach(&mut self, related: T) {
        self.push(related);
    }

    fn referenced(&self) -> Option<&T> {
        None
    }
}

/// Downcast a related instance and store it in `slot`.
///
/// Called by derived `Entity::attach` implementations.
pub fn attach_related<N: Navigation>(
    slot: &mut N,
    entity: &str,
    navigation: &str,
    related: Box<dyn Any>,
) -> std::result::Result<(), MapError> {
    let related = related
        .downcast::<N::Target>()
        .map_err(|_| MapError::NavigationMismatch {
            entity: entity.to_string(),
            navigation: navigation.to_string(),
        })?;
    slot.attach(*related);
    Ok(())
}
