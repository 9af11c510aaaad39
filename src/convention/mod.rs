//! Naming and identity policy
//!
//! A `Convention` answers four questions about an entity: what its table is
//! called, what each column is called, which property is the identity and
//! which properties are mapped at all. Every method has a default, so custom
//! conventions override only what differs.
//!
//! The `ConventionReader` applies a default convention, or a per-entity
//! override, to an entity's descriptor table and caches the result.

mod naming;
mod reader;

pub use naming::{snake_case, SnakeCaseConvention};
pub use reader::{ConventionReader, EntityMetadata, IdentityKey, IdentityKind, PropertyMapping};

use crate::entity::{EntityInfo, PropertyInfo};

/// Naming and identity policy. Implementations must be deterministic: the same
/// input yields the same answer for the life of the process.
pub trait Convention: Send + Sync {
    fn table_name(&self, entity: &EntityInfo) -> String {
        entity.name.to_string()
    }

    fn column_name(&self, property: &str) -> String {
        property.to_string()
    }

    fn is_id_property(&self, property: &str) -> bool {
        property == "Id"
    }

    /// Only properties that can be both read and written are mapped.
    fn should_map_property(&self, property: &PropertyInfo) -> bool {
        property.readable && property.writable
    }

    /// Whether the store generates the identity value on insert.
    fn has_identity_id(&self, _entity: &EntityInfo, identity: Option<&PropertyInfo>) -> bool {
        identity.map_or(false, |p| p.field_type.is_integer())
    }
}

/// Names tables and columns exactly as the entity and its properties are named.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConvention;

impl Convention for DefaultConvention {}
