//! Fluent query surface
//!
//! [`Query`] accumulates a [`QuerySpecification`] (filter, ordering, paging,
//! joins) and hands it to the SQL generator at its terminal call.
//! [`UpdateBuilder`] and [`DeleteBuilder`] are the set-based write
//! counterparts.

pub mod builder;
pub mod spec;
pub mod write;

pub use builder::Query;
pub use spec::{Direction, JoinDescriptor, JoinKind, QuerySpecification};
pub use write::{DeleteBuilder, UpdateBuilder};
