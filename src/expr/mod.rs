//! Predicates and the expression AST
//!
//! Callers describe filters with the [`predicate`] builder (`prop("Name").eq(..)`).
//! The [`parser`] resolves properties against the entity's metadata, evaluates
//! deferred values, type-checks literals and produces an [`Expression`]: the
//! portable tree the SQL generator lowers.

pub mod ast;
pub mod parser;
pub mod predicate;

pub use ast::Expression;
pub use parser::ExpressionParser;
pub use predicate::{compare, prop, value, CompareOp, Operand, Predicate, PropertyPath};
