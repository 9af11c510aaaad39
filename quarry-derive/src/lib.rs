//! Procedural macros for quarry
//!
//! This crate provides the `Entity` derive, which emits the static descriptor
//! table and the name-keyed field access the quarry pipeline runs on.

mod attributes;
mod macros;
mod utils;

use proc_macro::TokenStream;

/// Derive macro for `Entity`
///
/// Every named field becomes a property named after the PascalCase form of
/// the field name, except fields marked as navigations or skipped.
///
/// - `pub` fields are readable and writable, and therefore mapped
/// - private fields are described but not mapped
/// - `#[quarry(read_only)]`: readable only
/// - `#[quarry(skip)]`: not described at all
/// - `#[quarry(name = "...")]`: explicit property name (or entity name on the struct)
/// - `#[quarry(reference)]`: to-one navigation, field type `Option<T>`
/// - `#[quarry(collection)]`: to-many navigation, field type `Vec<T>`
///
/// The struct must implement `Default`.
///
/// ```ignore
/// #[derive(Default, Entity)]
/// pub struct Post {
///     pub id: i32,
///     pub title: String,
///     #[quarry(reference)]
///     pub blog: Option<Blog>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(quarry))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    macros::derive_entity(input)
}
