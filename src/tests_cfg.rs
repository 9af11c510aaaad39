//! Entities shared by the unit tests.

use uuid::Uuid;

use crate::Entity;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Blog {
    pub id: i32,
    pub title: String,
    #[quarry(collection)]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub body: Option<String>,
    #[quarry(reference)]
    pub blog: Option<Blog>,
}

/// Caller-assigned identity.
#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Tag {
    pub id: Uuid,
    pub label: String,
}

/// No identity property.
#[derive(Debug, Clone, Default, PartialEq, Entity)]
pub struct Note {
    pub text: String,
    pub pinned: bool,
}
