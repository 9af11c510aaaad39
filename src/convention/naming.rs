use crate::convention::Convention;
use crate::entity::EntityInfo;

/// Convert `PascalCase` to `snake_case`.
///
/// Runs of capitals stay together (`HTTPStatus` becomes `http_status`).
pub fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && chars[i - 1] != '_' && (prev_lower || (prev_upper && next_lower)) {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// `BlogPost.AuthorId` lives in `blog_post.author_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseConvention;

impl Convention for SnakeCaseConvention {
    fn table_name(&self, entity: &EntityInfo) -> String {
        snake_case(entity.name)
    }

    fn column_name(&self, property: &str) -> String {
        snake_case(property)
    }
}
