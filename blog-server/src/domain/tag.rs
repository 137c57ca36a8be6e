use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::post::slugify;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
        }
    }
}

/// Normalizes user supplied tag names: trims, drops blanks and keeps the first
/// spelling of every slug.
pub fn normalize_tag_names(names: &[String]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for name in names {
        let tag = Tag::new(name);
        if tag.slug.is_empty() || tags.iter().any(|t| t.slug == tag.slug) {
            continue;
        }
        tags.push(tag);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_slug_follows_name() {
        let tag = Tag::new("  Rust Tips ");
        assert_eq!(tag.name, "Rust Tips");
        assert_eq!(tag.slug, "rust-tips");
    }

    #[test]
    fn duplicate_and_blank_tags_are_dropped() {
        let names = vec![
            "Django".to_string(),
            "django".to_string(),
            "   ".to_string(),
            "Web Dev".to_string(),
        ];
        let tags = normalize_tag_names(&names);
        let slugs: Vec<_> = tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["django", "web-dev"]);
        assert_eq!(tags[0].name, "Django");
    }
}
