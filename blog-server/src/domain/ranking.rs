//! Read-only rankings over materialized posts: related posts by shared tags
//! and weighted title/body search relevance.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::post::Post;

pub const SIMILAR_POSTS_LIMIT: usize = 4;

pub const SEARCH_THRESHOLD: f32 = 0.3;
const TITLE_WEIGHT: f32 = 1.0;
const BODY_WEIGHT: f32 = 0.4;

/// Other published posts sharing at least one tag with `post`, most shared
/// tags first, newest first among equals.
pub fn rank_similar(post: &Post, candidates: Vec<Post>, limit: usize) -> Vec<Post> {
    if post.tags.is_empty() {
        return Vec::new();
    }
    let tag_ids: HashSet<Uuid> = post.tags.iter().map(|t| t.id).collect();

    let mut scored: Vec<(usize, Post)> = candidates
        .into_iter()
        .filter(|c| c.id != post.id && c.is_published())
        .map(|c| {
            let shared = c.tags.iter().filter(|t| tag_ids.contains(&t.id)).count();
            (shared, c)
        })
        .filter(|(shared, _)| *shared > 0)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| b.publish.cmp(&a.publish))
            .then_with(|| b.id.cmp(&a.id))
    });
    scored.truncate(limit);
    scored.into_iter().map(|(_, p)| p).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub post: Post,
    pub rank: f32,
}

/// Lowercase alphanumeric words of `text`.
pub fn search_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `to_tsquery` text matching any word that starts with any term of `query`,
/// e.g. `prog:* | tips:*`. Every term is alphanumeric, so no operator can leak
/// in from user input. A candidate the ranking could score is never filtered.
pub fn prefix_tsquery(query: &str) -> Option<String> {
    let terms = search_terms(query);
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("{t}:*"))
            .collect::<Vec<_>>()
            .join(" | "),
    )
}

fn coverage(query: &[String], field: &str) -> f32 {
    let words = search_terms(field);
    let matched = query
        .iter()
        .filter(|term| words.iter().any(|w| w.starts_with(term.as_str())))
        .count();
    matched as f32 / query.len() as f32
}

pub fn relevance(query: &[String], post: &Post) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    TITLE_WEIGHT * coverage(query, &post.title) + BODY_WEIGHT * coverage(query, &post.body)
}

/// Scores published candidates against `query`, drops everything under the
/// threshold and orders by rank, newest first among equals.
pub fn rank_search(query: &str, candidates: Vec<Post>) -> Vec<SearchHit> {
    let terms = search_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter(Post::is_published)
        .map(|post| SearchHit {
            rank: relevance(&terms, &post),
            post,
        })
        .filter(|hit| hit.rank >= SEARCH_THRESHOLD)
        .collect();

    hits.sort_by(|a, b| {
        b.rank
            .partial_cmp(&a.rank)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.post.publish.cmp(&a.post.publish))
    });
    hits
}
