use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Display)]
#[display("[{id}] {title} ({url})")]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: String,
    pub publish: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostListing {
    pub tag: Option<Tag>,
    pub page: Page<Post>,
    pub total_published: i64,
}

#[derive(Debug, Clone, Deserialize, Display)]
#[display("{name}: {body}")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub name: String,
    pub body: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub similar_posts: Vec<Post>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub post: Post,
    pub rank: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub query: Option<String>,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareRequest {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareResponse {
    pub post: Post,
    pub form: ShareRequest,
    pub sent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub body: String,
    /// `draft` or `published`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PostChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_deserializes_from_server_shape() {
        let json = serde_json::json!({
            "tag": null,
            "page": {
                "items": [{
                    "id": "7f1c1b8e-8d8c-4a55-9a3a-3f7c0b0c1d2e",
                    "author_id": "0b6c3c1e-1111-4a55-9a3a-3f7c0b0c1d2e",
                    "title": "Hello",
                    "slug": "hello",
                    "body": "text",
                    "status": "published",
                    "publish": "2024-06-09T08:00:00Z",
                    "tags": [],
                    "url": "/api/posts/2024/6/9/hello",
                    "created_at": "2024-06-09T08:00:00Z",
                    "updated_at": "2024-06-09T08:00:00Z"
                }],
                "number": 1,
                "num_pages": 1,
                "count": 1,
                "has_next": false,
                "has_previous": false,
                "next_page_number": null,
                "previous_page_number": null
            },
            "total_published": 1
        });
        let listing: PostListing = serde_json::from_value(json).unwrap();
        assert_eq!(listing.page.items.len(), 1);
        assert_eq!(
            listing.page.items[0].to_string(),
            "[7f1c1b8e-8d8c-4a55-9a3a-3f7c0b0c1d2e] Hello (/api/posts/2024/6/9/hello)"
        );
    }

    #[test]
    fn unchanged_fields_are_not_sent() {
        let changes = PostChanges {
            title: Some("New".into()),
            ..PostChanges::default()
        };
        assert_eq!(
            serde_json::to_value(changes).unwrap(),
            serde_json::json!({ "title": "New" })
        );
    }
}
