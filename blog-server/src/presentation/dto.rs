use crate::domain::comment::Comment;
use crate::domain::forms::ShareForm;
use crate::domain::pagination::Page;
use crate::domain::post::{Post, PostStatus};
use crate::domain::ranking::SearchHit;
use crate::domain::tag::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 150, message = "username must be between 3 and 150 characters"))]
    pub username: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(rename = "token_type")]
    pub token_type: String, // "Bearer"
}

// ======================= POSTS =======================

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    #[validate(length(max = 255, message = "slug must be at most 255 characters"))]
    pub slug: Option<String>,
    #[validate(length(min = 1, message = "body must not be empty"))]
    pub body: String,
    #[serde(default)]
    pub status: PostStatus,
    pub publish: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "slug must be between 1 and 255 characters"))]
    pub slug: Option<String>,
    #[validate(length(min = 1, message = "body must not be empty"))]
    pub body: Option<String>,
    pub status: Option<PostStatus>,
    pub publish: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestPostsQuery {
    pub count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModerateCommentRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: PostStatus,
    pub publish: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            url: post.canonical_path(),
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            slug: post.slug,
            body: post.body,
            status: post.status,
            publish: post.publish,
            tags: post.tags,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListPostsResponse {
    pub tag: Option<Tag>,
    pub page: Page<PostResponse>,
    pub total_published: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub name: String,
    pub body: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            name: comment.name,
            body: comment.body,
            active: comment.active,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
    pub similar_posts: Vec<PostResponse>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultResponse {
    pub post: PostResponse,
    pub rank: f32,
}

impl From<SearchHit> for SearchResultResponse {
    fn from(hit: SearchHit) -> Self {
        Self {
            post: hit.post.into(),
            rank: hit.rank,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: Option<String>,
    pub results: Vec<SearchResultResponse>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub post: PostResponse,
    pub form: ShareForm,
    pub sent: bool,
}
