use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError>;
    /// Comments that passed moderation, oldest first.
    async fn list_active(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Comment>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, name, email, body, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(&comment.name)
        .bind(&comment.email)
        .bind(&comment.body)
        .bind(comment.active)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to create comment: {}", e);
            DomainError::Internal(format!("database error: {}", e))
        })?;

        info!(comment_id = %comment.id, post_id = %comment.post_id, "comment created");
        Ok(comment)
    }

    async fn list_active(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, name, email, body, active, created_at, updated_at
            FROM comments
            WHERE post_id = $1 AND active
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while fetching comments of {}: {}", post_id, e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<Comment>, DomainError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET active = $1, updated_at = $2
            WHERE id = $3
            RETURNING id, post_id, name, email, body, active, created_at, updated_at
            "#,
        )
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to moderate comment {}: {}", id, e);
            DomainError::Internal(e.to_string())
        })?;

        if comment.is_some() {
            info!(comment_id = %id, active, "comment moderated");
        }
        Ok(comment)
    }
}
