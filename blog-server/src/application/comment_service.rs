use std::sync::Arc;

use crate::data::comment_repository::CommentRepository;
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::forms::CommentForm;
use crate::domain::post::Post;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct CommentService<R: CommentRepository + 'static> {
    repo: Arc<R>,
}

impl<R> CommentService<R>
where
    R: CommentRepository + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Validates the submission and stores it as an active comment on `post`.
    #[instrument(skip(self, post, form), fields(post_id = %post.id))]
    pub async fn submit(&self, post: &Post, form: CommentForm) -> Result<Comment, DomainError> {
        if !post.is_published() {
            return Err(DomainError::PostNotFound(post.id.to_string()));
        }
        let form = form.clean()?;
        self.repo.create(Comment::new(post.id, form)).await
    }

    pub async fn active_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, DomainError> {
        self.repo.list_active(post_id).await
    }

    #[instrument(skip(self))]
    pub async fn moderate(
        &self,
        is_staff: bool,
        comment_id: Uuid,
        active: bool,
    ) -> Result<Comment, DomainError> {
        if !is_staff {
            return Err(DomainError::Forbidden);
        }
        let comment = self
            .repo
            .set_active(comment_id, active)
            .await?
            .ok_or(DomainError::CommentNotFound(comment_id))?;
        info!(comment_id = %comment.id, active, "moderation applied");
        Ok(comment)
    }
}
