use crate::application::comment_service::CommentService;
use crate::application::post_service::PostService;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::error::DomainError;
use crate::domain::forms::CommentForm;
use crate::presentation::dto::{CommentResponse, ModerateCommentRequest};
use crate::presentation::utils::{AuthenticatedUser, request_id};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;
use uuid::Uuid;

/// Only routed for POST; other methods are answered with 405 by the resource.
pub async fn post_comment<P, C>(
    req: HttpRequest,
    posts: web::Data<PostService<P>>,
    comments: web::Data<CommentService<C>>,
    path: web::Path<Uuid>,
    payload: web::Json<CommentForm>,
) -> Result<HttpResponse, DomainError>
where
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    let post = posts.get_published_by_id(path.into_inner()).await?;
    let comment = comments.submit(&post, payload.into_inner()).await?;

    info!(
        request_id = %request_id(&req),
        post_id = %post.id,
        comment_id = %comment.id,
        "comment submitted"
    );

    Ok(HttpResponse::Created().json(CommentResponse::from(comment)))
}

pub async fn moderate_comment<C: CommentRepository + 'static>(
    req: HttpRequest,
    user: AuthenticatedUser,
    comments: web::Data<CommentService<C>>,
    path: web::Path<Uuid>,
    payload: web::Json<ModerateCommentRequest>,
) -> Result<HttpResponse, DomainError> {
    let comment = comments
        .moderate(user.is_staff, path.into_inner(), payload.active)
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        comment_id = %comment.id,
        active = comment.active,
        "comment moderated"
    );

    Ok(HttpResponse::Ok().json(CommentResponse::from(comment)))
}
