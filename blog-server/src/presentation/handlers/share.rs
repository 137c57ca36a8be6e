use crate::application::post_service::PostService;
use crate::application::share_service::ShareService;
use crate::data::post_repository::PostRepository;
use crate::domain::error::DomainError;
use crate::domain::forms::ShareForm;
use crate::presentation::dto::{PostResponse, ShareResponse};
use actix_web::{HttpResponse, web};
use uuid::Uuid;

pub async fn share_form<P: PostRepository + 'static>(
    posts: web::Data<PostService<P>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post = posts.get_published_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ShareResponse {
        post: PostResponse::from(post),
        form: ShareForm::default(),
        sent: false,
    }))
}

pub async fn share_post<P: PostRepository + 'static>(
    posts: web::Data<PostService<P>>,
    share: web::Data<ShareService>,
    path: web::Path<Uuid>,
    payload: web::Json<ShareForm>,
) -> Result<HttpResponse, DomainError> {
    let post = posts.get_published_by_id(path.into_inner()).await?;
    let form = payload.into_inner();
    share.share(&post, form.clone()).await?;

    Ok(HttpResponse::Ok().json(ShareResponse {
        post: PostResponse::from(post),
        form,
        sent: true,
    }))
}
