use crate::application::comment_service::CommentService;
use crate::application::post_service::PostService;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::error::DomainError;
use crate::presentation::dto::{
    CommentResponse, CreatePostRequest, LatestPostsQuery, ListPostsQuery, ListPostsResponse,
    PostDetailResponse, PostResponse, SearchQuery, SearchResponse, SearchResultResponse,
    UpdatePostRequest,
};
use crate::presentation::utils::{AuthenticatedUser, ensure_owner, request_id};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;
use uuid::Uuid;

async fn listing<P: PostRepository + 'static>(
    req: &HttpRequest,
    posts: &PostService<P>,
    tag_slug: Option<&str>,
    page: Option<&str>,
) -> Result<HttpResponse, DomainError> {
    let listing = posts.list_published(tag_slug, page).await?;

    info!(
        request_id = %request_id(req),
        tag = ?tag_slug,
        page = listing.page.number,
        "posts retrieved"
    );

    Ok(HttpResponse::Ok().json(ListPostsResponse {
        tag: listing.tag,
        page: listing.page.map(PostResponse::from),
        total_published: listing.total_published,
    }))
}

pub async fn list_posts<P: PostRepository + 'static>(
    req: HttpRequest,
    posts: web::Data<PostService<P>>,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse, DomainError> {
    listing(&req, &posts, None, query.page.as_deref()).await
}

pub async fn list_posts_by_tag<P: PostRepository + 'static>(
    req: HttpRequest,
    posts: web::Data<PostService<P>>,
    path: web::Path<String>,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse, DomainError> {
    let tag_slug = path.into_inner();
    listing(&req, &posts, Some(&tag_slug), query.page.as_deref()).await
}

pub async fn latest_posts<P: PostRepository + 'static>(
    posts: web::Data<PostService<P>>,
    query: web::Query<LatestPostsQuery>,
) -> Result<HttpResponse, DomainError> {
    let latest: Vec<PostResponse> = posts
        .latest(query.count)
        .await?
        .into_iter()
        .map(PostResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(latest))
}

pub async fn search_posts<P: PostRepository + 'static>(
    req: HttpRequest,
    posts: web::Data<PostService<P>>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, DomainError> {
    let query = query.into_inner().query;
    let results: Vec<SearchResultResponse> = posts
        .search(query.as_deref())
        .await?
        .into_iter()
        .map(SearchResultResponse::from)
        .collect();

    info!(
        request_id = %request_id(&req),
        query = ?query,
        results = results.len(),
        "search completed"
    );

    Ok(HttpResponse::Ok().json(SearchResponse { query, results }))
}

pub async fn post_detail<P, C>(
    posts: web::Data<PostService<P>>,
    comments: web::Data<CommentService<C>>,
    path: web::Path<(i32, u32, u32, String)>,
) -> Result<HttpResponse, DomainError>
where
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    let (year, month, day, slug) = path.into_inner();
    let post = posts.get_published(year, month, day, &slug).await?;
    let active = comments.active_comments(post.id).await?;
    let similar = posts.similar_posts(&post).await?;

    Ok(HttpResponse::Ok().json(PostDetailResponse {
        post: post.into(),
        comments: active.into_iter().map(CommentResponse::from).collect(),
        similar_posts: similar.into_iter().map(PostResponse::from).collect(),
    }))
}

pub async fn create_post<P: PostRepository + 'static>(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService<P>>,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, DomainError> {
    let post = posts.create_post(user.id, payload.into_inner()).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post.id,
        "post created"
    );

    Ok(HttpResponse::Created().json(PostResponse::from(post)))
}

pub async fn update_post<P: PostRepository + 'static>(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService<P>>,
    path: web::Path<Uuid>,
    payload: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let existing = posts.get_post(post_id).await?;
    ensure_owner(&existing.author_id, &user.id)?;

    let post = posts
        .update_post(user.id, post_id, payload.into_inner())
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post.id,
        "post updated"
    );

    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

pub async fn delete_post<P: PostRepository + 'static>(
    req: HttpRequest,
    user: AuthenticatedUser,
    posts: web::Data<PostService<P>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let existing = posts.get_post(post_id).await?;
    ensure_owner(&existing.author_id, &user.id)?;

    posts.delete_post(user.id, post_id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post_id,
        "post deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
