use crate::application::post_service::PostService;
use crate::application::syndication::{FEED_ITEMS, Syndication};
use crate::data::post_repository::PostRepository;
use crate::domain::error::DomainError;
use actix_web::{HttpResponse, web};

pub async fn latest_feed<P: PostRepository + 'static>(
    posts: web::Data<PostService<P>>,
    syndication: web::Data<Syndication>,
) -> Result<HttpResponse, DomainError> {
    let latest = posts.latest(Some(FEED_ITEMS as i64)).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/rss+xml; charset=utf-8")
        .body(syndication.render_feed(&latest)?))
}

pub async fn sitemap<P: PostRepository + 'static>(
    posts: web::Data<PostService<P>>,
    syndication: web::Data<Syndication>,
) -> Result<HttpResponse, DomainError> {
    let published = posts.all_published().await?;
    Ok(HttpResponse::Ok()
        .content_type("application/xml; charset=utf-8")
        .body(syndication.render_sitemap(&published)?))
}
