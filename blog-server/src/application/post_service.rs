use std::sync::Arc;

use crate::data::post_repository::PostRepository;
use crate::domain::forms::FieldErrors;
use crate::domain::pagination::{POSTS_PER_PAGE, Page, Paginator};
use crate::domain::post::{Post, PostChanges, slugify};
use crate::domain::ranking::{SIMILAR_POSTS_LIMIT, SearchHit, rank_search, rank_similar};
use crate::domain::tag::{Tag, normalize_tag_names};
use crate::domain::error::DomainError;
use crate::presentation::dto::{CreatePostRequest, UpdatePostRequest};
use chrono::NaiveDate;
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_LATEST_COUNT: i64 = 5;
const MAX_LATEST_COUNT: i64 = 20;

#[derive(Debug)]
pub struct PostListing {
    pub tag: Option<Tag>,
    pub page: Page<Post>,
    pub total_published: i64,
}

pub struct PostService<R: PostRepository + 'static> {
    repo: Arc<R>,
}

impl<R> PostService<R>
where
    R: PostRepository + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// One page of published posts, optionally narrowed to a tag.
    /// The page token is never an error: see `Paginator::resolve`.
    #[instrument(skip(self))]
    pub async fn list_published(
        &self,
        tag_slug: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<PostListing, DomainError> {
        let tag = match tag_slug {
            Some(slug) => Some(
                self.repo
                    .find_tag_by_slug(slug)
                    .await?
                    .ok_or_else(|| DomainError::TagNotFound(slug.to_string()))?,
            ),
            None => None,
        };
        let tag_id = tag.as_ref().map(|t| t.id);

        let count = self.repo.count_published(tag_id).await?;
        let window = Paginator::new(count.max(0) as usize, POSTS_PER_PAGE).resolve(page_token);
        let posts = self
            .repo
            .list_published(tag_id, window.limit() as i64, window.offset() as i64)
            .await?;

        let total_published = match tag_id {
            Some(_) => self.repo.count_published(None).await?,
            None => count,
        };

        debug!(page = window.number, num_pages = window.num_pages, "resolved page");
        Ok(PostListing {
            tag,
            page: window.into_page(posts),
            total_published,
        })
    }

    pub async fn get_published(
        &self,
        year: i32,
        month: u32,
        day: u32,
        slug: &str,
    ) -> Result<Post, DomainError> {
        let not_found = || DomainError::PostNotFound(format!("{year}/{month}/{day}/{slug}"));
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(not_found)?;
        self.repo
            .find_published_by_date(date, slug)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn get_published_by_id(&self, id: Uuid) -> Result<Post, DomainError> {
        self.repo
            .find_published_by_id(id)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(id.to_string()))
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(id.to_string()))
    }

    pub async fn similar_posts(&self, post: &Post) -> Result<Vec<Post>, DomainError> {
        if post.tags.is_empty() {
            return Ok(Vec::new());
        }
        let tag_ids = post.tags.iter().map(|t| t.id).collect();
        let candidates = self.repo.published_sharing_tags(tag_ids, post.id).await?;
        Ok(rank_similar(post, candidates, SIMILAR_POSTS_LIMIT))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<SearchHit>, DomainError> {
        let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
            return Ok(Vec::new());
        };
        let candidates = self.repo.search_published(query).await?;
        Ok(rank_search(query, candidates))
    }

    pub async fn latest(&self, count: Option<i64>) -> Result<Vec<Post>, DomainError> {
        let count = count
            .unwrap_or(DEFAULT_LATEST_COUNT)
            .clamp(1, MAX_LATEST_COUNT);
        self.repo.latest_published(count).await
    }

    pub async fn all_published(&self) -> Result<Vec<Post>, DomainError> {
        self.repo.all_published().await
    }

    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_post(
        &self,
        author_id: Uuid,
        request: CreatePostRequest,
    ) -> Result<Post, DomainError> {
        request.validate().map_err(FieldErrors::from)?;
        let post = Post::new(
            author_id,
            request.title.trim().to_string(),
            request.slug,
            request.body,
            request.status,
            request.publish,
            normalize_tag_names(&request.tags),
        );
        if post.slug.is_empty() {
            return Err(FieldErrors::single("slug", "could not derive a slug from the title").into());
        }
        self.repo.create(post).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_post(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        request: UpdatePostRequest,
    ) -> Result<Post, DomainError> {
        request.validate().map_err(FieldErrors::from)?;
        let slug = match request.slug.as_deref().map(slugify) {
            Some(slug) if slug.is_empty() => {
                return Err(FieldErrors::single("slug", "slug must contain letters or digits").into());
            }
            other => other,
        };
        let changes = PostChanges {
            title: request.title.map(|t| t.trim().to_string()),
            slug,
            body: request.body,
            status: request.status,
            publish: request.publish,
            tags: request.tags.as_deref().map(normalize_tag_names),
        };
        self.repo
            .update_post(post_id, author_id, changes)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(post_id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, author_id: Uuid, post_id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_post(post_id, author_id).await
    }
}
