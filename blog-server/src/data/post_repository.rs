use std::collections::HashMap;

use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostChanges, PostStatus};
use crate::domain::ranking::prefix_tsquery;
use crate::domain::tag::Tag;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info};
use uuid::Uuid;

const POST_COLUMNS: &str =
    "p.id, p.author_id, p.title, p.slug, p.body, p.publish, p.status, p.created_at, p.updated_at";

const SLUG_DATE_CONSTRAINT: &str = "posts_slug_publish_date_key";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError>;
    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, DomainError>;
    async fn delete_post(&self, id: Uuid, author_id: Uuid) -> Result<(), DomainError>;

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError>;

    /// Published posts, newest first, optionally restricted to one tag.
    async fn list_published(
        &self,
        tag_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, DomainError>;
    async fn count_published(&self, tag_id: Option<Uuid>) -> Result<i64, DomainError>;
    async fn latest_published(&self, limit: i64) -> Result<Vec<Post>, DomainError>;
    async fn all_published(&self) -> Result<Vec<Post>, DomainError>;
    async fn find_published_by_date(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, DomainError>;
    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError>;
    /// Published posts other than `exclude` carrying any of `tag_ids`.
    async fn published_sharing_tags(
        &self,
        tag_ids: Vec<Uuid>,
        exclude: Uuid,
    ) -> Result<Vec<Post>, DomainError>;
    /// Published posts the storage engine's text search matches for `query`.
    async fn search_published(&self, query: &str) -> Result<Vec<Post>, DomainError>;
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    slug: String,
    body: String,
    publish: DateTime<Utc>,
    status: PostStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self, tags: Vec<Tag>) -> Post {
        Post {
            id: self.id,
            author_id: self.author_id,
            title: self.title,
            slug: self.slug,
            body: self.body,
            publish: self.publish,
            status: self.status,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
    slug: String,
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the tags of every row in one query and builds owned posts.
    async fn attach_tags(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, DomainError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let tag_rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name, t.slug
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while loading post tags: {}", e);
            DomainError::Internal(e.to_string())
        })?;

        let mut by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            by_post.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_post.remove(&row.id).unwrap_or_default();
                row.into_post(tags)
            })
            .collect())
    }

    async fn fetch_posts(
        &self,
        query: sqlx::query::QueryAs<'_, Postgres, PostRow, sqlx::postgres::PgArguments>,
        what: &str,
    ) -> Result<Vec<Post>, DomainError> {
        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            error!("db error while fetching {}: {}", what, e);
            DomainError::Internal(e.to_string())
        })?;
        self.attach_tags(rows).await
    }

    async fn fetch_post(
        &self,
        query: sqlx::query::QueryAs<'_, Postgres, PostRow, sqlx::postgres::PgArguments>,
        what: &str,
    ) -> Result<Option<Post>, DomainError> {
        let row = query.fetch_optional(&self.pool).await.map_err(|e| {
            error!("db error while fetching {}: {}", what, e);
            DomainError::Internal(e.to_string())
        })?;
        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

fn map_write_error(e: sqlx::Error, slug: &str) -> DomainError {
    let slug_clash = e
        .as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c == SLUG_DATE_CONSTRAINT)
        == Some(true);
    if slug_clash {
        DomainError::SlugTaken(slug.to_string())
    } else {
        error!("failed to write post: {}", e);
        DomainError::Internal(format!("database error: {}", e))
    }
}

/// The slug a post ends up with once `requested` is applied over `stored`.
fn effective_slug(requested: Option<&str>, stored: String) -> String {
    requested.map(str::to_string).unwrap_or(stored)
}

fn internal(e: sqlx::Error) -> DomainError {
    error!("database error: {}", e);
    DomainError::Internal(e.to_string())
}

/// Upserts tags by slug and links them to the post, replacing older links.
async fn replace_post_tags(
    tx: &mut Transaction<'_, Postgres>,
    post_id: Uuid,
    tags: &[Tag],
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut **tx)
        .await?;

    let mut stored = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (id, name, slug)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
            RETURNING id, name, slug
            "#,
        )
        .bind(tag.id)
        .bind(&tag.name)
        .bind(&tag.slug)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await?;
        stored.push(tag);
    }
    stored.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(stored)
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, title, slug, body, publish, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.body)
        .bind(post.publish)
        .bind(post.status)
        .bind(post.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &post.slug))?;

        let tags = replace_post_tags(&mut tx, post.id, &post.tags)
            .await
            .map_err(internal)?;
        tx.commit().await.map_err(internal)?;

        info!(post_id = %post.id, author_id = %post.author_id, slug = %post.slug, "post created");
        Ok(Post { tags, ..post })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        self.fetch_post(sqlx::query_as::<_, PostRow>(&sql).bind(id), "post by id")
            .await
    }

    async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, DomainError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let stored_slug: Option<String> = sqlx::query_scalar(
            "SELECT slug FROM posts WHERE id = $1 AND author_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(author_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(internal)?;
        let Some(stored_slug) = stored_slug else {
            return Ok(None);
        };
        let slug_after_update = effective_slug(changes.slug.as_deref(), stored_slug);

        let row = sqlx::query_as::<_, PostRow>(
            r#"
            UPDATE posts AS p
            SET
                title = COALESCE($1, title),
                slug = COALESCE($2, slug),
                body = COALESCE($3, body),
                status = COALESCE($4, status),
                publish = COALESCE($5, publish),
                updated_at = $6
            WHERE p.id = $7 AND p.author_id = $8
            RETURNING p.id, p.author_id, p.title, p.slug, p.body, p.publish, p.status, p.created_at, p.updated_at
            "#,
        )
        .bind(changes.title)
        .bind(changes.slug)
        .bind(changes.body)
        .bind(changes.status)
        .bind(changes.publish)
        .bind(now)
        .bind(id)
        .bind(author_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &slug_after_update))?;

        let Some(row) = row else {
            return Ok(None);
        };

        if let Some(tags) = changes.tags {
            replace_post_tags(&mut tx, id, &tags)
                .await
                .map_err(internal)?;
        }
        tx.commit().await.map_err(internal)?;

        info!(post_id = %id, "post updated");
        Ok(self.attach_tags(vec![row]).await?.pop())
    }

    async fn delete_post(&self, id: Uuid, author_id: Uuid) -> Result<(), DomainError> {
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;

        if deleted.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(internal)?;

            return if exists {
                Err(DomainError::Forbidden)
            } else {
                Err(DomainError::PostNotFound(id.to_string()))
            };
        }

        info!(post_id = %id, "post deleted");
        Ok(())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find_tag_by_slug {}: {}", slug, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn list_published(
        &self,
        tag_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, DomainError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE p.status = 'published'
              AND ($1::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = $1))
            ORDER BY p.publish DESC, p.id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let query = sqlx::query_as::<_, PostRow>(&sql)
            .bind(tag_id)
            .bind(limit)
            .bind(offset);
        self.fetch_posts(query, "published posts").await
    }

    async fn count_published(&self, tag_id: Option<Uuid>) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts p
            WHERE p.status = 'published'
              AND ($1::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = $1))
            "#,
        )
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await
        .map_err(internal)
    }

    async fn latest_published(&self, limit: i64) -> Result<Vec<Post>, DomainError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.status = 'published' \
             ORDER BY p.publish DESC, p.id DESC LIMIT $1"
        );
        self.fetch_posts(sqlx::query_as::<_, PostRow>(&sql).bind(limit), "latest posts")
            .await
    }

    async fn all_published(&self) -> Result<Vec<Post>, DomainError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.status = 'published' \
             ORDER BY p.publish DESC, p.id DESC"
        );
        self.fetch_posts(sqlx::query_as::<_, PostRow>(&sql), "all published posts")
            .await
    }

    async fn find_published_by_date(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Option<Post>, DomainError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE p.status = 'published'
              AND p.slug = $1
              AND (p.publish AT TIME ZONE 'UTC')::date = $2
            "#
        );
        let query = sqlx::query_as::<_, PostRow>(&sql).bind(slug).bind(date);
        self.fetch_post(query, "post by date").await
    }

    async fn find_published_by_id(&self, id: Uuid) -> Result<Option<Post>, DomainError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1 AND p.status = 'published'"
        );
        self.fetch_post(sqlx::query_as::<_, PostRow>(&sql).bind(id), "published post")
            .await
    }

    async fn published_sharing_tags(
        &self,
        tag_ids: Vec<Uuid>,
        exclude: Uuid,
    ) -> Result<Vec<Post>, DomainError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE p.status = 'published'
              AND p.id <> $2
              AND EXISTS (
                    SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ANY($1))
            "#
        );
        let query = sqlx::query_as::<_, PostRow>(&sql).bind(tag_ids).bind(exclude);
        self.fetch_posts(query, "posts sharing tags").await
    }

    async fn search_published(&self, query: &str) -> Result<Vec<Post>, DomainError> {
        let Some(tsquery) = prefix_tsquery(query) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE p.status = 'published'
              AND to_tsvector('simple', p.title || ' ' || p.body) @@ to_tsquery('simple', $1)
            "#
        );
        let q = sqlx::query_as::<_, PostRow>(&sql).bind(tsquery);
        self.fetch_posts(q, "search candidates").await
    }
}
