use crate::error::BlogClientError;
use crate::models::{
    Comment, NewPost, Post, PostChanges, PostDetail, PostListing, SearchResponse, ShareRequest,
    ShareResponse,
};
use chrono::{DateTime, Datelike, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const TOKEN_FILE: &str = ".blog_token";

#[derive(Clone)]
pub struct BlogClientHttp {
    client: Arc<Client>,
    base_url: String,
    token: Option<String>,
    token_file: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(rename = "token_type")]
    pub token_type: String, // "Bearer"
}

#[derive(Debug, Serialize)]
struct CommentPayload<'a> {
    name: &'a str,
    email: &'a str,
    body: &'a str,
}

impl BlogClientHttp {
    pub fn connect(endpoint: &str) -> Result<Self, BlogClientError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client: Arc::new(Client::builder().build()?),
            base_url,
            token: None,
            token_file: PathBuf::from(TOKEN_FILE),
        })
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }

    /// Keeps the token for this client and persists it for later invocations.
    pub fn set_token(&mut self, token: String) -> Result<(), BlogClientError> {
        fs::write(&self.token_file, &token)?;
        self.token = Some(token);
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn stored_token(&self) -> Option<String> {
        match &self.token {
            Some(t) if !t.is_empty() => Some(t.clone()),
            _ => fs::read_to_string(&self.token_file)
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, BlogClientError> {
        let token = self.stored_token().ok_or(BlogClientError::Unauthorized)?;
        Ok(req.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, BlogClientError> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(BlogClientError::from_http_response(resp).await)
        }
    }

    async fn send_empty(req: RequestBuilder) -> Result<(), BlogClientError> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(BlogClientError::from_http_response(resp).await)
        }
    }

    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), BlogClientError> {
        let req = self.client.post(self.url("/api/auth/register")).json(&serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
        }));
        let auth: AuthResponse = Self::send(req).await?;
        self.set_token(auth.access_token)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), BlogClientError> {
        let req = self.client.post(self.url("/api/auth/login")).json(&serde_json::json!({
            "username": username,
            "password": password,
        }));
        let auth: AuthResponse = Self::send(req).await?;
        self.set_token(auth.access_token)
    }

    /// `page` is passed through untouched; the server decides what it means.
    pub async fn list_posts(
        &self,
        tag: Option<&str>,
        page: Option<&str>,
    ) -> Result<PostListing, BlogClientError> {
        let path = match tag {
            Some(tag) => format!("/api/posts/tag/{tag}"),
            None => "/api/posts".to_string(),
        };
        let mut req = self.client.get(self.url(&path));
        if let Some(page) = page {
            req = req.query(&[("page", page)]);
        }
        debug!(%path, ?page, "listing posts");
        Self::send(req).await
    }

    pub async fn latest_posts(&self, count: Option<i64>) -> Result<Vec<Post>, BlogClientError> {
        let mut req = self.client.get(self.url("/api/posts/latest"));
        if let Some(count) = count {
            req = req.query(&[("count", count)]);
        }
        Self::send(req).await
    }

    pub async fn get_post(
        &self,
        year: i32,
        month: u32,
        day: u32,
        slug: &str,
    ) -> Result<PostDetail, BlogClientError> {
        let req = self
            .client
            .get(self.url(&format!("/api/posts/{year}/{month}/{day}/{slug}")));
        Self::send(req).await
    }

    /// Fetches a post by the publish timestamp and slug it was listed with.
    pub async fn get_post_at(
        &self,
        publish: DateTime<Utc>,
        slug: &str,
    ) -> Result<PostDetail, BlogClientError> {
        self.get_post(publish.year(), publish.month(), publish.day(), slug)
            .await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse, BlogClientError> {
        let req = self
            .client
            .get(self.url("/api/posts/search"))
            .query(&[("query", query)]);
        Self::send(req).await
    }

    pub async fn comment(
        &self,
        post_id: Uuid,
        name: &str,
        email: &str,
        body: &str,
    ) -> Result<Comment, BlogClientError> {
        let req = self
            .client
            .post(self.url(&format!("/api/posts/{post_id}/comment")))
            .json(&CommentPayload { name, email, body });
        Self::send(req).await
    }

    pub async fn share(
        &self,
        post_id: Uuid,
        form: &ShareRequest,
    ) -> Result<ShareResponse, BlogClientError> {
        let req = self
            .client
            .post(self.url(&format!("/api/posts/{post_id}/share")))
            .json(form);
        Self::send(req).await
    }

    pub async fn feed(&self) -> Result<String, BlogClientError> {
        let resp = self.client.get(self.url("/feed")).send().await?;
        if resp.status().is_success() {
            Ok(resp.text().await?)
        } else {
            Err(BlogClientError::from_http_response(resp).await)
        }
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post, BlogClientError> {
        let req = self
            .authorized(self.client.post(self.url("/api/author/posts")))?
            .json(post);
        Self::send(req).await
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        changes: &PostChanges,
    ) -> Result<Post, BlogClientError> {
        let req = self
            .authorized(self.client.put(self.url(&format!("/api/author/posts/{id}"))))?
            .json(changes);
        Self::send(req).await
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), BlogClientError> {
        let req = self.authorized(
            self.client
                .delete(self.url(&format!("/api/author/posts/{id}"))),
        )?;
        Self::send_empty(req).await
    }

    pub async fn moderate_comment(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<Comment, BlogClientError> {
        let req = self
            .authorized(
                self.client
                    .put(self.url(&format!("/api/author/comments/{id}/active"))),
            )?
            .json(&serde_json::json!({ "active": active }));
        Self::send(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token_file: &str) -> BlogClientHttp {
        BlogClientHttp::connect("http://127.0.0.1:8080/")
            .unwrap()
            .with_token_file(std::env::temp_dir().join(token_file))
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = client("blog_token_url_test");
        assert_eq!(client.url("/api/posts"), "http://127.0.0.1:8080/api/posts");
    }

    #[test]
    fn token_round_trips_through_file() {
        let file = format!("blog_token_{}", Uuid::new_v4());
        let mut writer = client(&file);
        writer.set_token("abc".into()).unwrap();

        let reader = client(&file);
        assert_eq!(reader.token(), None);
        assert_eq!(reader.stored_token().as_deref(), Some("abc"));

        let _ = fs::remove_file(std::env::temp_dir().join(file));
    }

    #[tokio::test]
    async fn authoring_without_token_fails_before_sending() {
        let client = client(&format!("blog_token_missing_{}", Uuid::new_v4()));
        let err = client.delete_post(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BlogClientError::Unauthorized));
    }
}
