//! HTTP client for the blog API.

mod error;
mod http_client;
mod models;

pub use error::BlogClientError;
pub use http_client::BlogClientHttp;
pub use models::{
    Comment, NewPost, Page, Post, PostChanges, PostDetail, PostListing, SearchResponse,
    SearchResult, ShareRequest, ShareResponse, Tag,
};
