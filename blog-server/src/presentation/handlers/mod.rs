pub mod auth;
pub mod comment;
pub mod feed;
pub mod post;
pub mod share;
