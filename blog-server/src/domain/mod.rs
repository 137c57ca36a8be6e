pub mod comment;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod post;
pub mod ranking;
pub mod tag;
pub mod user;
