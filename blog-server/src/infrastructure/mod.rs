pub mod config;
pub mod database;
pub mod logging;
pub mod mailer;
pub mod security;
