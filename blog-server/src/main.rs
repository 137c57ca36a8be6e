mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use std::sync::Arc;

use anyhow::Context;
use application::auth_service::AuthService;
use application::comment_service::CommentService;
use application::post_service::PostService;
use application::share_service::ShareService;
use application::syndication::Syndication;
use data::comment_repository::PostgresCommentRepository;
use data::post_repository::PostgresPostRepository;
use data::user_repository::PostgresUserRepository;
use infrastructure::config::AppConfig;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::logging::init_logging;
use infrastructure::mailer::mailer_from_config;
use infrastructure::security::JwtKeys;
use server::{AppServices, start_rest_server};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = create_pool(&config.database_url)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));
    let post_repo = Arc::new(PostgresPostRepository::new(pool.clone()));
    let comment_repo = Arc::new(PostgresCommentRepository::new(pool));

    let mailer = mailer_from_config(&config.mail).context("failed to build mailer")?;

    let syndication =
        Syndication::new(config.site.clone()).context("failed to load feed templates")?;

    let services = AppServices {
        auth: Arc::new(AuthService::new(
            user_repo,
            JwtKeys::new(config.jwt_secret.clone()),
        )),
        posts: Arc::new(PostService::new(post_repo)),
        comments: Arc::new(CommentService::new(comment_repo)),
        share: Arc::new(ShareService::new(
            Arc::from(mailer),
            config.site.clone(),
            config.mail.clone(),
        )),
        syndication: Arc::new(syndication),
    };

    start_rest_server(config, services).await
}
