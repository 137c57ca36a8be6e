use crate::application::auth_service::AuthService;
use crate::application::comment_service::CommentService;
use crate::application::post_service::PostService;
use crate::application::share_service::ShareService;
use crate::application::syndication::Syndication;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::infrastructure::config::{ANY_ORIGIN, AppConfig};
use crate::presentation::middleware::RequestTracing;
use crate::presentation::routes;
use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use tracing::info;

pub struct AppServices<U, P, C>
where
    U: UserRepository + 'static,
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    pub auth: Arc<AuthService<U>>,
    pub posts: Arc<PostService<P>>,
    pub comments: Arc<CommentService<C>>,
    pub share: Arc<ShareService>,
    pub syndication: Arc<Syndication>,
}

impl<U, P, C> Clone for AppServices<U, P, C>
where
    U: UserRepository + 'static,
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            posts: Arc::clone(&self.posts),
            comments: Arc::clone(&self.comments),
            share: Arc::clone(&self.share),
            syndication: Arc::clone(&self.syndication),
        }
    }
}

pub async fn start_rest_server<U, P, C>(
    config: AppConfig,
    services: AppServices<U, P, C>,
) -> anyhow::Result<()>
where
    U: UserRepository + 'static,
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
{
    let bind_address = (config.host.clone(), config.port);
    info!(host = %bind_address.0, port = bind_address.1, "HTTP server starting");

    HttpServer::new(move || {
        let cors = build_cors(&config);
        let keys = services.auth.keys().clone();

        App::new()
            .wrap(Logger::default())
            .wrap(RequestTracing)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer"))
                    .add(("Permissions-Policy", "geolocation=()"))
                    .add(("Cross-Origin-Opener-Policy", "same-origin")),
            )
            .wrap(cors)
            .app_data(web::Data::from(Arc::clone(&services.auth)))
            .app_data(web::Data::from(Arc::clone(&services.posts)))
            .app_data(web::Data::from(Arc::clone(&services.comments)))
            .app_data(web::Data::from(Arc::clone(&services.share)))
            .app_data(web::Data::from(Arc::clone(&services.syndication)))
            .configure(|cfg| routes::configure::<P, C, U>(cfg, keys))
    })
    .bind(bind_address)?
    .run()
    .await
    .map_err(anyhow::Error::new)?;

    Ok(())
}

/// A wildcard (or unset `CORS_ORIGINS`) opens the API to any origin without
/// credentials; explicit origins are allowed to send credentials.
fn build_cors(config: &AppConfig) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
        ])
        .max_age(3600);

    if config.cors_origins.iter().any(|origin| origin == ANY_ORIGIN) {
        return cors.allow_any_origin();
    }

    config
        .cors_origins
        .iter()
        .fold(cors.supports_credentials(), |cors, origin| {
            cors.allowed_origin(origin)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{MailConfig, SiteConfig, parse_cors_origins};
    use actix_service::Transform;
    use actix_web::http::StatusCode;
    use actix_web::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
    use actix_web::{HttpResponse, test};

    fn config(cors_origins: Vec<String>) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            database_url: "postgres://localhost/blog".into(),
            jwt_secret: "secret".into(),
            cors_origins,
            site: SiteConfig::default(),
            mail: MailConfig::default(),
        }
    }

    async fn cors_status(cors: Cors, origin: &str) -> (StatusCode, Option<String>) {
        let app = test::init_service(
            App::new()
                .wrap(cors)
                .route("/api/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/health")
            .insert_header((ORIGIN, origin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let allowed = resp
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        (resp.status(), allowed)
    }

    #[actix_web::test]
    async fn default_origins_build_a_working_cors_layer() {
        let cors = build_cors(&config(parse_cors_origins(None)));
        assert!(cors.new_transform(test::ok_service()).await.is_ok());

        let (status, allowed) =
            cors_status(build_cors(&config(parse_cors_origins(None))), "https://reader.example")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(allowed.is_some());
    }

    #[actix_web::test]
    async fn explicit_origins_are_honoured() {
        let origins = vec!["https://blog.example".to_string()];
        let cors = build_cors(&config(origins.clone()));
        assert!(cors.new_transform(test::ok_service()).await.is_ok());

        let (_, allowed) = cors_status(build_cors(&config(origins)), "https://blog.example").await;
        assert_eq!(allowed.as_deref(), Some("https://blog.example"));
    }
}
