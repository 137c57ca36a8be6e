use crate::application::auth_service::AuthService;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::security::ACCESS_TOKEN_TTL_SECS;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest};
use actix_web::{HttpResponse, Scope, web};
use tracing::info;

pub fn scope<U: UserRepository + 'static>() -> Scope {
    web::scope("/auth")
        .route("/register", web::post().to(register::<U>))
        .route("/login", web::post().to(login::<U>))
}

fn bearer(access_token: String) -> AuthResponse {
    AuthResponse {
        access_token,
        expires_in: ACCESS_TOKEN_TTL_SECS,
        token_type: "Bearer".to_string(),
    }
}

async fn register<U: UserRepository + 'static>(
    service: web::Data<AuthService<U>>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    let password = payload.password.clone();
    let user = service.register(payload).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");

    let jwt = service.login(&user.username, &password).await?;
    Ok(HttpResponse::Created().json(bearer(jwt)))
}

async fn login<U: UserRepository + 'static>(
    service: web::Data<AuthService<U>>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, DomainError> {
    let jwt = service.login(&payload.username, &payload.password).await?;

    info!(username = %payload.username, "user logged in");

    Ok(HttpResponse::Ok().json(bearer(jwt)))
}
