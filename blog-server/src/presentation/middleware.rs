//! Request tracing for every route and bearer authentication for the
//! author scope.

use std::future::{Ready, ready};
use std::marker::PhantomData;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::application::auth_service::AuthService;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::utils::AuthenticatedUser;
use actix_service::{Service, Transform};
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage, ResponseError, web};
use futures_util::future::LocalBoxFuture;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
static TIMING_HEADER: HeaderName = HeaderName::from_static("server-timing");

#[derive(Clone)]
pub struct RequestId(pub String);

#[derive(Deserialize)]
struct PageParam {
    page: Option<String>,
}

/// Tags each request with an id (taken from `x-request-id` when the caller
/// sent one) and logs one line per request with the matched route, the tag
/// being browsed and the raw page token.
pub struct RequestTracing;

impl<S, B> Transform<S, ServiceRequest> for RequestTracing
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTracingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTracingService { service }))
    }
}

pub struct RequestTracingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestTracingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        req.extensions_mut().insert(RequestId(request_id.clone()));

        let method = req.method().clone();
        let path = req.path().to_owned();
        let page = web::Query::<PageParam>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.into_inner().page);

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = match fut.await {
                Ok(res) => res,
                Err(err) => {
                    warn!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        status = err.as_response_error().status_code().as_u16(),
                        "request failed"
                    );
                    return Err(err);
                }
            };

            let elapsed = start.elapsed();
            let route = res.request().match_pattern().unwrap_or_else(|| path.clone());
            let tag = res.request().match_info().get("tag_slug").map(str::to_owned);
            info!(
                request_id = %request_id,
                method = %method,
                route = %route,
                path = %path,
                tag = ?tag,
                page = ?page,
                status = res.status().as_u16(),
                duration_ms = elapsed.as_millis(),
                "request completed"
            );

            let headers = res.response_mut().headers_mut();
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                headers.insert(REQUEST_ID_HEADER.clone(), value);
            }
            if let Ok(value) = HeaderValue::from_str(&format!("app;dur={}", elapsed.as_millis())) {
                headers.insert(TIMING_HEADER.clone(), value);
            }
            Ok(res)
        })
    }
}

/// Resolves `Authorization: Bearer <jwt>` to an `AuthenticatedUser`, staff
/// flag included, through the `AuthService<U>` registered as app data.
/// Rejections are answered with the API's JSON error body.
pub struct BearerAuth<U> {
    keys: JwtKeys,
    _repo: PhantomData<fn() -> U>,
}

impl<U> BearerAuth<U> {
    pub fn new(keys: JwtKeys) -> Self {
        Self {
            keys,
            _repo: PhantomData,
        }
    }
}

impl<S, B, U> Transform<S, ServiceRequest> for BearerAuth<U>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    U: UserRepository + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S, U>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthService {
            service: Rc::new(service),
            keys: self.keys.clone(),
            _repo: PhantomData,
        }))
    }
}

pub struct BearerAuthService<S, U> {
    service: Rc<S>,
    keys: JwtKeys,
    _repo: PhantomData<fn() -> U>,
}

fn bearer_token(req: &ServiceRequest) -> Result<String, DomainError> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or(DomainError::Unauthorized)
}

async fn authenticate<U: UserRepository + 'static>(
    token: &str,
    keys: &JwtKeys,
    auth: Option<web::Data<AuthService<U>>>,
) -> Result<AuthenticatedUser, DomainError> {
    let auth = auth.ok_or_else(|| DomainError::Internal("auth service not configured".into()))?;
    let claims = keys
        .verify_token(token)
        .map_err(|_| DomainError::Unauthorized)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| DomainError::Unauthorized)?;

    let user = match auth.get_user(user_id).await {
        Ok(user) => user,
        Err(DomainError::UserNotFound(_)) => return Err(DomainError::Unauthorized),
        Err(other) => return Err(other),
    };

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
        is_staff: user.is_staff,
    })
}

impl<S, B, U> Service<ServiceRequest> for BearerAuthService<S, U>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    U: UserRepository + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let keys = self.keys.clone();
        let auth = req.app_data::<web::Data<AuthService<U>>>().cloned();

        Box::pin(async move {
            let outcome = match bearer_token(&req) {
                Ok(token) => authenticate(&token, &keys, auth).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(user) => {
                    debug!(user_id = %user.id, is_staff = user.is_staff, "bearer accepted");
                    req.extensions_mut().insert(user);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(err) => {
                    warn!(path = %req.path(), "bearer rejected: {}", err);
                    Ok(req.into_response(err.error_response()).map_into_right_body())
                }
            }
        })
    }
}
