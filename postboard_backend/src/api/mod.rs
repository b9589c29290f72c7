mod auth;
mod categories;
mod comments;
mod posts;
mod users;

use crate::accounts::{AccountService, LogMailer, Mailer};
use crate::auth::{Actor, ClaimVerifier};
use crate::categories::CategoryService;
use crate::comments::CommentService;
use crate::config::PostboardConfig;
use crate::database::Database;
use crate::error::{DenyReason, PostboardError};
use crate::pagination::Pagination;
use crate::posts::PostService;
use crate::ratelimit::{Bucket, RateLimiter};
use crate::users::UserService;
use anyhow::Result;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{async_trait, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: PostboardConfig,
    pub verifier: ClaimVerifier,
    pub limiter: RateLimiter,
    pub accounts: AccountService,
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub categories: CategoryService,
}

impl AppState {
    pub fn new(
        config: PostboardConfig,
        database: Database,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let verifier = ClaimVerifier::new(&config.auth.jwt_secret, config.auth.token_ttl_secs)?;
        Ok(Self {
            limiter: RateLimiter::new(&config.rate_limit),
            accounts: AccountService::new(
                database.clone(),
                verifier.clone(),
                mailer,
                &config.auth,
            ),
            users: UserService::new(database.clone()),
            posts: PostService::new(database.clone()),
            comments: CommentService::new(database.clone()),
            categories: CategoryService::new(database),
            verifier,
            config,
        })
    }

    fn throttle(&self, bucket: Bucket, peer: SocketAddr) -> Result<(), ApiError> {
        if self.limiter.check(bucket, peer.ip()) {
            Ok(())
        } else {
            Err(ApiError::TooManyRequests)
        }
    }
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(DenyReason),
    Unavailable(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    TooManyRequests,
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
            ApiError::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: reason.to_string(),
                    reason: Some(reason.code()),
                },
            ),
            ApiError::Unavailable(msg) => (StatusCode::FORBIDDEN, ErrorResponse::new(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            ApiError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new("too many requests, please try again later".into()),
            ),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal server error".into()),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<PostboardError> for ApiError {
    fn from(err: PostboardError) -> Self {
        match err {
            PostboardError::Unauthenticated(msg) => ApiError::Unauthorized(msg),
            PostboardError::Forbidden(reason) => ApiError::Forbidden(reason),
            err @ (PostboardError::NotFound(_) | PostboardError::ParentNotFound(_)) => {
                ApiError::NotFound(err.to_string())
            }
            err @ PostboardError::TargetUnavailable(_) => ApiError::Unavailable(err.to_string()),
            PostboardError::InvalidInput(msg) => ApiError::BadRequest(msg),
            PostboardError::Conflict(msg) => ApiError::Conflict(msg),
            PostboardError::Internal(err) => ApiError::Internal(err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        PostboardError::from(err).into()
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl ErrorResponse {
    fn new(error: String) -> Self {
        Self {
            error,
            reason: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// A page of results serialized under a resource-specific key, e.g.
/// `{"posts": [...], "pagination": {...}}`.
pub(crate) struct Listing<T> {
    key: &'static str,
    items: Vec<T>,
    pagination: Pagination,
}

impl<T> Listing<T> {
    pub(crate) fn new(key: &'static str, page: crate::pagination::Page<T>) -> Json<Self> {
        Json(Self {
            key,
            items: page.items,
            pagination: page.pagination,
        })
    }
}

impl<T: Serialize> Serialize for Listing<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

/// The verified caller of a protected route.
pub struct Authenticated(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let actor = state.verifier.verify_header(header)?;
        Ok(Authenticated(actor))
    }
}

/// Builds the full router over `state`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", axum::routing::patch(users::update_self))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_role)
                .delete(users::delete_user),
        )
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/mine", get(posts::list_own_posts))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/:id/comments",
            get(posts::list_comments).post(posts::create_comment),
        )
        .route("/posts/:id/thread", get(posts::comment_thread))
        .route(
            "/posts/:id/comments/:comment_id/replies",
            post(comments::reply),
        )
        .route(
            "/posts/:id/likes",
            get(posts::list_reactions)
                .post(posts::react)
                .delete(posts::remove_reaction),
        )
        .route("/posts/:id/categories", get(posts::categories_of_post))
        .route(
            "/comments/:id",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/comments/:id/likes",
            get(comments::list_reactions)
                .post(comments::react)
                .delete(comments::remove_reaction),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/categories/:id/posts", get(categories::posts_in_category));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_port: u16,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
    })
}

/// Client address used to key the rate limiter.
pub(crate) type Peer = ConnectInfo<SocketAddr>;

pub async fn serve_http(config: PostboardConfig, database: Database) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let listener = TcpListener::bind(addr).await?;
    let mailer = Arc::new(LogMailer::new(config.mail.from.clone()));
    serve_with_listener(listener, config, database, mailer).await
}

/// Serves on an already-bound listener; the integration tests bind port 0.
pub async fn serve_with_listener(
    listener: TcpListener,
    config: PostboardConfig,
    database: Database,
    mailer: Arc<dyn Mailer>,
) -> Result<()> {
    let state = AppState::new(config, database, mailer)?;
    let router = router(state);

    tracing::info!(addr = ?listener.local_addr()?, "HTTP server listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
