use super::{ApiError, ApiResult, AppState, Authenticated, MessageResponse, Peer};
use crate::accounts::{AccountInput, LoginInput, LoginResponse};
use crate::database::models::UserRecord;
use crate::ratelimit::Bucket;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordResetRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PasswordResetConfirm {
    token: String,
    #[serde(alias = "newPassword")]
    new_password: String,
}

pub(crate) async fn register(
    State(state): State<AppState>,
    peer: Peer,
    Json(payload): Json<AccountInput>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    state.throttle(Bucket::General, peer.0)?;
    let user = state.accounts.register(payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    peer: Peer,
    Json(payload): Json<LoginInput>,
) -> ApiResult<LoginResponse> {
    state.throttle(Bucket::Login, peer.0)?;
    Ok(Json(state.accounts.login(payload)?))
}

pub(crate) async fn logout(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> ApiResult<MessageResponse> {
    state.accounts.logout(&actor);
    Ok(MessageResponse::new("logged out"))
}

pub(crate) async fn request_password_reset(
    State(state): State<AppState>,
    peer: Peer,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<MessageResponse> {
    state.throttle(Bucket::General, peer.0)?;
    state.accounts.request_password_reset(&payload.email)?;
    Ok(MessageResponse::new("password reset email sent"))
}

pub(crate) async fn confirm_password_reset(
    State(state): State<AppState>,
    peer: Peer,
    Json(payload): Json<PasswordResetConfirm>,
) -> ApiResult<MessageResponse> {
    state.throttle(Bucket::General, peer.0)?;
    state
        .accounts
        .confirm_password_reset(&payload.token, &payload.new_password)?;
    Ok(MessageResponse::new("password has been reset"))
}
