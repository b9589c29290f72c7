use super::{ApiError, ApiResult, AppState, Authenticated, MessageResponse};
use crate::database::models::UserRecord;
use crate::users::{CreateUserInput, UpdateProfileInput, UpdateRoleInput};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

pub(crate) async fn list_users(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
) -> ApiResult<Vec<UserRecord>> {
    Ok(Json(state.users.list_users()?))
}

pub(crate) async fn get_user(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    Path(user_id): Path<i64>,
) -> ApiResult<UserRecord> {
    Ok(Json(state.users.get_user(user_id)?))
}

pub(crate) async fn create_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let user = state.users.create_user(&actor, payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn update_self(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<UpdateProfileInput>,
) -> ApiResult<UserRecord> {
    Ok(Json(state.users.update_self(&actor, payload)?))
}

pub(crate) async fn update_role(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateRoleInput>,
) -> ApiResult<UserRecord> {
    Ok(Json(state.users.update_role(&actor, user_id, payload)?))
}

pub(crate) async fn delete_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(user_id): Path<i64>,
) -> ApiResult<MessageResponse> {
    state.users.delete_user(&actor, user_id)?;
    Ok(MessageResponse::new(format!("user {user_id} deleted")))
}
