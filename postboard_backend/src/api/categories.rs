use super::{ApiError, ApiResult, AppState, Authenticated, MessageResponse};
use crate::categories::{CreateCategoryInput, UpdateCategoryInput};
use crate::database::models::{CategoryRecord, PostRecord};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

pub(crate) async fn list_categories(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
) -> ApiResult<Vec<CategoryRecord>> {
    Ok(Json(state.categories.list()?))
}

pub(crate) async fn get_category(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    Path(category_id): Path<i64>,
) -> ApiResult<CategoryRecord> {
    Ok(Json(state.categories.get(category_id)?))
}

pub(crate) async fn posts_in_category(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(category_id): Path<i64>,
) -> ApiResult<Vec<PostRecord>> {
    Ok(Json(
        state.categories.posts_in_category(&actor, category_id)?,
    ))
}

pub(crate) async fn create_category(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<CategoryRecord>), ApiError> {
    let category = state.categories.create(&actor, payload)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub(crate) async fn update_category(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(category_id): Path<i64>,
    Json(payload): Json<UpdateCategoryInput>,
) -> ApiResult<CategoryRecord> {
    Ok(Json(
        state.categories.update(&actor, category_id, payload)?,
    ))
}

pub(crate) async fn delete_category(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(category_id): Path<i64>,
) -> ApiResult<MessageResponse> {
    state.categories.delete(&actor, category_id)?;
    Ok(MessageResponse::new("category deleted successfully"))
}
