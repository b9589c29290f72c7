use super::{ApiError, ApiResult, AppState, Authenticated, Listing, MessageResponse};
use crate::database::models::{CategoryRecord, CommentRecord, PostRecord, ReactionRecord};
use crate::pagination::PageRequest;
use crate::posts::{CreatePostInput, PostView, ReactionSummary, UpdatePostInput};
use crate::reactions::{parse_kind, ToggleOutcome};
use crate::threading::ThreadEntry;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ReactionRequest {
    #[serde(rename = "type")]
    kind: String,
}

impl ReactionRequest {
    pub(crate) fn kind(&self) -> Result<crate::database::models::ReactionKind, ApiError> {
        Ok(parse_kind(&self.kind)?)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentRequest {
    content: String,
}

impl CommentRequest {
    pub(crate) fn content(&self) -> &str {
        &self.content
    }
}

/// 201 when the toggle created a reaction, 200 for a flip or removal.
pub(crate) fn toggle_status(summary: &ReactionSummary) -> StatusCode {
    match summary.outcome {
        ToggleOutcome::Created { .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    }
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let post = state.posts.create_post(&actor, payload)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(request): Query<PageRequest>,
) -> ApiResult<Listing<PostRecord>> {
    Ok(Listing::new("posts", state.posts.list_posts(&actor, request)?))
}

pub(crate) async fn list_own_posts(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(request): Query<PageRequest>,
) -> ApiResult<Listing<PostRecord>> {
    Ok(Listing::new(
        "posts",
        state.posts.list_own_posts(&actor, request)?,
    ))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
) -> ApiResult<PostView> {
    Ok(Json(state.posts.get_post(&actor, post_id)?))
}

pub(crate) async fn update_post(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
    Json(payload): Json<UpdatePostInput>,
) -> ApiResult<PostView> {
    Ok(Json(state.posts.update_post(&actor, post_id, payload)?))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
) -> ApiResult<MessageResponse> {
    state.posts.delete_post(&actor, post_id)?;
    Ok(MessageResponse::new("post deleted successfully"))
}

pub(crate) async fn categories_of_post(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
) -> ApiResult<Vec<CategoryRecord>> {
    Ok(Json(state.posts.categories_of_post(&actor, post_id)?))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentRecord>), ApiError> {
    let comment = state
        .posts
        .create_comment(&actor, post_id, payload.content())?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(crate) async fn list_comments(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
    Query(request): Query<PageRequest>,
) -> ApiResult<Listing<CommentRecord>> {
    Ok(Listing::new(
        "comments",
        state.posts.list_comments(&actor, post_id, request)?,
    ))
}

pub(crate) async fn comment_thread(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
) -> ApiResult<Vec<ThreadEntry>> {
    Ok(Json(state.posts.comment_thread(&actor, post_id)?))
}

pub(crate) async fn react(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
    Json(payload): Json<ReactionRequest>,
) -> Result<(StatusCode, Json<ReactionSummary>), ApiError> {
    let summary = state.posts.react(&actor, post_id, payload.kind()?)?;
    Ok((toggle_status(&summary), Json(summary)))
}

pub(crate) async fn list_reactions(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
    Query(request): Query<PageRequest>,
) -> ApiResult<Listing<ReactionRecord>> {
    Ok(Listing::new(
        "likes",
        state.posts.list_reactions(&actor, post_id, request)?,
    ))
}

pub(crate) async fn remove_reaction(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(post_id): Path<i64>,
    Json(payload): Json<ReactionRequest>,
) -> ApiResult<MessageResponse> {
    let kind = payload.kind()?;
    state.posts.remove_reaction(&actor, post_id, kind)?;
    Ok(MessageResponse::new(format!("{kind} removed successfully")))
}
