use super::posts::{toggle_status, CommentRequest, ReactionRequest};
use super::{ApiError, ApiResult, AppState, Authenticated, Listing, MessageResponse};
use crate::comments::CommentView;
use crate::database::models::{CommentRecord, ReactionRecord};
use crate::pagination::PageRequest;
use crate::posts::ReactionSummary;
use crate::threading::CommentChanges;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct DeleteCommentResponse {
    message: &'static str,
    rerooted_replies: usize,
}

pub(crate) async fn get_comment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(comment_id): Path<i64>,
) -> ApiResult<CommentView> {
    Ok(Json(state.comments.get_comment(&actor, comment_id)?))
}

pub(crate) async fn update_comment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(comment_id): Path<i64>,
    Json(changes): Json<CommentChanges>,
) -> ApiResult<CommentRecord> {
    Ok(Json(
        state.comments.update_comment(&actor, comment_id, changes)?,
    ))
}

pub(crate) async fn delete_comment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(comment_id): Path<i64>,
) -> ApiResult<DeleteCommentResponse> {
    let rerooted_replies = state.comments.delete_comment(&actor, comment_id)?;
    Ok(Json(DeleteCommentResponse {
        message: "comment deleted successfully",
        rerooted_replies,
    }))
}

pub(crate) async fn reply(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path((post_id, parent_comment_id)): Path<(i64, i64)>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentRecord>), ApiError> {
    let comment =
        state
            .comments
            .reply(&actor, post_id, parent_comment_id, payload.content())?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(crate) async fn react(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(comment_id): Path<i64>,
    Json(payload): Json<ReactionRequest>,
) -> Result<(StatusCode, Json<ReactionSummary>), ApiError> {
    let summary = state.comments.react(&actor, comment_id, payload.kind()?)?;
    Ok((toggle_status(&summary), Json(summary)))
}

pub(crate) async fn list_reactions(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(comment_id): Path<i64>,
    Query(request): Query<PageRequest>,
) -> ApiResult<Listing<ReactionRecord>> {
    Ok(Listing::new(
        "likes",
        state.comments.list_reactions(&actor, comment_id, request)?,
    ))
}

pub(crate) async fn remove_reaction(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(comment_id): Path<i64>,
    Json(payload): Json<ReactionRequest>,
) -> ApiResult<MessageResponse> {
    let kind = payload.kind()?;
    state.comments.remove_reaction(&actor, comment_id, kind)?;
    Ok(MessageResponse::new(format!("{kind} removed successfully")))
}
