// handlers/protected/comments.rs - POST /api/games/:id/comments

use axum::extract::State;
use serde::Deserialize;

use crate::database::models::Comment;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(game_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> ApiResult<Comment> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Comment content is required"));
    }

    let comment = state.store.add_comment(game_id, current.user.id, content).await?;
    Ok(ApiResponse::created(comment))
}
