// handlers/protected/lists.rs - library and now-playing membership
//
// GET    /api/users/{library,now_playing}
// POST   /api/users/:sub/{library,now_playing}/:game_id
// DELETE /api/users/:sub/{library,now_playing}/:game_id
// DELETE /api/users/{library,now_playing}/:game_id
// GET    /api/users/game_status/:game_id

use axum::extract::State;
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::{GameStatus, GameSummary};
use crate::database::MembershipList;
use crate::error::ApiError;
use crate::middleware::{ApiPath, ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

fn flag_name(list: MembershipList) -> &'static str {
    match list {
        MembershipList::Library => "in_library",
        MembershipList::NowPlaying => "in_now_playing",
    }
}

fn membership_body(list: MembershipList, message: String, member: bool) -> Value {
    let mut body = json!({ "message": message });
    body[flag_name(list)] = Value::Bool(member);
    body
}

async fn list_games(state: &AppState, current: &CurrentUser, list: MembershipList) -> ApiResult<Vec<GameSummary>> {
    let games = state.store.memberships(list, current.user.id).await?;
    Ok(ApiResponse::success(games))
}

async fn add(
    state: &AppState,
    current: &CurrentUser,
    list: MembershipList,
    sub: &str,
    game_id: i64,
) -> ApiResult<Value> {
    current.ensure_subject(sub)?;

    let inserted = state.store.add_membership(list, current.user.id, game_id).await?;
    let message = if inserted {
        info!("User {} added game {} to {}", current.user.id, game_id, list.display_name());
        format!("Game added to {}", list.display_name())
    } else {
        format!("Game already in {}", list.display_name())
    };

    Ok(ApiResponse::success(membership_body(list, message, true)))
}

async fn remove_for_subject(
    state: &AppState,
    current: &CurrentUser,
    list: MembershipList,
    sub: &str,
    game_id: i64,
) -> ApiResult<Value> {
    current.ensure_subject(sub)?;

    let removed = state.store.remove_membership(list, current.user.id, game_id).await?;
    let message = if removed {
        format!("Game removed from {}", list.display_name())
    } else {
        format!("Game not in {}", list.display_name())
    };

    Ok(ApiResponse::success(membership_body(list, message, false)))
}

async fn remove(
    state: &AppState,
    current: &CurrentUser,
    list: MembershipList,
    game_id: i64,
) -> ApiResult<Value> {
    let removed = state.store.remove_membership(list, current.user.id, game_id).await?;
    if !removed {
        return Err(ApiError::not_found(format!("Game not in {}", list.display_name())));
    }

    Ok(ApiResponse::success(json!({
        "message": format!("Game removed from {}", list.display_name())
    })))
}

pub async fn library(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<GameSummary>> {
    list_games(&state, &current, MembershipList::Library).await
}

pub async fn now_playing(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<GameSummary>> {
    list_games(&state, &current, MembershipList::NowPlaying).await
}

pub async fn library_add(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((sub, game_id)): ApiPath<(String, i64)>,
) -> ApiResult<Value> {
    add(&state, &current, MembershipList::Library, &sub, game_id).await
}

pub async fn now_playing_add(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((sub, game_id)): ApiPath<(String, i64)>,
) -> ApiResult<Value> {
    add(&state, &current, MembershipList::NowPlaying, &sub, game_id).await
}

pub async fn library_remove_for_subject(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((sub, game_id)): ApiPath<(String, i64)>,
) -> ApiResult<Value> {
    remove_for_subject(&state, &current, MembershipList::Library, &sub, game_id).await
}

pub async fn now_playing_remove_for_subject(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath((sub, game_id)): ApiPath<(String, i64)>,
) -> ApiResult<Value> {
    remove_for_subject(&state, &current, MembershipList::NowPlaying, &sub, game_id).await
}

pub async fn library_remove(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(game_id): ApiPath<i64>,
) -> ApiResult<Value> {
    remove(&state, &current, MembershipList::Library, game_id).await
}

pub async fn now_playing_remove(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(game_id): ApiPath<i64>,
) -> ApiResult<Value> {
    remove(&state, &current, MembershipList::NowPlaying, game_id).await
}

pub async fn game_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(game_id): ApiPath<i64>,
) -> ApiResult<GameStatus> {
    let status = state.store.game_status(current.user.id, game_id).await?;
    Ok(ApiResponse::success(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_body_uses_list_flag() {
        let body = membership_body(MembershipList::NowPlaying, "Game added to Now Playing".to_string(), true);
        assert_eq!(body["in_now_playing"], true);
        assert!(body.get("in_library").is_none());
        assert_eq!(body["message"], "Game added to Now Playing");
    }
}
