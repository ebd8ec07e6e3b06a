// handlers/protected/users.rs - GET /api/users/me

use axum::extract::State;
use serde::Serialize;

use crate::database::models::GameSummary;
use crate::database::MembershipList;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: i64,
    pub auth0_id: String,
    pub username: String,
    pub email: String,
    pub permissions: Vec<String>,
    pub library: Vec<GameSummary>,
    pub now_playing: Vec<GameSummary>,
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Profile> {
    let library = state.store.memberships(MembershipList::Library, current.user.id).await?;
    let now_playing = state.store.memberships(MembershipList::NowPlaying, current.user.id).await?;

    let CurrentUser { claims, user } = current;
    Ok(ApiResponse::success(Profile {
        id: user.id,
        auth0_id: user.auth0_id,
        username: user.username,
        email: user.email,
        permissions: claims.permissions,
        library,
        now_playing,
    }))
}
