// handlers/public/games.rs - catalogue reads: GET /api/games, /api/games/:id, /api/top-games

use axum::extract::State;
use serde::Serialize;

use crate::database::models::{Comment, Game, GameSummary, TopGame};
use crate::middleware::{ApiPath, ApiResponse, ApiResult};
use crate::state::AppState;

const TOP_GAMES_LIMIT: i64 = 10;

/// A game with its comments, oldest first
#[derive(Debug, Serialize)]
pub struct GameDetail {
    #[serde(flatten)]
    pub game: Game,
    pub comments: Vec<Comment>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<GameSummary>> {
    let games = state.store.list_games().await?;
    Ok(ApiResponse::success(games))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<GameDetail> {
    let game = state.store.find_game(id).await?;
    let comments = state.store.comments(id).await?;
    Ok(ApiResponse::success(GameDetail { game, comments }))
}

pub async fn top(State(state): State<AppState>) -> ApiResult<Vec<TopGame>> {
    let games = state.store.top_by_now_playing(TOP_GAMES_LIMIT).await?;
    Ok(ApiResponse::success(games))
}
