// handlers/public/search.rs - external catalogue lookups

use axum::extract::State;
use serde::Deserialize;

use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::{FullResult, SummaryResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// GET /api/search-games?query=
pub async fn search_games(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<SummaryResult>> {
    let results = state.catalogue.search_by_title(&params.query).await?;
    Ok(ApiResponse::success(results))
}

/// GET /api/search-games-details/:external_id
pub async fn search_game_details(
    State(state): State<AppState>,
    ApiPath(external_id): ApiPath<i64>,
) -> ApiResult<FullResult> {
    let detail = state.catalogue.fetch_detail(external_id).await?;
    Ok(ApiResponse::success(detail))
}
