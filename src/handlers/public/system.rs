// handlers/public/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Kestrel API",
        "version": version,
        "description": "Shared game catalogue with personal library and now-playing lists",
        "endpoints": {
            "games": "/api/games[/:id] (public read, elevated edit/delete)",
            "comments": "/api/games/:id/comments (protected)",
            "search": "/api/search-games?query=, /api/search-games-details/:external_id (public)",
            "top": "/api/top-games (public)",
            "users": "/api/users/{me,library,now_playing,game_status} (protected)",
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
