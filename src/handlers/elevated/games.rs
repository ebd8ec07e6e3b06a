// handlers/elevated/games.rs - PATCH and DELETE /api/games/:id

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::Game;
use crate::database::GameChanges;
use crate::error::ApiError;
use crate::handlers::protected::games::ReleaseDate;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGameRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_art_url: Option<String>,
    pub release_date: Option<ReleaseDate>,
    pub franchise: Option<Vec<String>>,
    pub studio: Option<Vec<String>>,
}

impl UpdateGameRequest {
    pub fn into_changes(self) -> Result<GameChanges, ApiError> {
        let title = match self.title {
            Some(title) if title.trim().is_empty() => {
                return Err(ApiError::bad_request("Title cannot be empty"));
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };

        let changes = GameChanges {
            title,
            description: self.description,
            cover_art_url: self.cover_art_url,
            release_date: self.release_date.as_ref().map(ReleaseDate::to_date).transpose()?,
            franchise: self.franchise,
            studio: self.studio,
        };

        if changes.is_empty() {
            return Err(ApiError::bad_request("No updatable fields provided"));
        }
        Ok(changes)
    }
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateGameRequest>,
) -> ApiResult<Game> {
    let changes = payload.into_changes()?;
    let game = state.store.update_game(id, &changes).await?;
    info!("User {} updated game {}", current.user.id, id);
    Ok(ApiResponse::success(game))
}

pub async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Value> {
    state.store.delete_game(id).await?;
    info!("User {} deleted game {}", current.user.id, id);
    Ok(ApiResponse::success(json!({
        "message": "Game deleted",
        "id": id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_rejected() {
        let err = UpdateGameRequest::default().into_changes().unwrap_err();
        assert_eq!(err.kind(), "bad_request");
    }

    #[test]
    fn blank_title_is_rejected() {
        let request = UpdateGameRequest {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(request.into_changes().unwrap_err().message(), "Title cannot be empty");
    }

    #[test]
    fn partial_update_keeps_other_fields_unset() {
        let request = UpdateGameRequest {
            studio: Some(vec!["Atlus".to_string()]),
            ..Default::default()
        };
        let changes = request.into_changes().unwrap();
        assert_eq!(changes.studio, Some(vec!["Atlus".to_string()]));
        assert!(changes.title.is_none());
    }
}
