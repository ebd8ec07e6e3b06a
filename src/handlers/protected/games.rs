// handlers/protected/games.rs - POST /api/games

use axum::extract::State;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;

use crate::database::models::Game;
use crate::database::NewGame;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

/// Release date as sent by clients: Unix seconds from the external
/// catalogue, or an ISO date (`2017-03-03` or a full RFC 3339 timestamp)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReleaseDate {
    Epoch(i64),
    Text(String),
}

impl ReleaseDate {
    pub fn to_date(&self) -> Result<NaiveDate, ApiError> {
        match self {
            ReleaseDate::Epoch(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ApiError::bad_request(format!("Invalid release date: {}", secs))),
            ReleaseDate::Text(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
                .map_err(|_| ApiError::bad_request(format!("Invalid release date: {}", text))),
        }
    }
}

/// Accepts both the external detail shape (`id`, `name`, `summary`,
/// `cover_url`, `first_release_date`) and the local column names.
#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    #[serde(alias = "id")]
    pub igdb_id: Option<i64>,
    #[serde(alias = "name")]
    pub title: Option<String>,
    #[serde(alias = "summary")]
    pub description: Option<String>,
    #[serde(alias = "cover_url")]
    pub cover_art_url: Option<String>,
    #[serde(alias = "first_release_date")]
    pub release_date: Option<ReleaseDate>,
    pub franchise: Option<Vec<String>>,
    pub studio: Option<Vec<String>>,
}

impl CreateGameRequest {
    pub fn into_new_game(self) -> Result<NewGame, ApiError> {
        let igdb_id = self
            .igdb_id
            .ok_or_else(|| ApiError::bad_request("Missing required field: id"))?;
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing required field: name"))?;
        let release_date = self.release_date.as_ref().map(ReleaseDate::to_date).transpose()?;

        Ok(NewGame {
            igdb_id,
            title,
            description: self.description,
            cover_art_url: self.cover_art_url,
            release_date,
            franchise: self.franchise.unwrap_or_default(),
            studio: self.studio.unwrap_or_default(),
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<CreateGameRequest>,
) -> ApiResult<Game> {
    let new_game = payload.into_new_game()?;
    let game = state.store.create_game(&new_game).await?;
    info!("User {} added game {} ({})", current.user.id, game.id, game.title);
    Ok(ApiResponse::created(game))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CreateGameRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_external_detail_shape() {
        let game = parse(json!({
            "id": 1942,
            "name": "The Legend of Zelda: Breath of the Wild",
            "summary": "Step into a world of discovery",
            "cover_url": "https://images.igdb.com/igdb/image/upload/t_cover_big/co3p2d.jpg",
            "first_release_date": 1488499200,
            "franchise": ["The Legend of Zelda"],
            "studio": ["Nintendo EPD"]
        }))
        .into_new_game()
        .unwrap();

        assert_eq!(game.igdb_id, 1942);
        assert_eq!(game.release_date, NaiveDate::from_ymd_opt(2017, 3, 3));
        assert_eq!(game.studio, vec!["Nintendo EPD".to_string()]);
    }

    #[test]
    fn accepts_local_names_and_iso_dates() {
        let game = parse(json!({
            "igdb_id": 7,
            "title": "Persona 5 Royal",
            "release_date": "2019-10-31"
        }))
        .into_new_game()
        .unwrap();

        assert_eq!(game.release_date, NaiveDate::from_ymd_opt(2019, 10, 31));
        assert!(game.franchise.is_empty());
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        let err = parse(json!({ "name": "No id" })).into_new_game().unwrap_err();
        assert_eq!(err.kind(), "bad_request");

        let err = parse(json!({ "id": 1, "name": "   " })).into_new_game().unwrap_err();
        assert_eq!(err.message(), "Missing required field: name");

        let err = parse(json!({ "id": 1, "name": "x", "first_release_date": "soon" }))
            .into_new_game()
            .unwrap_err();
        assert_eq!(err.kind(), "bad_request");
    }
}
