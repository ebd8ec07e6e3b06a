use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    /// External catalogue identifier; unique across the catalogue
    pub igdb_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub cover_art_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub franchise: Vec<String>,
    pub studio: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact listing used for library, now-playing and catalogue lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GameSummary {
    pub id: i64,
    pub igdb_id: i64,
    pub title: String,
    pub cover_art_url: Option<String>,
}

impl From<&Game> for GameSummary {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id,
            igdb_id: game.igdb_id,
            title: game.title.clone(),
            cover_art_url: game.cover_art_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TopGame {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub game: Game,
    pub player_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub in_library: bool,
    pub in_now_playing: bool,
}
