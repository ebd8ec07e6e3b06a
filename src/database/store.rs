use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::auth::Claims;
use crate::database::models::{Comment, Game, GameStatus, GameSummary, TopGame, User};

/// Errors from a catalogue store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        game_id: Option<i64>,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn game_not_found(id: i64) -> Self {
        StoreError::NotFound(format!("Game {} not found", id))
    }

    pub fn user_not_found(id: i64) -> Self {
        StoreError::NotFound(format!("User {} not found", id))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Profile used when provisioning a user on first sight of a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub auth0_id: String,
    pub username: String,
    pub email: String,
}

impl NewUser {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            auth0_id: claims.sub.clone(),
            username: claims
                .nickname
                .clone()
                .unwrap_or_else(|| "New User".to_string()),
            email: claims
                .email
                .clone()
                .unwrap_or_else(|| "No email provided".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub igdb_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub cover_art_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub franchise: Vec<String>,
    pub studio: Vec<String>,
}

/// Partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_art_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub franchise: Option<Vec<String>>,
    pub studio: Option<Vec<String>>,
}

impl GameChanges {
    pub fn is_empty(&self) -> bool {
        *self == GameChanges::default()
    }
}

/// The two per-user game lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MembershipList {
    Library,
    NowPlaying,
}

impl MembershipList {
    pub fn table_name(&self) -> &'static str {
        match self {
            MembershipList::Library => "user_owned_games",
            MembershipList::NowPlaying => "user_now_playing",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipList::Library => "library",
            MembershipList::NowPlaying => "Now Playing",
        }
    }
}

/// Games, users, list memberships and comments.
///
/// Every write runs as one unit of work: it either fully applies or leaves
/// the store unchanged.
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    /// Return the user for `profile.auth0_id`, creating it if absent.
    /// Concurrent first calls for one subject converge on a single record.
    async fn ensure_user(&self, profile: &NewUser) -> StoreResult<User>;

    /// Insert a game; `Conflict` carrying the existing id if the external id is taken
    async fn create_game(&self, game: &NewGame) -> StoreResult<Game>;

    async fn find_game(&self, id: i64) -> StoreResult<Game>;

    async fn list_games(&self) -> StoreResult<Vec<GameSummary>>;

    async fn update_game(&self, id: i64, changes: &GameChanges) -> StoreResult<Game>;

    /// Delete a game together with its comments and memberships
    async fn delete_game(&self, id: i64) -> StoreResult<()>;

    /// Add-only: returns `true` when a record was inserted, `false` when it already existed
    async fn add_membership(
        &self,
        list: MembershipList,
        user_id: i64,
        game_id: i64,
    ) -> StoreResult<bool>;

    /// Returns `true` when a record was removed
    async fn remove_membership(
        &self,
        list: MembershipList,
        user_id: i64,
        game_id: i64,
    ) -> StoreResult<bool>;

    async fn memberships(&self, list: MembershipList, user_id: i64) -> StoreResult<Vec<GameSummary>>;

    async fn game_status(&self, user_id: i64, game_id: i64) -> StoreResult<GameStatus>;

    async fn add_comment(&self, game_id: i64, user_id: i64, content: &str) -> StoreResult<Comment>;

    /// Comments for a game, oldest first
    async fn comments(&self, game_id: i64) -> StoreResult<Vec<Comment>>;

    /// Games with at least one now-playing record, most players first,
    /// ties in insertion order
    async fn top_by_now_playing(&self, limit: i64) -> StoreResult<Vec<TopGame>>;
}
