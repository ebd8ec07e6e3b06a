use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

/// A comment together with its resolved author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub game_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user: CommentAuthor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
}

// Rows come from `comments JOIN users`, author columns are user_id/username
impl<'r> FromRow<'r, PgRow> for Comment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            game_id: row.try_get("game_id")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            user: CommentAuthor {
                id: row.try_get("user_id")?,
                username: row.try_get("username")?,
            },
        })
    }
}
