//! PostgreSQL implementation of CatalogueStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::database::models::{Comment, Game, GameStatus, GameSummary, TopGame, User};
use crate::database::store::{
    CatalogueStore, GameChanges, MembershipList, NewGame, NewUser, StoreError, StoreResult,
};

const GAME_COLUMNS: &str = "id, igdb_id, title, description, cover_art_url, release_date, \
                            franchise, studio, created_at, updated_at";

/// Writes run inside `pool.begin()`; an uncommitted transaction rolls back
/// and hands its connection back to the pool when dropped, so every early
/// return via `?` releases cleanly.
#[derive(Clone)]
pub struct PgCatalogueStore {
    pool: PgPool,
}

impl PgCatalogueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Name the missing row after the violated foreign key
fn map_foreign_key_violation(e: sqlx::Error, user_id: i64, game_id: i64) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return match db_err.constraint() {
                Some(name) if name.ends_with("_user_id_fkey") => StoreError::user_not_found(user_id),
                _ => StoreError::game_not_found(game_id),
            };
        }
    }
    StoreError::Database(e)
}

async fn game_exists<'c, E>(executor: E, game_id: i64) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'c>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM games WHERE id = $1)")
        .bind(game_id)
        .fetch_one(executor)
        .await
}

#[async_trait]
impl CatalogueStore for PgCatalogueStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ensure_user(&self, profile: &NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        // A concurrent first request for the same subject makes this a no-op
        sqlx::query(
            r"
            INSERT INTO users (auth0_id, username, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (auth0_id) DO NOTHING
            ",
        )
        .bind(&profile.auth0_id)
        .bind(&profile.username)
        .bind(&profile.email)
        .execute(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, auth0_id, username, email, created_at, updated_at
            FROM users
            WHERE auth0_id = $1
            ",
        )
        .bind(&profile.auth0_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn create_game(&self, game: &NewGame) -> StoreResult<Game> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, Game>(&format!(
            r"
            INSERT INTO games (igdb_id, title, description, cover_art_url, release_date, franchise, studio)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (igdb_id) DO NOTHING
            RETURNING {GAME_COLUMNS}
            "
        ))
        .bind(game.igdb_id)
        .bind(&game.title)
        .bind(&game.description)
        .bind(&game.cover_art_url)
        .bind(game.release_date)
        .bind(&game.franchise)
        .bind(&game.studio)
        .fetch_optional(&mut *tx)
        .await?;

        match inserted {
            Some(created) => {
                tx.commit().await?;
                Ok(created)
            }
            None => {
                let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM games WHERE igdb_id = $1")
                    .bind(game.igdb_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                Err(StoreError::Conflict {
                    message: "Game already exists".to_string(),
                    game_id: existing,
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_game(&self, id: i64) -> StoreResult<Game> {
        sqlx::query_as::<_, Game>(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::game_not_found(id))
    }

    async fn list_games(&self) -> StoreResult<Vec<GameSummary>> {
        let games = sqlx::query_as::<_, GameSummary>(
            "SELECT id, igdb_id, title, cover_art_url FROM games ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }

    #[instrument(skip(self))]
    async fn update_game(&self, id: i64, changes: &GameChanges) -> StoreResult<Game> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Game>(&format!(
            r"
            UPDATE games
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                cover_art_url = COALESCE($4, cover_art_url),
                release_date = COALESCE($5, release_date),
                franchise = COALESCE($6, franchise),
                studio = COALESCE($7, studio),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GAME_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.cover_art_url)
        .bind(changes.release_date)
        .bind(&changes.franchise)
        .bind(&changes.studio)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::game_not_found(id))?;

        tx.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_game(&self, id: i64) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE game_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for list in [MembershipList::Library, MembershipList::NowPlaying] {
            sqlx::query(&format!("DELETE FROM {} WHERE game_id = $1", list.table_name()))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::game_not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_membership(
        &self,
        list: MembershipList,
        user_id: i64,
        game_id: i64,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        if !game_exists(&mut *tx, game_id).await? {
            return Err(StoreError::game_not_found(game_id));
        }

        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, game_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            list.table_name()
        ))
        .bind(user_id)
        .bind(game_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_foreign_key_violation(e, user_id, game_id))?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn remove_membership(
        &self,
        list: MembershipList,
        user_id: i64,
        game_id: i64,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        if !game_exists(&mut *tx, game_id).await? {
            return Err(StoreError::game_not_found(game_id));
        }

        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND game_id = $2",
            list.table_name()
        ))
        .bind(user_id)
        .bind(game_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn memberships(&self, list: MembershipList, user_id: i64) -> StoreResult<Vec<GameSummary>> {
        let games = sqlx::query_as::<_, GameSummary>(&format!(
            r"
            SELECT g.id, g.igdb_id, g.title, g.cover_art_url
            FROM games g
            JOIN {} m ON m.game_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.id
            ",
            list.table_name()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }

    async fn game_status(&self, user_id: i64, game_id: i64) -> StoreResult<GameStatus> {
        let row = sqlx::query_as::<_, (bool, bool, bool)>(
            r"
            SELECT
                EXISTS(SELECT 1 FROM games WHERE id = $2),
                EXISTS(SELECT 1 FROM user_owned_games WHERE user_id = $1 AND game_id = $2),
                EXISTS(SELECT 1 FROM user_now_playing WHERE user_id = $1 AND game_id = $2)
            ",
        )
        .bind(user_id)
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;

        match row {
            (false, _, _) => Err(StoreError::game_not_found(game_id)),
            (true, in_library, in_now_playing) => Ok(GameStatus {
                in_library,
                in_now_playing,
            }),
        }
    }

    #[instrument(skip(self, content))]
    async fn add_comment(&self, game_id: i64, user_id: i64, content: &str) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let comment = sqlx::query_as::<_, Comment>(
            r"
            WITH inserted AS (
                INSERT INTO comments (game_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, game_id, user_id, content, created_at
            )
            SELECT i.id, i.game_id, i.user_id, i.content, i.created_at, u.username
            FROM inserted i
            JOIN users u ON u.id = i.user_id
            ",
        )
        .bind(game_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_foreign_key_violation(e, user_id, game_id))?;

        tx.commit().await?;
        Ok(comment)
    }

    async fn comments(&self, game_id: i64) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r"
            SELECT c.id, c.game_id, c.user_id, c.content, c.created_at, u.username
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.game_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            ",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn top_by_now_playing(&self, limit: i64) -> StoreResult<Vec<TopGame>> {
        let games = sqlx::query_as::<_, TopGame>(
            r"
            SELECT g.id, g.igdb_id, g.title, g.description, g.cover_art_url, g.release_date,
                   g.franchise, g.studio, g.created_at, g.updated_at,
                   COUNT(np.user_id) AS player_count
            FROM games g
            JOIN user_now_playing np ON np.game_id = g.id
            GROUP BY g.id
            ORDER BY player_count DESC, g.id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(games)
    }
}
