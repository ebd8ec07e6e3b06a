//! In-process CatalogueStore for tests and local development.
//!
//! Enforces the same unique constraints and cascades as the Postgres schema.
//! Each operation holds the write lock for its whole unit of work.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::models::{Comment, CommentAuthor, Game, GameStatus, GameSummary, TopGame, User};
use crate::database::store::{
    CatalogueStore, GameChanges, MembershipList, NewGame, NewUser, StoreError, StoreResult,
};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    users_by_subject: HashMap<String, i64>,
    games: BTreeMap<i64, Game>,
    // (list, user_id, game_id)
    memberships: BTreeSet<(MembershipList, i64, i64)>,
    comments: Vec<Comment>,
    next_user_id: i64,
    next_game_id: i64,
    next_comment_id: i64,
}

impl MemoryState {
    fn require_game(&self, game_id: i64) -> StoreResult<&Game> {
        self.games
            .get(&game_id)
            .ok_or_else(|| StoreError::game_not_found(game_id))
    }

    fn has_membership(&self, list: MembershipList, user_id: i64, game_id: i64) -> bool {
        self.memberships.contains(&(list, user_id, game_id))
    }
}

#[derive(Default)]
pub struct MemoryCatalogueStore {
    state: RwLock<MemoryState>,
}

impl MemoryCatalogueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogueStore for MemoryCatalogueStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ensure_user(&self, profile: &NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if let Some(id) = state.users_by_subject.get(&profile.auth0_id) {
            let id = *id;
            return Ok(state.users[&id].clone());
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: state.next_user_id,
            auth0_id: profile.auth0_id.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users_by_subject.insert(user.auth0_id.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_game(&self, game: &NewGame) -> StoreResult<Game> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.games.values().find(|g| g.igdb_id == game.igdb_id) {
            return Err(StoreError::Conflict {
                message: "Game already exists".to_string(),
                game_id: Some(existing.id),
            });
        }

        state.next_game_id += 1;
        let now = Utc::now();
        let created = Game {
            id: state.next_game_id,
            igdb_id: game.igdb_id,
            title: game.title.clone(),
            description: game.description.clone(),
            cover_art_url: game.cover_art_url.clone(),
            release_date: game.release_date,
            franchise: game.franchise.clone(),
            studio: game.studio.clone(),
            created_at: now,
            updated_at: now,
        };
        state.games.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_game(&self, id: i64) -> StoreResult<Game> {
        let state = self.state.read().await;
        state.require_game(id).cloned()
    }

    async fn list_games(&self) -> StoreResult<Vec<GameSummary>> {
        let state = self.state.read().await;
        Ok(state.games.values().map(GameSummary::from).collect())
    }

    async fn update_game(&self, id: i64, changes: &GameChanges) -> StoreResult<Game> {
        let mut state = self.state.write().await;
        let game = state
            .games
            .get_mut(&id)
            .ok_or_else(|| StoreError::game_not_found(id))?;

        if let Some(title) = &changes.title {
            game.title = title.clone();
        }
        if let Some(description) = &changes.description {
            game.description = Some(description.clone());
        }
        if let Some(cover_art_url) = &changes.cover_art_url {
            game.cover_art_url = Some(cover_art_url.clone());
        }
        if let Some(release_date) = changes.release_date {
            game.release_date = Some(release_date);
        }
        if let Some(franchise) = &changes.franchise {
            game.franchise = franchise.clone();
        }
        if let Some(studio) = &changes.studio {
            game.studio = studio.clone();
        }
        game.updated_at = Utc::now();

        Ok(game.clone())
    }

    async fn delete_game(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.games.remove(&id).is_none() {
            return Err(StoreError::game_not_found(id));
        }
        state.comments.retain(|c| c.game_id != id);
        state.memberships.retain(|(_, _, game_id)| *game_id != id);
        Ok(())
    }

    async fn add_membership(
        &self,
        list: MembershipList,
        user_id: i64,
        game_id: i64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        state.require_game(game_id)?;
        if !state.users.contains_key(&user_id) {
            return Err(StoreError::user_not_found(user_id));
        }
        Ok(state.memberships.insert((list, user_id, game_id)))
    }

    async fn remove_membership(
        &self,
        list: MembershipList,
        user_id: i64,
        game_id: i64,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        state.require_game(game_id)?;
        Ok(state.memberships.remove(&(list, user_id, game_id)))
    }

    async fn memberships(&self, list: MembershipList, user_id: i64) -> StoreResult<Vec<GameSummary>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .range((list, user_id, i64::MIN)..=(list, user_id, i64::MAX))
            .filter_map(|(_, _, game_id)| state.games.get(game_id))
            .map(GameSummary::from)
            .collect())
    }

    async fn game_status(&self, user_id: i64, game_id: i64) -> StoreResult<GameStatus> {
        let state = self.state.read().await;
        state.require_game(game_id)?;
        Ok(GameStatus {
            in_library: state.has_membership(MembershipList::Library, user_id, game_id),
            in_now_playing: state.has_membership(MembershipList::NowPlaying, user_id, game_id),
        })
    }

    async fn add_comment(&self, game_id: i64, user_id: i64, content: &str) -> StoreResult<Comment> {
        let mut state = self.state.write().await;
        state.require_game(game_id)?;
        let author = state
            .users
            .get(&user_id)
            .map(|u| CommentAuthor {
                id: u.id,
                username: u.username.clone(),
            })
            .ok_or_else(|| StoreError::user_not_found(user_id))?;

        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            game_id,
            content: content.to_string(),
            created_at: Utc::now(),
            user: author,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn comments(&self, game_id: i64) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn top_by_now_playing(&self, limit: i64) -> StoreResult<Vec<TopGame>> {
        let state = self.state.read().await;

        let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
        for (list, _, game_id) in &state.memberships {
            if *list == MembershipList::NowPlaying {
                *counts.entry(*game_id).or_default() += 1;
            }
        }

        // BTreeMap iterates by game id, so the stable sort keeps insertion order on ties
        let mut ranked: Vec<(i64, i64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(ranked
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .filter_map(|(game_id, player_count)| {
                state.games.get(&game_id).map(|game| TopGame {
                    game: game.clone(),
                    player_count,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn profile(sub: &str) -> NewUser {
        NewUser {
            auth0_id: sub.to_string(),
            username: "New User".to_string(),
            email: "No email provided".to_string(),
        }
    }

    fn new_game(igdb_id: i64, title: &str) -> NewGame {
        NewGame {
            igdb_id,
            title: title.to_string(),
            description: Some(format!("{} description", title)),
            cover_art_url: None,
            release_date: None,
            franchise: vec![],
            studio: vec![],
        }
    }

    #[tokio::test]
    async fn ensure_user_is_idempotent_under_concurrency() {
        let store = Arc::new(MemoryCatalogueStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.ensure_user(&profile("auth0|same")).await })
            })
            .collect();

        let mut ids = BTreeSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap().id);
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(store.state.read().await.users.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_external_id_conflicts() {
        let store = MemoryCatalogueStore::new();
        let first = store.create_game(&new_game(1942, "Zelda")).await.unwrap();
        let err = store.create_game(&new_game(1942, "Zelda again")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { game_id: Some(id), .. } if id == first.id));
    }

    #[tokio::test]
    async fn membership_add_is_add_only() {
        let store = MemoryCatalogueStore::new();
        let user = store.ensure_user(&profile("auth0|a")).await.unwrap();
        let game = store.create_game(&new_game(1, "A")).await.unwrap();

        assert!(store.add_membership(MembershipList::Library, user.id, game.id).await.unwrap());
        assert!(!store.add_membership(MembershipList::Library, user.id, game.id).await.unwrap());
        let status = store.game_status(user.id, game.id).await.unwrap();
        assert!(status.in_library);
        assert!(!status.in_now_playing);

        assert!(store.remove_membership(MembershipList::Library, user.id, game.id).await.unwrap());
        assert!(!store.remove_membership(MembershipList::Library, user.id, game.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_game_cascades() {
        let store = MemoryCatalogueStore::new();
        let user = store.ensure_user(&profile("auth0|a")).await.unwrap();
        let game = store.create_game(&new_game(1, "A")).await.unwrap();
        store.add_membership(MembershipList::NowPlaying, user.id, game.id).await.unwrap();
        store.add_comment(game.id, user.id, "great").await.unwrap();

        store.delete_game(game.id).await.unwrap();

        assert!(matches!(store.find_game(game.id).await, Err(StoreError::NotFound(_))));
        assert!(store.comments(game.id).await.unwrap().is_empty());
        assert!(store.memberships(MembershipList::NowPlaying, user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn top_games_ranked_by_players() {
        let store = MemoryCatalogueStore::new();
        let a = store.create_game(&new_game(1, "A")).await.unwrap();
        let b = store.create_game(&new_game(2, "B")).await.unwrap();
        let c = store.create_game(&new_game(3, "C")).await.unwrap();
        store.create_game(&new_game(4, "Nobody plays")).await.unwrap();

        for (game, players) in [(&a, 3), (&b, 5), (&c, 1)] {
            for n in 0..players {
                let user = store
                    .ensure_user(&profile(&format!("auth0|{}-{}", game.id, n)))
                    .await
                    .unwrap();
                store.add_membership(MembershipList::NowPlaying, user.id, game.id).await.unwrap();
            }
        }

        let top = store.top_by_now_playing(10).await.unwrap();
        let order: Vec<(&str, i64)> = top.iter().map(|t| (t.game.title.as_str(), t.player_count)).collect();
        assert_eq!(order, vec![("B", 5), ("A", 3), ("C", 1)]);
    }
}
