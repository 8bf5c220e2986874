//! In-process `Store` used by unit tests. Enforces the same unique-openid
//! constraint as the Postgres schema.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Mutex,
};

use crate::{
    error::{AppError, Result},
    models::*,
};

use super::Store;

#[derive(Default)]
struct Tables {
    games: Vec<Game>,
    users: Vec<User>,
    next_game_id: i64,
    next_user_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Number of upcoming openid lookups that miss, simulating a concurrent insert.
    stale_reads: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn miss_next_lookups(&self, count: u32) {
        self.stale_reads.store(count, Ordering::SeqCst);
    }

    pub fn game_count(&self) -> usize {
        self.tables.lock().unwrap().games.len()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn users_with_openid(&self, openid: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .users
            .iter()
            .filter(|u| u.openid == openid)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_game(&self, game: NewGame) -> Result<Game> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_game_id += 1;
        let created = Game {
            id: tables.next_game_id,
            robots: game.robots,
            walls: game.walls,
            target: game.target,
            limit: game.limit,
            created_at: Utc::now(),
        };
        tables.games.push(created.clone());
        Ok(created)
    }

    async fn list_games(&self, skip: i64, limit: i64) -> Result<Vec<Game>> {
        let games: Vec<Game> = self
            .tables
            .lock()
            .unwrap()
            .games
            .iter()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(games)
    }

    async fn get_game(&self, id: i64) -> Result<Game> {
        let game = self
            .tables
            .lock()
            .unwrap()
            .games
            .iter()
            .find(|g| g.id == id)
            .cloned();
        game.ok_or_else(|| AppError::NotFound(format!("Game {} not found", id)))
    }

    async fn update_game(&self, id: i64, update: UpdateGameRequest) -> Result<Game> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .games
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Game {} not found", id)))?;
        *slot = update.apply(slot.clone());
        Ok(slot.clone())
    }

    async fn delete_game(&self, id: i64) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.games.len();
        tables.games.retain(|g| g.id != id);
        if tables.games.len() == before {
            return Err(AppError::NotFound(format!("Game {} not found", id)));
        }
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.openid == user.openid) {
            return Err(AppError::DuplicateIdentifier(format!(
                "user with openid {} already exists",
                user.openid
            )));
        }
        tables.next_user_id += 1;
        let created = User {
            id: tables.next_user_id,
            openid: user.openid,
            nickname: user.nickname,
            avatar_url: user.avatar_url,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_openid(&self, openid: &str) -> Result<Option<User>> {
        let stale = self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        let user = self
            .tables
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.openid == openid)
            .cloned();
        Ok(user)
    }

    async fn update_user(&self, openid: &str, update: UpdateUserRequest) -> Result<User> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.openid == openid)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", openid)))?;
        *slot = update.apply(slot.clone());
        Ok(slot.clone())
    }
}
