use async_trait::async_trait;
use sqlx::{pool::PoolConnection, postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::*,
};

#[cfg(test)]
pub mod memory;
pub mod retry;

use retry::{with_retry, RetryPolicy};

const GAME_COLUMNS: &str = "id, robots, walls, target, time_limit, created_at";
const USER_COLUMNS: &str = "id, openid, nickname, avatar_url";

/// Persistence seam shared by the HTTP handlers and the login service.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn create_game(&self, game: NewGame) -> Result<Game>;
    async fn list_games(&self, skip: i64, limit: i64) -> Result<Vec<Game>>;
    async fn get_game(&self, id: i64) -> Result<Game>;
    async fn update_game(&self, id: i64, update: UpdateGameRequest) -> Result<Game>;
    async fn delete_game(&self, id: i64) -> Result<()>;

    /// Fails with `DuplicateIdentifier` when the openid is already taken.
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn find_user_by_openid(&self, openid: &str) -> Result<Option<User>>;
    async fn update_user(&self, openid: &str, update: UpdateUserRequest) -> Result<User>;
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let retry = RetryPolicy::new(
            config.database_retry_attempts,
            Duration::from_millis(config.database_retry_delay_ms),
        );
        let options = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs));

        let pool = with_retry(retry, is_transient, || {
            options.clone().connect(&config.database_url)
        })
        .await?;

        Ok(Self { pool, retry })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        with_retry(self.retry, is_transient, || self.pool.acquire())
            .await
            .map_err(storage_error)
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        with_retry(self.retry, is_transient, || self.pool.begin())
            .await
            .map_err(storage_error)
    }
}

/// Connection-level failures worth another attempt. Constraint and query
/// errors are never retried.
pub fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut
    )
}

fn storage_error(err: sqlx::Error) -> AppError {
    if is_transient(&err) {
        AppError::StorageUnavailable(err.to_string())
    } else {
        AppError::Database(err)
    }
}

fn map_openid_conflict(err: sqlx::Error, openid: &str) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::DuplicateIdentifier(format!("user with openid {} already exists", openid))
        }
        other => storage_error(other),
    }
}

fn game_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Game {} not found", id))
}

fn user_not_found(openid: &str) -> AppError {
    AppError::NotFound(format!("User {} not found", openid))
}

// ==================== GAME QUERIES ====================
#[async_trait]
impl Store for Database {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.acquire().await?;
        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn create_game(&self, game: NewGame) -> Result<Game> {
        let mut conn = self.acquire().await?;
        let created = sqlx::query_as::<_, Game>(&format!(
            "INSERT INTO games (robots, walls, target, time_limit)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            GAME_COLUMNS
        ))
        .bind(&game.robots)
        .bind(&game.walls)
        .bind(&game.target)
        .bind(game.limit)
        .fetch_one(&mut *conn)
        .await
        .map_err(storage_error)?;

        tracing::debug!("Created game {}", created.id);
        Ok(created)
    }

    async fn list_games(&self, skip: i64, limit: i64) -> Result<Vec<Game>> {
        let mut conn = self.acquire().await?;
        let games = sqlx::query_as::<_, Game>(&format!(
            "SELECT {} FROM games ORDER BY id ASC LIMIT $1 OFFSET $2",
            GAME_COLUMNS
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *conn)
        .await
        .map_err(storage_error)?;
        Ok(games)
    }

    async fn get_game(&self, id: i64) -> Result<Game> {
        let mut conn = self.acquire().await?;
        let game = sqlx::query_as::<_, Game>(&format!(
            "SELECT {} FROM games WHERE id = $1",
            GAME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage_error)?;

        game.ok_or_else(|| game_not_found(id))
    }

    async fn update_game(&self, id: i64, update: UpdateGameRequest) -> Result<Game> {
        // Dropping `tx` on any early return rolls the update back.
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, Game>(&format!(
            "SELECT {} FROM games WHERE id = $1 FOR UPDATE",
            GAME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| game_not_found(id))?;

        let merged = update.apply(current);

        let saved = sqlx::query_as::<_, Game>(&format!(
            "UPDATE games
             SET robots = $2, walls = $3, target = $4, time_limit = $5
             WHERE id = $1
             RETURNING {}",
            GAME_COLUMNS
        ))
        .bind(id)
        .bind(&merged.robots)
        .bind(&merged.walls)
        .bind(&merged.target)
        .bind(merged.limit)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(saved)
    }

    async fn delete_game(&self, id: i64) -> Result<()> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(game_not_found(id));
        }
        tracing::debug!("Deleted game {}", id);
        Ok(())
    }

    // ==================== USER QUERIES ====================
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut conn = self.acquire().await?;
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (openid, nickname, avatar_url)
             VALUES ($1, $2, $3)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.openid)
        .bind(&user.nickname)
        .bind(&user.avatar_url)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_openid_conflict(e, &user.openid))?;

        tracing::info!("Registered user {} ({})", created.id, created.openid);
        Ok(created)
    }

    async fn find_user_by_openid(&self, openid: &str) -> Result<Option<User>> {
        let mut conn = self.acquire().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE openid = $1",
            USER_COLUMNS
        ))
        .bind(openid)
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage_error)?;
        Ok(user)
    }

    async fn update_user(&self, openid: &str, update: UpdateUserRequest) -> Result<User> {
        let mut tx = self.begin().await?;

        let current = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE openid = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(openid)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| user_not_found(openid))?;

        let merged = update.apply(current);

        let saved = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET nickname = $2, avatar_url = $3
             WHERE openid = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(openid)
        .bind(&merged.nickname)
        .bind(&merged.avatar_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(saved)
    }
}
