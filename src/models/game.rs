use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    constants::{DEFAULT_TIME_LIMIT_SECS, JSON_FIELD_MAX_CHARS},
    error::{AppError, Result},
};

use super::validate_json_field;

// ==================== GAME ====================
/// A stored puzzle board. `robots`, `walls` and `target` are opaque JSON documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    pub robots: String,
    pub walls: String,
    pub target: String,
    #[sqlx(rename = "time_limit")]
    pub limit: i32,
    pub created_at: DateTime<Utc>,
}

/// Validated insert values for a game.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    pub robots: String,
    pub walls: String,
    pub target: String,
    pub limit: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateGameRequest {
    pub robots: Option<String>,
    pub walls: Option<String>,
    pub target: Option<String>,
    pub limit: Option<i32>,
}

impl CreateGameRequest {
    pub fn into_new_game(self) -> Result<NewGame> {
        let robots = required_json("robots", self.robots)?;
        let walls = required_json("walls", self.walls)?;
        let target = required_json("target", self.target)?;
        let limit = self.limit.unwrap_or(DEFAULT_TIME_LIMIT_SECS);
        validate_limit(limit)?;

        Ok(NewGame {
            robots,
            walls,
            target,
            limit,
        })
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGameRequest {
    pub robots: Option<String>,
    pub walls: Option<String>,
    pub target: Option<String>,
    pub limit: Option<i32>,
}

impl UpdateGameRequest {
    /// Re-validates only the fields being changed.
    pub fn validate(&self) -> Result<()> {
        if let Some(robots) = &self.robots {
            validate_json_field("robots", robots, JSON_FIELD_MAX_CHARS)?;
        }
        if let Some(walls) = &self.walls {
            validate_json_field("walls", walls, JSON_FIELD_MAX_CHARS)?;
        }
        if let Some(target) = &self.target {
            validate_json_field("target", target, JSON_FIELD_MAX_CHARS)?;
        }
        if let Some(limit) = self.limit {
            validate_limit(limit)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_none() && self.walls.is_none() && self.target.is_none() && self.limit.is_none()
    }

    pub fn apply(self, game: Game) -> Game {
        Game {
            robots: self.robots.unwrap_or(game.robots),
            walls: self.walls.unwrap_or(game.walls),
            target: self.target.unwrap_or(game.target),
            limit: self.limit.unwrap_or(game.limit),
            ..game
        }
    }
}

fn required_json(name: &str, value: Option<String>) -> Result<String> {
    let value = value.ok_or_else(|| AppError::InvalidPayload(format!("{} is required", name)))?;
    validate_json_field(name, &value, JSON_FIELD_MAX_CHARS)?;
    Ok(value)
}

fn validate_limit(limit: i32) -> Result<()> {
    if limit < 0 {
        return Err(AppError::InvalidPayload(
            "limit must be a non-negative number of seconds".to_string(),
        ));
    }
    Ok(())
}
