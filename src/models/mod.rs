// src/models/mod.rs
pub mod game;
pub mod response;
pub mod user;

pub use game::{CreateGameRequest, Game, NewGame, UpdateGameRequest};
pub use response::{ApiResponse, PaginatedResponse, Pagination};
pub use user::{CreateUserRequest, LoginRequest, NewUser, UpdateUserRequest, User};

use crate::error::{AppError, Result};

/// Rejects strings that are not syntactically valid JSON or exceed `max_chars`.
/// The document's internal schema is never inspected.
pub fn validate_json_field(name: &str, value: &str, max_chars: usize) -> Result<()> {
    ensure_max_chars(name, value, max_chars)?;
    serde_json::from_str::<serde_json::Value>(value)
        .map_err(|e| AppError::InvalidPayload(format!("{} is not valid JSON: {}", name, e)))?;
    Ok(())
}

pub fn ensure_max_chars(name: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.chars().count() > max_chars {
        return Err(AppError::InvalidPayload(format!(
            "{} exceeds maximum length ({})",
            name, max_chars
        )));
    }
    Ok(())
}
