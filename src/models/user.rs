use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    constants::{AVATAR_URL_MAX_CHARS, NICKNAME_MAX_CHARS, OPENID_MAX_CHARS},
    error::{AppError, Result},
    utils::generate_robot_name,
};

use super::ensure_max_chars;

// ==================== USER ====================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub openid: String,
    pub nickname: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub openid: String,
    pub nickname: String,
    pub avatar_url: String,
}

impl NewUser {
    /// Fills missing profile fields: synthesized nickname, empty avatar.
    pub fn with_profile(openid: String, nickname: Option<String>, avatar_url: Option<String>) -> Self {
        Self {
            openid,
            nickname: nickname
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(generate_robot_name),
            avatar_url: avatar_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub openid: Option<String>,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser> {
        let openid = normalize_openid(self.openid.as_deref())?;
        if let Some(nickname) = &self.nickname {
            validate_nickname(nickname)?;
        }
        if let Some(avatar_url) = &self.avatar_url {
            ensure_max_chars("avatar_url", avatar_url, AVATAR_URL_MAX_CHARS)?;
        }
        Ok(NewUser::with_profile(openid, self.nickname, self.avatar_url))
    }
}

/// Partial profile update. The openid is the lookup key and never changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(nickname) = &self.nickname {
            validate_nickname(nickname)?;
        }
        if let Some(avatar_url) = &self.avatar_url {
            ensure_max_chars("avatar_url", avatar_url, AVATAR_URL_MAX_CHARS)?;
        }
        Ok(())
    }

    pub fn apply(self, user: User) -> User {
        User {
            nickname: self.nickname.unwrap_or(user.nickname),
            avatar_url: self.avatar_url.unwrap_or(user.avatar_url),
            ..user
        }
    }
}

// ==================== LOGIN ====================
/// `POST /users/login` payload, accepted from the JSON body or the query string.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub code: Option<String>,
    pub openid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCredential {
    /// Single-use code from `wx.login()`.
    Code(String),
    /// Legacy clients that already know their openid.
    OpenId(String),
}

impl LoginRequest {
    /// Body values win over query values; a code wins over a legacy openid.
    pub fn merge(self, fallback: LoginRequest) -> LoginRequest {
        LoginRequest {
            code: self.code.or(fallback.code),
            openid: self.openid.or(fallback.openid),
        }
    }

    pub fn into_credential(self) -> Result<LoginCredential> {
        if let Some(code) = self.code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
            return Ok(LoginCredential::Code(code));
        }
        if self.openid.is_some() {
            return normalize_openid(self.openid.as_deref()).map(LoginCredential::OpenId);
        }
        Err(AppError::InvalidPayload("code is required".to_string()))
    }
}

/// A supplied nickname must be non-blank. Omit the field to get a synthesized one.
fn validate_nickname(nickname: &str) -> Result<()> {
    if nickname.trim().is_empty() {
        return Err(AppError::InvalidPayload("nickname must not be empty".to_string()));
    }
    ensure_max_chars("nickname", nickname, NICKNAME_MAX_CHARS)
}

pub fn normalize_openid(raw: Option<&str>) -> Result<String> {
    let openid = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::InvalidPayload("openid is required".to_string()))?;
    ensure_max_chars("openid", openid, OPENID_MAX_CHARS)?;
    Ok(openid.to_string())
}
