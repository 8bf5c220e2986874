use serde::Deserialize;
use std::{env, str::FromStr, time::Duration};

use crate::{constants::WECHAT_DEFAULT_API_BASE, db::retry::MAX_RETRY_ATTEMPTS};

/// How a login request is turned into an openid and profile attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LoginStrategy {
    /// `jscode2session` only; profile fields are synthesized.
    SessionCode,
    /// Client-credential access token, then the user-info endpoint.
    AccessTokenProfile,
}

impl FromStr for LoginStrategy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "session" | "code" | "jscode2session" => Ok(Self::SessionCode),
            "profile" | "access_token" | "userinfo" => Ok(Self::AccessTokenProfile),
            other => anyhow::bail!("unknown WECHAT_LOGIN_STRATEGY: {}", other),
        }
    }
}

/// Whether a repeat login overwrites the stored nickname/avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProfilePolicy {
    RefreshOnLogin,
    PreserveOnLogin,
}

impl FromStr for ProfilePolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "refresh" | "refresh-on-login" => Ok(Self::RefreshOnLogin),
            "preserve" | "preserve-on-login" => Ok(Self::PreserveOnLogin),
            other => anyhow::bail!("unknown LOGIN_PROFILE_POLICY: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout_secs: u64,
    pub database_retry_attempts: u32,
    pub database_retry_delay_ms: u64,

    // WeChat mini-program
    pub wechat_app_id: String,
    pub wechat_app_secret: String,
    pub wechat_api_base: String,
    pub wechat_timeout_secs: u64,
    pub login_strategy: LoginStrategy,
    pub profile_policy: ProfilePolicy,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            database_acquire_timeout_secs: env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            database_retry_attempts: env::var("DATABASE_RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            database_retry_delay_ms: env::var("DATABASE_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,

            wechat_app_id: env::var("WECHAT_APP_ID")?,
            wechat_app_secret: env::var("WECHAT_APP_SECRET")?,
            wechat_api_base: env::var("WECHAT_API_BASE")
                .unwrap_or_else(|_| WECHAT_DEFAULT_API_BASE.to_string()),
            wechat_timeout_secs: env::var("WECHAT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            login_strategy: env::var("WECHAT_LOGIN_STRATEGY")
                .unwrap_or_else(|_| "session".to_string())
                .parse()?,
            profile_policy: env::var("LOGIN_PROFILE_POLICY")
                .unwrap_or_else(|_| "preserve".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.wechat_app_id.trim().is_empty() || self.wechat_app_secret.trim().is_empty() {
            anyhow::bail!("WECHAT_APP_ID and WECHAT_APP_SECRET must be set");
        }
        if self.database_retry_attempts == 0 || self.database_retry_attempts > MAX_RETRY_ATTEMPTS {
            anyhow::bail!(
                "DATABASE_RETRY_ATTEMPTS must be between 1 and {}",
                MAX_RETRY_ATTEMPTS
            );
        }
        if self.wechat_timeout_secs == 0 {
            anyhow::bail!("WECHAT_TIMEOUT_SECS must be > 0");
        }

        if !self.is_development() && self.cors_allowed_origins.trim() == "*" {
            tracing::warn!("CORS allows any origin outside development");
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn wechat_timeout(&self) -> Duration {
        Duration::from_secs(self.wechat_timeout_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config(database_url: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8000,
        environment: "development".to_string(),
        database_url: database_url.to_string(),
        database_max_connections: 1,
        database_acquire_timeout_secs: 1,
        database_retry_attempts: 1,
        database_retry_delay_ms: 1,
        wechat_app_id: "wx_test_app".to_string(),
        wechat_app_secret: "test_secret".to_string(),
        wechat_api_base: WECHAT_DEFAULT_API_BASE.to_string(),
        wechat_timeout_secs: 1,
        login_strategy: LoginStrategy::SessionCode,
        profile_policy: ProfilePolicy::PreserveOnLogin,
        cors_allowed_origins: "*".to_string(),
    }
}
