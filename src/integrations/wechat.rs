use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::{
    config::Config,
    constants::WECHAT_PROFILE_LANG,
    error::{AppError, Result},
};

const SESSION_PATH: &str = "/sns/jscode2session";
const TOKEN_PATH: &str = "/cgi-bin/token";
const USER_INFO_PATH: &str = "/cgi-bin/user/info";

/// Profile attributes reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

/// Exchanges mini-program credentials for a stable openid.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// One attempt only: login codes are single-use, so a retry is guaranteed to fail.
    async fn exchange_code(&self, code: &str) -> Result<String>;
    async fn fetch_profile(&self, openid: &str) -> Result<Profile>;
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    openid: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    nickname: Option<String>,
    headimgurl: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Clone, Debug)]
pub struct WechatClient {
    base_url: String,
    app_id: String,
    app_secret: String,
    client: Client,
}

impl WechatClient {
    pub fn new(
        base_url: String,
        app_id: String,
        app_secret: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            app_id,
            app_secret,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.wechat_api_base.clone(),
            config.wechat_app_id.clone(),
            config.wechat_app_secret.clone(),
            config.wechat_timeout(),
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .map_err(|e| AppError::Internal(format!("Invalid WECHAT_API_BASE: {}", e)))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn get(&self, label: &str, url: Url) -> Result<(StatusCode, String)> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(label, e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| transport_error(label, e))?;
        Ok((status, body))
    }

    async fn access_token(&self) -> Result<String> {
        let url = self.endpoint(
            TOKEN_PATH,
            &[
                ("grant_type", "client_credential"),
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
            ],
        )?;
        let (status, body) = self.get("token", url).await?;
        interpret_token(status, &body)
    }
}

#[async_trait]
impl IdentityProvider for WechatClient {
    async fn exchange_code(&self, code: &str) -> Result<String> {
        tracing::debug!("Exchanging login code via jscode2session");
        let url = self.endpoint(
            SESSION_PATH,
            &[
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ],
        )?;
        let (status, body) = self.get("jscode2session", url).await?;
        interpret_session(status, &body)
    }

    async fn fetch_profile(&self, openid: &str) -> Result<Profile> {
        let token = self.access_token().await?;
        tracing::debug!("Fetching WeChat profile for {}", openid);
        let url = self.endpoint(
            USER_INFO_PATH,
            &[
                ("access_token", token.as_str()),
                ("openid", openid),
                ("lang", WECHAT_PROFILE_LANG),
            ],
        )?;
        let (status, body) = self.get("user/info", url).await?;
        interpret_user_info(status, &body)
    }
}

fn transport_error(label: &str, err: reqwest::Error) -> AppError {
    // The request URL carries the app secret.
    let err = err.without_url();
    if err.is_timeout() {
        AppError::UpstreamTimeout(format!("WeChat {} request timed out", label))
    } else {
        AppError::UpstreamUnavailable(format!("WeChat {} request failed: {}", label, err))
    }
}

fn decode<'a, T: Deserialize<'a>>(label: &str, status: StatusCode, body: &'a str) -> Result<T> {
    if status != StatusCode::OK {
        return Err(AppError::UpstreamUnavailable(format!(
            "WeChat {} returned status {}",
            label,
            status.as_u16()
        )));
    }
    serde_json::from_str(body).map_err(|e| {
        AppError::UpstreamUnavailable(format!("WeChat {} returned malformed body: {}", label, e))
    })
}

fn check_errcode(errcode: Option<i64>, errmsg: Option<String>) -> Result<()> {
    match errcode {
        Some(code) if code != 0 => Err(AppError::UpstreamRejected {
            errcode: code,
            message: errmsg.unwrap_or_else(|| "unknown error".to_string()),
        }),
        _ => Ok(()),
    }
}

fn interpret_session(status: StatusCode, body: &str) -> Result<String> {
    let resp: SessionResponse = decode("jscode2session", status, body)?;
    check_errcode(resp.errcode, resp.errmsg)?;
    resp.openid
        .filter(|openid| !openid.is_empty())
        .ok_or_else(|| AppError::UpstreamRejected {
            errcode: 0,
            message: "jscode2session response did not include an openid".to_string(),
        })
}

fn interpret_token(status: StatusCode, body: &str) -> Result<String> {
    let resp: TokenResponse = decode("token", status, body)?;
    check_errcode(resp.errcode, resp.errmsg)?;
    resp.access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::UpstreamRejected {
            errcode: 0,
            message: "token response did not include an access_token".to_string(),
        })
}

fn interpret_user_info(status: StatusCode, body: &str) -> Result<Profile> {
    let resp: UserInfoResponse = decode("user/info", status, body)?;
    check_errcode(resp.errcode, resp.errmsg)?;
    Ok(Profile {
        nickname: resp.nickname.filter(|name| !name.trim().is_empty()),
        avatar_url: resp.headimgurl.filter(|url| !url.is_empty()),
    })
}
