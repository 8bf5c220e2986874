//! Test double for the WeChat client.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
};

use crate::error::{AppError, Result};

use super::{IdentityProvider, Profile};

/// Maps login codes to openids and returns a fixed profile, or fails the
/// profile call with `profile_errcode` when set.
#[derive(Default)]
pub struct FakeProvider {
    pub codes: HashMap<String, String>,
    pub profile: Profile,
    pub profile_errcode: Option<i64>,
    pub exchanges: AtomicU32,
    pub profile_fetches: AtomicU32,
}

impl FakeProvider {
    pub fn with_codes(pairs: &[(&str, &str)]) -> Self {
        Self {
            codes: pairs
                .iter()
                .map(|(code, openid)| (code.to_string(), openid.to_string()))
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_code(&self, code: &str) -> Result<String> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.codes
            .get(code)
            .cloned()
            .ok_or_else(|| AppError::UpstreamRejected {
                errcode: 40029,
                message: "invalid code".to_string(),
            })
    }

    async fn fetch_profile(&self, _openid: &str) -> Result<Profile> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        match self.profile_errcode {
            Some(errcode) => Err(AppError::UpstreamRejected {
                errcode,
                message: "api freq out of limit".to_string(),
            }),
            None => Ok(self.profile.clone()),
        }
    }
}
