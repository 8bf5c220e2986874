use std::sync::Arc;

use crate::{
    config::{LoginStrategy, ProfilePolicy},
    db::Store,
    error::{AppError, Result},
    integrations::{IdentityProvider, Profile},
    models::{user::LoginCredential, NewUser, UpdateUserRequest, User},
};

/// Login / upsert service - turns a login credential into exactly one local user per openid.
#[derive(Clone)]
pub struct LoginService {
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    strategy: LoginStrategy,
    policy: ProfilePolicy,
}

impl LoginService {
    pub fn new(
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        strategy: LoginStrategy,
        policy: ProfilePolicy,
    ) -> Self {
        Self {
            store,
            identity,
            strategy,
            policy,
        }
    }

    pub async fn login(&self, credential: LoginCredential) -> Result<User> {
        let openid = self.resolve_openid(credential).await?;

        if let Some(existing) = self.store.find_user_by_openid(&openid).await? {
            return self.on_repeat_login(existing).await;
        }

        let profile = self.upstream_profile(&openid).await?;
        let (nickname, avatar_url) = match profile.clone() {
            Some(Profile {
                nickname,
                avatar_url,
            }) => (nickname, avatar_url),
            None => (None, None),
        };
        let new_user = NewUser::with_profile(openid.clone(), nickname, avatar_url);

        match self.store.create_user(new_user).await {
            Ok(user) => Ok(user),
            Err(AppError::DuplicateIdentifier(_)) => {
                // A concurrent login inserted the same openid first.
                tracing::info!("Login raced on openid {}; returning existing user", openid);
                let existing = self
                    .store
                    .find_user_by_openid(&openid)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!("user {} vanished after conflict", openid))
                    })?;
                self.refresh_profile(existing, profile).await
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_openid(&self, credential: LoginCredential) -> Result<String> {
        match (credential, self.strategy) {
            (LoginCredential::Code(code), _) => self.identity.exchange_code(&code).await,
            (LoginCredential::OpenId(openid), LoginStrategy::AccessTokenProfile) => Ok(openid),
            (LoginCredential::OpenId(_), LoginStrategy::SessionCode) => Err(
                AppError::InvalidPayload("code is required".to_string()),
            ),
        }
    }

    async fn upstream_profile(&self, openid: &str) -> Result<Option<Profile>> {
        match self.strategy {
            LoginStrategy::SessionCode => Ok(None),
            LoginStrategy::AccessTokenProfile => self.identity.fetch_profile(openid).await.map(Some),
        }
    }

    /// Existing users only go upstream when their profile is going to be refreshed.
    async fn on_repeat_login(&self, existing: User) -> Result<User> {
        if self.policy == ProfilePolicy::PreserveOnLogin {
            return Ok(existing);
        }
        let profile = self.upstream_profile(&existing.openid).await?;
        self.refresh_profile(existing, profile).await
    }

    async fn refresh_profile(&self, existing: User, profile: Option<Profile>) -> Result<User> {
        let Some(profile) = profile else {
            return Ok(existing);
        };
        if self.policy == ProfilePolicy::PreserveOnLogin {
            return Ok(existing);
        }

        let update = UpdateUserRequest {
            nickname: profile.nickname.filter(|name| *name != existing.nickname),
            avatar_url: profile.avatar_url.filter(|url| *url != existing.avatar_url),
        };
        if update.nickname.is_none() && update.avatar_url.is_none() {
            return Ok(existing);
        }

        tracing::debug!("Refreshing profile for {}", existing.openid);
        self.store.update_user(&existing.openid, update).await
    }
}
