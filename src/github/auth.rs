//! GitHub App credentials.
//!
//! An installation access token is obtained in three steps: sign a short
//! lived RS256 assertion with the app's private key, find the installation
//! belonging to the configured account, and exchange the assertion for an
//! installation token. Tokens are cached for [`TOKEN_FRESHNESS_SECS`].

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{error, info};

use crate::error::CredentialError;
use crate::github::client::GitHubClient;

/// How long a minted installation token is reused, in seconds.
pub const TOKEN_FRESHNESS_SECS: i64 = 300;

const JWT_IAT_DRIFT: i64 = 60;
const JWT_EXP_DELTA: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(app_id: u64, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp() - JWT_IAT_DRIFT;
        Self {
            iat,
            exp: iat + JWT_EXP_DELTA,
            iss: app_id.to_string(),
        }
    }
}

/// Signs the app assertion. The three segments are base64url without padding.
pub fn sign_app_jwt(
    app_id: u64,
    key: &EncodingKey,
    now: DateTime<Utc>,
) -> Result<String, CredentialError> {
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &Claims::new(app_id, now), key)
        .map_err(|e| CredentialError::Signing(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
}

impl CredentialToken {
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.issued_at < window
    }
}

/// Holds the current installation token.
///
/// Readers clone the token out; a refresh swaps the whole value under the
/// write lock, so nobody sees a half-built token. Concurrent stale readers may
/// each mint, the last store wins.
pub struct TokenCache {
    current: RwLock<Option<CredentialToken>>,
    freshness: Duration,
}

impl TokenCache {
    pub fn new(freshness: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            freshness,
        }
    }

    pub fn fresh(&self, now: DateTime<Utc>) -> Option<CredentialToken> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        current
            .as_ref()
            .filter(|token| token.is_fresh(now, self.freshness))
            .cloned()
    }

    pub fn store(&self, token: CredentialToken) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(token);
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(Duration::seconds(TOKEN_FRESHNESS_SECS))
    }
}

pub struct GitHubApp {
    login: String,
    app_id: u64,
    key: EncodingKey,
    api: GitHubClient,
    cache: TokenCache,
}

impl GitHubApp {
    pub fn new(
        api_url: &str,
        login: impl Into<String>,
        app_id: u64,
        private_key_pem: &str,
    ) -> Result<Self, CredentialError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

        Ok(Self {
            login: login.into(),
            app_id,
            key,
            api: GitHubClient::new(api_url, None),
            cache: TokenCache::default(),
        })
    }

    pub fn with_freshness(mut self, window: Duration) -> Self {
        self.cache = TokenCache::new(window);
        self
    }

    /// Current installation token, minting a new one when the cached token
    /// is missing or stale.
    pub async fn get_token(&self) -> Result<CredentialToken, CredentialError> {
        if let Some(token) = self.cache.fresh(Utc::now()) {
            return Ok(token);
        }

        let issued_at = Utc::now();
        let value = self.request_access_token().await?;
        let token = CredentialToken { value, issued_at };
        self.cache.store(token.clone());
        Ok(token)
    }

    /// API client authenticated as the installation.
    pub async fn client(&self) -> Result<GitHubClient, CredentialError> {
        let token = self.get_token().await?;
        Ok(self.api.with_token(token.value))
    }

    /// Mints a fresh installation token, bypassing the cache.
    pub async fn request_access_token(&self) -> Result<String, CredentialError> {
        let jwt = sign_app_jwt(self.app_id, &self.key, Utc::now())?;
        let app_client = self.api.with_token(jwt);

        info!(
            "Searching for the installation of app {} on account {}",
            self.app_id, self.login
        );
        let installations = app_client.app_installations().await?;
        let installation = installations
            .iter()
            .find(|item| item.account.login == self.login && item.app_id == self.app_id)
            .ok_or_else(|| {
                error!(
                    "Installation not found for {} and {}, this is case sensitive!",
                    self.login, self.app_id
                );
                CredentialError::InstallationNotFound {
                    login: self.login.clone(),
                    app_id: self.app_id,
                }
            })?;

        let access = app_client
            .create_installation_access_token(installation.id)
            .await?;
        Ok(access.token)
    }
}
