use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{IdentityError, endpoint, ensure_success};
use crate::config::IdentityConfig;

/// A freshly minted ID token obtained with a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub id_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub expires_in: u64,
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange a refresh token for a new ID token.
    ///
    /// A refusal by the provider is `IdentityError::Rejected`. Never retried.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, IdentityError>;
}

// Secure Token API response (snake_case, numbers as strings)
#[derive(Debug, Deserialize)]
struct SecureTokenResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// `POST /v1/token?key=<API_KEY>` with `grant_type=refresh_token`.
#[derive(Clone)]
pub struct SecureTokenRefresher {
    http: reqwest::Client,
    config: Arc<IdentityConfig>,
}

impl std::fmt::Debug for SecureTokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTokenRefresher")
            .field("base_url", &self.config.securetoken_base_url.as_str())
            .finish()
    }
}

impl SecureTokenRefresher {
    pub fn new(http: reqwest::Client, config: Arc<IdentityConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl TokenRefresher for SecureTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, IdentityError> {
        let url = endpoint(
            &self.config.securetoken_base_url,
            "v1/token",
            &self.config.api_key,
        )?;

        let res = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let body: SecureTokenResponse = ensure_success(res)?.json().await?;
        if body.id_token.trim().is_empty() {
            return Err(IdentityError::UnexpectedResponse(
                "token response without id_token".to_string(),
            ));
        }

        Ok(RefreshedToken {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.user_id,
            expires_in: body
                .expires_in
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        })
    }
}
