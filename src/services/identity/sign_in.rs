use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{IdentityError, endpoint, ensure_success};
use crate::config::IdentityConfig;

/// Tokens and account summary returned by a password sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub local_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub registered: bool,
}

#[async_trait]
pub trait PasswordSignIn: Send + Sync {
    /// Wrong email/password is `IdentityError::Rejected`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    registered: bool,
}

/// `POST /v1/accounts:signInWithPassword?key=<API_KEY>`
#[derive(Clone)]
pub struct PasswordSignInClient {
    http: reqwest::Client,
    config: Arc<IdentityConfig>,
}

impl std::fmt::Debug for PasswordSignInClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordSignInClient")
            .field("base_url", &self.config.identitytoolkit_base_url.as_str())
            .finish()
    }
}

impl PasswordSignInClient {
    pub fn new(http: reqwest::Client, config: Arc<IdentityConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl PasswordSignIn for PasswordSignInClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let url = endpoint(
            &self.config.identitytoolkit_base_url,
            "v1/accounts:signInWithPassword",
            &self.config.api_key,
        )?;

        let res = self
            .http
            .post(url)
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let body: SignInResponse = ensure_success(res)?.json().await?;

        Ok(SignedIn {
            local_id: body.local_id,
            email: body.email,
            display_name: body.display_name.filter(|n| !n.is_empty()),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in: body
                .expires_in
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            registered: body.registered,
        })
    }
}
