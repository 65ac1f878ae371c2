use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keys::KeyStore;
use super::{IdentityError, endpoint};
use crate::config::IdentityConfig;

/// Identity asserted by an ID token that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub auth_time: i64,
}

/// Why a token did not verify. Only used for logging; callers treat all of
/// these the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotVerifiedReason {
    Malformed,
    UnknownKey,
    Expired,
    InvalidClaims,
    Revoked,
    UserDisabled,
    UserNotFound,
}

/// Outcome of a verification that reached a verdict.
///
/// Token problems are a `NotVerified` verdict, not an error: the gate falls
/// through to the refresh path on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(VerifiedIdentity),
    NotVerified(NotVerifiedReason),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify an ID token.
    ///
    /// `Err` is reserved for failures to reach a verdict (provider unreachable,
    /// signing keys unavailable).
    async fn verify(&self, token: &str) -> Result<Verification, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: i64,
    auth_time: i64,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    disabled: bool,
    /// Seconds since epoch, sent as a string.
    #[serde(default)]
    valid_since: Option<String>,
}

const MAX_UID_LEN: usize = 128;

/// Verifies Firebase ID tokens.
///
/// - RS256 signature against the provider's published keys
/// - `iss` / `aud` bound to the project, `exp` with leeway
/// - `sub` non-empty, `iat` / `auth_time` not in the future
/// - optionally: revocation via `accounts:lookup` (disabled user, `validSince`)
pub struct FirebaseTokenVerifier {
    http: reqwest::Client,
    config: Arc<IdentityConfig>,
    keys: KeyStore,
    validation: Validation,
}

impl std::fmt::Debug for FirebaseTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseTokenVerifier")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .finish()
    }
}

impl FirebaseTokenVerifier {
    pub fn new(http: reqwest::Client, config: Arc<IdentityConfig>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            config.project_id
        )]);
        validation.set_audience(&[config.project_id.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = config.leeway_seconds;

        let keys = KeyStore::new(http.clone(), config.jwks_url.clone());

        Self {
            http,
            config,
            keys,
            validation,
        }
    }

    async fn check_revocation(
        &self,
        token: &str,
        identity: &VerifiedIdentity,
    ) -> Result<Option<NotVerifiedReason>, IdentityError> {
        let url = endpoint(
            &self.config.identitytoolkit_base_url,
            "v1/accounts:lookup",
            &self.config.api_key,
        )?;

        let res = self
            .http
            .post(url)
            .json(&LookupRequest { id_token: token })
            .send()
            .await?;

        // The lookup endpoint refuses tokens of deleted users and tokens
        // issued before a forced sign-out.
        if !res.status().is_success() {
            debug!(status = %res.status(), "account lookup refused the token");
            return Ok(Some(NotVerifiedReason::Revoked));
        }

        let body: LookupResponse = res.json().await?;
        let Some(user) = body.users.into_iter().find(|u| u.local_id == identity.uid) else {
            return Ok(Some(NotVerifiedReason::UserNotFound));
        };

        if user.disabled {
            return Ok(Some(NotVerifiedReason::UserDisabled));
        }

        let valid_since = user
            .valid_since
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok());
        if let Some(valid_since) = valid_since
            && identity.auth_time < valid_since
        {
            return Ok(Some(NotVerifiedReason::Revoked));
        }

        Ok(None)
    }

    fn check_claims(&self, claims: &IdTokenClaims) -> bool {
        let now = chrono::Utc::now().timestamp();
        let leeway = i64::try_from(self.config.leeway_seconds).unwrap_or(i64::MAX);
        let latest = now.saturating_add(leeway);

        !claims.sub.trim().is_empty()
            && claims.sub.len() <= MAX_UID_LEN
            && claims.iat <= latest
            && claims.auth_time <= latest
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Verification, IdentityError> {
        let Ok(header) = jsonwebtoken::decode_header(token) else {
            return Ok(Verification::NotVerified(NotVerifiedReason::Malformed));
        };
        if header.alg != Algorithm::RS256 {
            return Ok(Verification::NotVerified(NotVerifiedReason::Malformed));
        }
        let Some(kid) = header.kid else {
            return Ok(Verification::NotVerified(NotVerifiedReason::Malformed));
        };

        let Some(key) = self.keys.decoding_key(&kid).await? else {
            debug!(kid = %kid, "id token signed with an unknown key");
            return Ok(Verification::NotVerified(NotVerifiedReason::UnknownKey));
        };

        let claims = match jsonwebtoken::decode::<IdTokenClaims>(token, &key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => NotVerifiedReason::Expired,
                    ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                        NotVerifiedReason::Malformed
                    }
                    _ => NotVerifiedReason::InvalidClaims,
                };
                return Ok(Verification::NotVerified(reason));
            }
        };

        if !self.check_claims(&claims) {
            return Ok(Verification::NotVerified(NotVerifiedReason::InvalidClaims));
        }

        let identity = VerifiedIdentity {
            uid: claims.sub,
            email: claims.email,
            auth_time: claims.auth_time,
        };

        if self.config.check_revoked
            && let Some(reason) = self.check_revocation(token, &identity).await?
        {
            return Ok(Verification::NotVerified(reason));
        }

        Ok(Verification::Verified(identity))
    }
}
