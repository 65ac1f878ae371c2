//! Shared fixtures: in-process identity provider fakes and request helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use archive_api::config::Config;
use archive_api::services::identity::{
    IdentityError, NotVerifiedReason, PasswordSignIn, RefreshedToken, SignedIn, TokenRefresher,
    TokenVerifier, Verification, VerifiedIdentity,
};
use archive_api::state::AppState;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const VALID_TOKEN: &str = "valid.id.token";
pub const EXPIRED_TOKEN: &str = "expired.id.token";
pub const KEYS_DOWN_TOKEN: &str = "keys-down.id.token";
pub const VALID_REFRESH: &str = "valid-refresh-token";
pub const REVOKED_REFRESH: &str = "revoked-refresh-token";
pub const BROKEN_REFRESH: &str = "provider-unreachable";
pub const NEW_TOKEN: &str = "fresh.id.token";
pub const UID: &str = "user-1";

/// Accepts exactly `VALID_TOKEN`; cannot reach a verdict for `KEYS_DOWN_TOKEN`.
#[derive(Default)]
pub struct FakeVerifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<Verification, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if token == KEYS_DOWN_TOKEN {
            return Err(IdentityError::Keys("key endpoint answered 503".to_string()));
        }
        if token == VALID_TOKEN {
            Ok(Verification::Verified(VerifiedIdentity {
                uid: UID.to_string(),
                email: Some("user@example.com".to_string()),
                auth_time: 1_700_000_000,
            }))
        } else {
            Ok(Verification::NotVerified(NotVerifiedReason::Expired))
        }
    }
}

/// Exchanges `VALID_REFRESH` for `NEW_TOKEN`, rejects everything else with 400,
/// and fails at the transport level for `BROKEN_REFRESH`.
#[derive(Default)]
pub struct FakeRefresher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match refresh_token {
            VALID_REFRESH => Ok(RefreshedToken {
                id_token: NEW_TOKEN.to_string(),
                refresh_token: VALID_REFRESH.to_string(),
                user_id: UID.to_string(),
                expires_in: 3600,
            }),
            BROKEN_REFRESH => Err(IdentityError::Endpoint("connection refused".to_string())),
            _ => Err(IdentityError::Rejected { status: 400 }),
        }
    }
}

/// Accepts `user@example.com` / `correct-horse`.
#[derive(Default)]
pub struct FakeSignIn {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PasswordSignIn for FakeSignIn {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if email == "user@example.com" && password == "correct-horse" {
            Ok(SignedIn {
                local_id: UID.to_string(),
                email: email.to_string(),
                display_name: None,
                id_token: VALID_TOKEN.to_string(),
                refresh_token: VALID_REFRESH.to_string(),
                expires_in: 3600,
                registered: true,
            })
        } else {
            Err(IdentityError::Rejected { status: 400 })
        }
    }
}

pub struct Fakes {
    pub verifier: Arc<FakeVerifier>,
    pub refresher: Arc<FakeRefresher>,
    pub sign_in: Arc<FakeSignIn>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            verifier: Arc::new(FakeVerifier::default()),
            refresher: Arc::new(FakeRefresher::default()),
            sign_in: Arc::new(FakeSignIn::default()),
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.verifier.clone(),
            self.refresher.clone(),
            self.sign_in.clone(),
        )
    }

    pub fn verify_calls(&self) -> usize {
        self.verifier.calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresher.calls.load(Ordering::SeqCst)
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in.calls.load(Ordering::SeqCst)
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "IDENTITY_API_KEY" => Some("test-api-key".to_string()),
        "FIREBASE_PROJECT_ID" => Some("keyo-archive".to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Send a GET with optional bearer token and refresh cookie.
pub async fn get_with(
    app: Router,
    uri: &str,
    bearer: Option<&str>,
    refresh_cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(cookie) = refresh_cookie {
        builder = builder.header(header::COOKIE, format!("refreshToken={cookie}"));
    }

    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn authorization(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap().to_string())
}
