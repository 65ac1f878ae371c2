/// Factory: build the identity provider clients from application `Config`.
use std::sync::Arc;

use super::{
    FirebaseTokenVerifier, IdentityError, PasswordSignIn, PasswordSignInClient,
    SecureTokenRefresher, TokenRefresher, TokenVerifier,
};
use crate::config::IdentityConfig;

/// The provider-facing services, built once at bootstrap and shared via `AppState`.
#[derive(Clone)]
pub struct IdentityServices {
    pub verifier: Arc<dyn TokenVerifier>,
    pub refresher: Arc<dyn TokenRefresher>,
    pub sign_in: Arc<dyn PasswordSignIn>,
}

pub fn build_identity_services(config: &IdentityConfig) -> Result<IdentityServices, IdentityError> {
    // One connection pool for every provider endpoint.
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let config = Arc::new(config.clone());

    Ok(IdentityServices {
        verifier: Arc::new(FirebaseTokenVerifier::new(http.clone(), config.clone())),
        refresher: Arc::new(SecureTokenRefresher::new(http.clone(), config.clone())),
        sign_in: Arc::new(PasswordSignInClient::new(http, config)),
    })
}
