//! Identity Platform (Firebase Auth) client side.
//!
//! - `verifier`: ID token verification (signature, claims, revocation)
//! - `refresher`: refresh token -> new ID token (Secure Token API)
//! - `sign_in`: email/password sign-in (Identity Toolkit API)
//! - `keys`: public signing keys cache used by the verifier
use reqwest::Response;
use thiserror::Error;
use url::Url;

pub mod factory;
pub mod keys;
pub mod refresher;
pub mod sign_in;
pub mod verifier;

pub use factory::{IdentityServices, build_identity_services};
pub use refresher::{RefreshedToken, SecureTokenRefresher, TokenRefresher};
pub use sign_in::{PasswordSignIn, PasswordSignInClient, SignedIn};
pub use verifier::{
    FirebaseTokenVerifier, NotVerifiedReason, TokenVerifier, Verification, VerifiedIdentity,
};

/// Errors talking to the identity provider.
///
/// `Rejected` is the only variant that describes the credential itself; every
/// other variant is an infrastructure failure.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider rejected the request (status {status})")]
    Rejected { status: u16 },
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not load identity provider signing keys: {0}")]
    Keys(String),
    #[error("invalid identity provider endpoint: {0}")]
    Endpoint(String),
    #[error("unexpected identity provider response: {0}")]
    UnexpectedResponse(String),
}

/// Append `path` to `base` and attach the Web API key as `?key=`.
///
/// `base` may carry a path prefix (the Auth emulator serves
/// `http://host:9099/securetoken.googleapis.com/...`).
pub(crate) fn endpoint(base: &Url, path: &str, api_key: &str) -> Result<Url, IdentityError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| IdentityError::Endpoint(base.to_string()))?
        .pop_if_empty()
        .extend(path.split('/'));
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Non-2xx -> `Rejected`. The error body is not inspected.
pub(crate) fn ensure_success(res: Response) -> Result<Response, IdentityError> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        Err(IdentityError::Rejected {
            status: status.as_u16(),
        })
    }
}
