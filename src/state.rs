/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: verifier / refresher / sign_in (Identity Platform クライアント)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - request-scoped な値はここに置かない (extensions を使う)
 */
use std::sync::Arc;

use crate::services::identity::{
    IdentityServices, PasswordSignIn, TokenRefresher, TokenVerifier,
};

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub refresher: Arc<dyn TokenRefresher>,
    pub sign_in: Arc<dyn PasswordSignIn>,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        refresher: Arc<dyn TokenRefresher>,
        sign_in: Arc<dyn PasswordSignIn>,
    ) -> Self {
        Self {
            verifier,
            refresher,
            sign_in,
        }
    }
}

impl From<IdentityServices> for AppState {
    fn from(services: IdentityServices) -> Self {
        Self::new(services.verifier, services.refresher, services.sign_in)
    }
}
