/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - gate が必要な範囲 (protected) をここで決める
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    auth::{authentication, login, logout},
    health::health,
};
use crate::middleware::auth::gate;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new().route("/auth/authentication", get(authentication));
    let protected = gate::apply(protected, state);

    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .merge(protected)
}
