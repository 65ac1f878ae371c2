/*
 * Responsibility
 * - /auth 系 handler (login / logout / authentication)
 * - login: Identity Platform で email/password を検証し、ID token を Authorization header に、
 *   refresh token を HttpOnly cookie に載せる
 * - authentication: gate 通過済みの AuthCtx をそのまま返す
 */
use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};

use crate::{
    api::v1::{
        dto::auth::{AccountResponse, LoginRequest, SessionResponse},
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    middleware::auth::gate::REFRESH_TOKEN_COOKIE,
    services::identity::IdentityError,
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("INVALID_REQUEST", msg))?;

    let signed_in = match state.sign_in.sign_in(req.email.trim(), &req.password).await {
        Ok(v) => v,
        Err(IdentityError::Rejected { status }) => {
            warn!(status, "password sign-in rejected");
            return Err(AppError::bad_request(
                "LOGIN_FAILED",
                "sign-in failed, please check your email and password",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let authorization = HeaderValue::from_str(&format!("Bearer {}", signed_in.id_token))
        .map_err(|_| AppError::Internal)?;

    info!(uid = %signed_in.local_id, "signed in");

    let jar = jar.add(refresh_cookie(signed_in.refresh_token));
    let body = AccountResponse {
        id: signed_in.local_id,
        email: signed_in.email,
        display_name: signed_in.display_name,
        registered: signed_in.registered,
    };

    Ok(([(header::AUTHORIZATION, authorization)], jar, Json(body)).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    // 削除用 cookie も発行時と同じ属性でないとブラウザが受け付けない
    let removal = Cookie::build(REFRESH_TOKEN_COOKIE)
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true);

    (jar.remove(removal), StatusCode::NO_CONTENT)
}

pub async fn authentication(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<SessionResponse> {
    Json(SessionResponse {
        uid: ctx.uid,
        email: ctx.email,
        refreshed: ctx.refreshed,
    })
}

fn refresh_cookie(value: String) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::None)
        .secure(true)
        .build()
}
