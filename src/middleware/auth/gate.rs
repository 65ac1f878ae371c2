//! ID token 検証 (+ 必要なら refresh) → Authorization を書き戻し、AuthCtx を extensions に入れる
//!
//! Flow:
//! 1. `Authorization: Bearer <idToken>` も `refreshToken` cookie も無い → 401
//! 2. ID token があれば verify (revocation check 込み)。失敗も verify 自体の error も「未検証」扱い
//! 3. 未検証なら refresh token で ID token を取り直す。provider が拒否したら 400 (retry しない)
//! 4. 手元の token を `Bearer <token>` として request / response 両方の Authorization に載せる

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, info, warn};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::identity::{IdentityError, TokenRefresher, TokenVerifier, Verification};
use crate::state::AppState;

/// Cookie that carries the long-lived refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const BEARER_PREFIX: &str = "Bearer ";

/// 保護したい route 群に gate を掛ける。
///
/// `route_layer` なので、マッチしなかったパスは 401 ではなく 404 のまま。
///
/// 例：
/// ```ignore
/// let protected = Router::new().route("/auth/authentication", get(authentication));
/// let protected = middleware::auth::gate::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, authentication_gate))
}

/// Token that passed the gate, plus what we know about its subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePass {
    pub id_token: String,
    pub ctx: AuthCtx,
}

async fn authentication_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = bearer_token(req.headers()).map(str::to_owned);
    let refresh_token = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_owned());

    let pass = resolve(
        state.verifier.as_ref(),
        state.refresher.as_ref(),
        bearer.as_deref(),
        refresh_token.as_deref(),
    )
    .await?;

    let authorization =
        HeaderValue::from_str(&format!("{BEARER_PREFIX}{}", pass.id_token)).map_err(|_| {
            warn!("identity provider returned a token that is not a valid header value");
            AppError::Internal
        })?;

    // handler 側 (と後続の middleware) が確定した token を見られるように request を書き換える
    req.headers_mut()
        .insert(header::AUTHORIZATION, authorization.clone());
    req.extensions_mut().insert(pass.ctx);

    let mut res = next.run(req).await;
    // client が次のリクエストで使えるように response にも載せる
    res.headers_mut().insert(header::AUTHORIZATION, authorization);

    Ok(res)
}

/// Decide pass / fail / refresh for one request.
///
/// Holds no state between calls: the same inputs against the same provider
/// answers give the same outcome.
pub async fn resolve(
    verifier: &dyn TokenVerifier,
    refresher: &dyn TokenRefresher,
    bearer: Option<&str>,
    refresh_token: Option<&str>,
) -> Result<GatePass, AppError> {
    if bearer.is_none() && refresh_token.is_none() {
        debug!("no credentials on request");
        return Err(AppError::Unauthenticated);
    }

    if let Some(token) = bearer {
        match verifier.verify(token).await {
            Ok(Verification::Verified(identity)) => {
                debug!(uid = %identity.uid, "id token verified");
                return Ok(GatePass {
                    id_token: token.to_owned(),
                    ctx: AuthCtx::verified(identity),
                });
            }
            Ok(Verification::NotVerified(reason)) => {
                debug!(?reason, "id token not verified, trying refresh token");
            }
            // no verdict (keys or lookup unavailable) counts as not verified
            Err(e) => {
                warn!(error = %e, "id token verification failed, trying refresh token");
            }
        }
    }

    // A presented token failed and there is nothing to exchange: same answer as a refused exchange.
    let Some(refresh_token) = refresh_token else {
        warn!("id token not verified and no refresh token cookie");
        return Err(AppError::InvalidRefreshCredential);
    };

    match refresher.refresh(refresh_token).await {
        Ok(refreshed) => {
            info!(uid = %refreshed.user_id, "id token refreshed");
            Ok(GatePass {
                id_token: refreshed.id_token,
                ctx: AuthCtx::refreshed(refreshed.user_id),
            })
        }
        Err(IdentityError::Rejected { status }) => {
            warn!(status, "refresh token rejected by identity provider");
            Err(AppError::InvalidRefreshCredential)
        }
        Err(e) => Err(e.into()),
    }
}

/// `Authorization: Bearer <token>` の token 部分。prefix が無い/空なら None。
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
