//! Authentication gate behavior, driven through a probe route.
//!
//! The probe handler echoes the `Authorization` header it received so each test
//! can compare what the handler saw with what the client got back.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use archive_api::api::v1::extractors::AuthCtxExtractor;
use archive_api::middleware::auth::gate;
use archive_api::state::AppState;
use axum::{
    Extension, Json, Router,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use serde_json::{Value, json};

use common::*;

async fn probe(
    Extension(hits): Extension<Arc<AtomicUsize>>,
    headers: HeaderMap,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "authorization": headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
        "uid": ctx.uid,
        "refreshed": ctx.refreshed,
    }))
}

fn probe_app(state: AppState, hits: Arc<AtomicUsize>) -> Router {
    let protected = Router::new().route("/probe", get(probe));
    gate::apply(protected, state.clone())
        .with_state(state)
        .layer(Extension(hits))
}

struct Harness {
    fakes: Fakes,
    hits: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self {
            fakes: Fakes::new(),
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn app(&self) -> Router {
        probe_app(self.fakes.state(), self.hits.clone())
    }

    fn handler_hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn no_credentials_is_401_and_handler_not_called() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", None, None).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    assert_eq!(h.handler_hits(), 0);
    assert_eq!(h.fakes.verify_calls(), 0);
    assert_eq!(h.fakes.refresh_calls(), 0);
}

#[tokio::test]
async fn valid_token_passes_unchanged() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(VALID_TOKEN), None).await;

    assert_eq!(res.status(), StatusCode::OK);
    let expected = format!("Bearer {VALID_TOKEN}");
    assert_eq!(authorization(&res).as_deref(), Some(expected.as_str()));

    let body = body_json(res).await;
    assert_eq!(body["authorization"], expected);
    assert_eq!(body["uid"], UID);
    assert_eq!(body["refreshed"], false);
    assert_eq!(h.handler_hits(), 1);
    assert_eq!(h.fakes.refresh_calls(), 0);
}

#[tokio::test]
async fn valid_token_does_not_touch_refresh_even_with_cookie() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(VALID_TOKEN), Some(VALID_REFRESH)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(h.fakes.refresh_calls(), 0);
    assert_eq!(
        authorization(&res),
        Some(format!("Bearer {VALID_TOKEN}"))
    );
}

#[tokio::test]
async fn expired_token_with_valid_cookie_is_refreshed() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(EXPIRED_TOKEN), Some(VALID_REFRESH)).await;

    assert_eq!(res.status(), StatusCode::OK);
    let expected = format!("Bearer {NEW_TOKEN}");
    assert_eq!(authorization(&res).as_deref(), Some(expected.as_str()));

    let body = body_json(res).await;
    assert_eq!(body["authorization"], expected);
    assert_ne!(body["authorization"], format!("Bearer {EXPIRED_TOKEN}"));
    assert_eq!(body["refreshed"], true);
    assert_eq!(h.fakes.verify_calls(), 1);
    assert_eq!(h.fakes.refresh_calls(), 1);
}

#[tokio::test]
async fn cookie_alone_takes_refresh_path() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", None, Some(VALID_REFRESH)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(authorization(&res), Some(format!("Bearer {NEW_TOKEN}")));
    assert_eq!(h.fakes.verify_calls(), 0);
    assert_eq!(h.fakes.refresh_calls(), 1);
    assert_eq!(h.handler_hits(), 1);
}

#[tokio::test]
async fn rejected_refresh_is_400_and_handler_not_called() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(EXPIRED_TOKEN), Some(REVOKED_REFRESH)).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");
    assert_eq!(h.handler_hits(), 0);
    // never retried
    assert_eq!(h.fakes.refresh_calls(), 1);
}

#[tokio::test]
async fn failing_token_without_cookie_is_400_without_provider_call() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(EXPIRED_TOKEN), None).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.handler_hits(), 0);
    assert_eq!(h.fakes.verify_calls(), 1);
    assert_eq!(h.fakes.refresh_calls(), 0);
}

#[tokio::test]
async fn provider_transport_failure_is_500() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(EXPIRED_TOKEN), Some(BROKEN_REFRESH)).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.handler_hits(), 0);
}

#[tokio::test]
async fn verifier_failure_falls_through_to_refresh() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(KEYS_DOWN_TOKEN), Some(VALID_REFRESH)).await;

    assert_eq!(res.status(), StatusCode::OK);
    let expected = format!("Bearer {NEW_TOKEN}");
    assert_eq!(authorization(&res).as_deref(), Some(expected.as_str()));
    let body = body_json(res).await;
    assert_eq!(body["authorization"], expected);
    assert_eq!(body["refreshed"], true);
    assert_eq!(h.fakes.refresh_calls(), 1);
}

#[tokio::test]
async fn verifier_failure_without_cookie_is_400() {
    let h = Harness::new();

    let res = get_with(h.app(), "/probe", Some(KEYS_DOWN_TOKEN), None).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.handler_hits(), 0);
    assert_eq!(h.fakes.refresh_calls(), 0);
}

#[tokio::test]
async fn repeated_valid_requests_have_identical_outcomes() {
    let h = Harness::new();

    let first = get_with(h.app(), "/probe", Some(VALID_TOKEN), None).await;
    let first_auth = authorization(&first);
    let first_status = first.status();
    let first_body = body_json(first).await;

    let second = get_with(h.app(), "/probe", Some(VALID_TOKEN), None).await;
    assert_eq!(second.status(), first_status);
    assert_eq!(authorization(&second), first_auth);
    assert_eq!(body_json(second).await, first_body);
    assert_eq!(h.fakes.verify_calls(), 2);
}

#[tokio::test]
async fn request_and_response_authorization_always_match() {
    let cases: [(Option<&str>, Option<&str>); 4] = [
        (Some(VALID_TOKEN), None),
        (Some(VALID_TOKEN), Some(VALID_REFRESH)),
        (Some(EXPIRED_TOKEN), Some(VALID_REFRESH)),
        (None, Some(VALID_REFRESH)),
    ];

    for (bearer, cookie) in cases {
        let h = Harness::new();
        let res = get_with(h.app(), "/probe", bearer, cookie).await;
        assert_eq!(res.status(), StatusCode::OK, "case {bearer:?} {cookie:?}");

        let response_auth = authorization(&res).expect("response Authorization");
        let body = body_json(res).await;

        assert_eq!(body["authorization"], response_auth);
        assert!(response_auth.starts_with("Bearer "));
    }
}

#[tokio::test]
async fn header_without_bearer_prefix_counts_as_absent() {
    let h = Harness::new();
    let app = h.app();

    let req = axum::http::Request::builder()
        .uri("/probe")
        .header(header::AUTHORIZATION, VALID_TOKEN)
        .body(axum::body::Body::empty())
        .unwrap();
    let res = tower::ServiceExt::oneshot(app, req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.fakes.verify_calls(), 0);
}

#[tokio::test]
async fn resolve_refreshes_when_verifier_cannot_decide() {
    let fakes = Fakes::new();

    let pass = gate::resolve(
        fakes.verifier.as_ref(),
        fakes.refresher.as_ref(),
        Some(KEYS_DOWN_TOKEN),
        Some(VALID_REFRESH),
    )
    .await
    .unwrap();

    assert_eq!(pass.id_token, NEW_TOKEN);
    assert!(pass.ctx.refreshed);
}

#[tokio::test]
async fn resolve_can_be_used_without_a_router() {
    let fakes = Fakes::new();

    let pass = gate::resolve(
        fakes.verifier.as_ref(),
        fakes.refresher.as_ref(),
        None,
        Some(VALID_REFRESH),
    )
    .await
    .unwrap();

    assert_eq!(pass.id_token, NEW_TOKEN);
    assert_eq!(pass.ctx.uid, UID);
    assert!(pass.ctx.refreshed);
}
