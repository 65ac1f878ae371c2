//! Echo the inbound `Authorization` header onto the response.
//!
//! Applies to every route. The gate overwrites the value on protected routes;
//! elsewhere the client gets back whatever it sent, so a client-side
//! interceptor can keep persisting it.

use axum::{
    Router,
    body::Body,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

pub fn apply(router: Router) -> Router {
    router.layer(middleware::from_fn(mirror_authorization))
}

async fn mirror_authorization(req: Request<Body>, next: Next) -> Response {
    let inbound = req.headers().get(header::AUTHORIZATION).cloned();

    let mut res = next.run(req).await;

    if let Some(value) = inbound
        && !res.headers().contains_key(header::AUTHORIZATION)
    {
        res.headers_mut().insert(header::AUTHORIZATION, value);
    }

    res
}
