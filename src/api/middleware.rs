//! Admission middleware
//!
//! Runs the rate limiter in front of every routed handler.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::AppState;
use crate::limiter::Decision;

/// Identity used when neither the socket nor a proxy header names the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Admits or rejects a request against its route's policy.
///
/// Must be installed with `route_layer` so the matched route pattern
/// (e.g. `/cache/:key`) is available; limits apply per pattern, not per
/// concrete path.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().as_str().to_string();
    let identity = client_identity(&req);

    let policy = state.policies.resolve(&method, &route).copied();
    match state
        .limiter
        .admit(&identity, &method, &route, policy.as_ref())
        .await
    {
        Decision::Allowed => next.run(req).await,
        Decision::Rejected(rejection) => rejection.into_response(),
    }
}

/// Client network identity: the peer address, else the first
/// `X-Forwarded-For` hop, else [`UNKNOWN_CLIENT`].
pub fn client_identity(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
