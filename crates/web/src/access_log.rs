//! Request access logging
//!
//! One `info` event per request on the `netbeacon::access` target, carrying
//! the caller's address, forwarding header and user agent. Handy for seeing
//! which backend a load balancer picked.

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Header value as UTF-8, if present and valid.
pub fn header_str(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let forwarded_for = header_str(req.headers(), X_FORWARDED_FOR);
    let user_agent = header_str(req.headers(), header::USER_AGENT);

    let started = Instant::now();
    let response = next.run(req).await;

    info!(
        target: "netbeacon::access",
        %method,
        %path,
        status = response.status().as_u16(),
        client = client.as_deref().unwrap_or("-"),
        xff = forwarded_for.as_deref().unwrap_or("-"),
        user_agent = user_agent.as_deref().unwrap_or("-"),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    response
}
