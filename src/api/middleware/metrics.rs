//! HTTP request metrics.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::infrastructure::telemetry;

/// Records `http_requests_total` and `http_request_duration_seconds`.
///
/// Labels use the matched route template (`/ads/click`) rather than the raw
/// path, so query strings and unknown paths do not explode cardinality.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().clone();

    let response = next.run(req).await;

    telemetry::record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}
