//! HTTP request/response tracing middleware.

use axum::body::Body;
use axum::http::Request;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};
use uuid::Uuid;

type MakeRequestSpan = fn(&Request<Body>) -> Span;

/// Opens one `INFO` span per request carrying a fresh `request_id`.
///
/// Pipeline logs emitted while handling a click (fallback warnings, breaker
/// transitions) nest under it.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %Uuid::new_v4(),
    )
}

/// Creates a tracing middleware for HTTP requests.
///
/// Responses are logged at `INFO` with status and latency in milliseconds;
/// 5xx responses additionally at `ERROR`.
///
/// ```text
/// INFO request{method=POST path=/ads/click request_id=5b1f...}: finished processing request latency=3 ms status=202
/// ```
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeRequestSpan> {
    TraceLayer::new_for_http()
        .make_span_with(request_span as MakeRequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}
