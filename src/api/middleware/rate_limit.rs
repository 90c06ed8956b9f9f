//! Rate limiting middleware using token bucket algorithm.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// One token every 10ms per client.
const REPLENISH_INTERVAL_MS: u64 = 10;
const BURST_SIZE: u32 = 200;

/// Creates a rate limiter for the click endpoint.
///
/// # Limits
///
/// - **Rate**: 100 requests per second
/// - **Burst**: 200 requests
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Key Extraction
///
/// Rate limits are applied per client IP address extracted from the
/// socket peer address.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/ads/click", post(click_handler))
///     .layer(rate_limit::layer());
/// ```
pub fn layer() -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>
{
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(REPLENISH_INTERVAL_MS)
            .burst_size(BURST_SIZE)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(governor_conf)
}

/// Same limits as [`layer`], keyed by the forwarded client address.
///
/// Reads `X-Forwarded-For`, `X-Real-IP` and `Forwarded` before falling back
/// to the peer address. Use only behind a trusted reverse proxy.
pub fn proxy_layer()
-> GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_millisecond(REPLENISH_INTERVAL_MS)
            .burst_size(BURST_SIZE)
            .finish()
            .unwrap(),
    );

    GovernorLayer::new(governor_conf)
}
