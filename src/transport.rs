//! QUIC transport configuration
// (c) 2024 Ross Younger

use std::{sync::Arc, time::Duration};

use quinn::TransportConfig;

/// Default keepalive interval for QUIC sessions
pub const PROTOCOL_KEEPALIVE: Duration = Duration::from_secs(5);

/// Creates a `quinn::TransportConfig` for endpoint setup.
///
/// Every connection carries exactly one bidirectional stream, so the peer's
/// allowance is capped at one and unidirectional streams are refused outright.
pub(crate) fn create_config(keep_alive: Option<Duration>) -> Arc<TransportConfig> {
    let mut config = TransportConfig::default();
    let _ = config
        .max_concurrent_bidi_streams(1u8.into())
        .max_concurrent_uni_streams(0u8.into())
        .keep_alive_interval(keep_alive)
        .allow_spin(true);
    config.into()
}
