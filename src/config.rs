//! Dial-time and listen-time parameters
// (c) 2024 Ross Younger
//
// Security configuration is threaded explicitly through every dial and bind
// call; there is deliberately no process-wide configuration state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quinn::rustls;
use serde::{Deserialize, Serialize};

use crate::transport::PROTOCOL_KEEPALIVE;
use crate::util::AddressFamily;
use crate::TransportError;

/// ALPN identifier offered when the caller does not supply a list
pub const DEFAULT_ALPN: &str = "qrb";

/// Time allowed for session establishment plus first-stream open, unless overridden
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How an endpoint proves its identity to its peer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// X509 certificate chain and private key read from PEM files
    Files {
        /// Certificate chain file, leaf first
        cert: PathBuf,
        /// Private key file
        key: PathBuf,
    },
    /// A fresh self-signed certificate, generated in memory at dial/bind time
    #[default]
    Ephemeral,
}

/// How an outbound session verifies the server's certificate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerVerification {
    /// Trust anchors read from a PEM bundle
    CaFile(PathBuf),
    /// A single DER-encoded certificate, pinned as the only trust anchor
    /// (typically exchanged out of band)
    Pinned(Vec<u8>),
    /// Accept whatever certificate the server presents.
    ///
    /// This discards the authentication half of TLS; confidentiality against a
    /// passive observer is all that remains. Test use only.
    SkipVerify,
}

/// Whether an inbound session requires the client to prove its identity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientVerification {
    /// Do not request a client certificate
    #[default]
    None,
    /// Require a client certificate chaining to anchors read from a PEM bundle
    CaFile(PathBuf),
    /// Require a client certificate chaining to this single pinned DER-encoded
    /// certificate
    Pinned(Vec<u8>),
}

/// Parameters for outbound sessions.
///
/// One value configures any number of concurrent dials; dials with different
/// requirements use different values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientParams {
    /// ALPN protocol identifiers offered during the handshake, in preference order
    pub alpn: Vec<String>,
    /// Server certificate verification policy
    pub verification: ServerVerification,
    /// Identity presented to the server if it requests one
    pub identity: Option<IdentitySource>,
    /// Overrides the server name used for certificate verification.
    /// When unset, the host part of the dial target is used.
    pub server_name: Option<String>,
    /// Bounds session establishment plus first-stream open
    pub handshake_timeout: Duration,
    /// Restricts name resolution (and hence the local socket) to one address family
    pub address_family: AddressFamily,
    /// Keep-alive ping interval; `None` disables keep-alives
    pub keep_alive: Option<Duration>,
}

impl ClientParams {
    /// Creates parameters with the given verification policy and defaults for
    /// everything else
    #[must_use]
    pub fn new(verification: ServerVerification) -> Self {
        Self {
            alpn: vec![DEFAULT_ALPN.to_string()],
            verification,
            identity: None,
            server_name: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            address_family: AddressFamily::Any,
            keep_alive: Some(PROTOCOL_KEEPALIVE),
        }
    }

    /// The transport-credentials value for this configuration.
    ///
    /// [`dial`](crate::dial) builds its TLS context through this same function,
    /// so anything negotiating security "on top of" the raw connection (an RPC
    /// framework's credentials extension point, say) can share one source of
    /// truth with the dial step.
    pub fn tls_config(&self) -> Result<Arc<rustls::ClientConfig>, TransportError> {
        crate::tls::client_config(self)
    }
}

/// Parameters for inbound sessions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerParams {
    /// ALPN protocol identifiers accepted during the handshake, in preference order
    pub alpn: Vec<String>,
    /// Identity presented to connecting clients
    pub identity: IdentitySource,
    /// Client certificate policy
    pub client_verification: ClientVerification,
    /// Keep-alive ping interval; `None` disables keep-alives
    pub keep_alive: Option<Duration>,
}

impl Default for ServerParams {
    fn default() -> Self {
        Self {
            alpn: vec![DEFAULT_ALPN.to_string()],
            identity: IdentitySource::Ephemeral,
            client_verification: ClientVerification::None,
            keep_alive: Some(PROTOCOL_KEEPALIVE),
        }
    }
}

impl ServerParams {
    /// The TLS context a listener built from this configuration will use
    pub fn tls_config(&self) -> Result<rustls::ServerConfig, TransportError> {
        crate::tls::server_config(self)
    }
}
