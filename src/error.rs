//! Error taxonomy for the adapter
// (c) 2024 Ross Younger

use std::io;

use quinn::crypto::rustls::NoInitialCipherSuite;
use quinn::rustls;

/// Everything that can go wrong while establishing, using or tearing down a connection.
///
/// Failures from the underlying transport and TLS stacks are wrapped, never rewritten;
/// match on the variant, or use [`is_timeout`](TransportError::is_timeout) /
/// [`is_closed`](TransportError::is_closed) where only the classification matters.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The dial target could not be parsed
    #[error("invalid target address `{target}`: {reason}")]
    InvalidTarget {
        /// The string as given to [`dial`](crate::dial)
        target: String,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Name resolution failed, or returned no address of the requested family
    #[error("name resolution for `{host}` failed")]
    NameResolution {
        /// The host part of the dial target
        host: String,
        #[source]
        source: io::Error,
    },

    /// The session could not be set up (local configuration or addressing problem)
    #[error("session setup: {0}")]
    Connect(#[from] quinn::ConnectError),

    /// The session failed, was refused, or was closed by either endpoint
    #[error("session: {0}")]
    Session(#[from] quinn::ConnectionError),

    /// TLS configuration or certificate material was rejected
    #[error("TLS: {0}")]
    Tls(#[from] rustls::Error),

    /// The TLS configuration carries no TLS 1.3 cipher suite, which QUIC requires
    #[error("TLS configuration unusable for QUIC: {0}")]
    InitialCipherSuite(#[from] NoInitialCipherSuite),

    /// A client certificate verifier could not be built
    #[error("client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    /// Certificate generation failed
    #[error("certificate generation: {0}")]
    CertificateGeneration(#[from] rcgen::Error),

    /// PEM material could not be read or decoded
    #[error("certificate material: {0}")]
    Pem(#[from] rustls_pki_types::pem::Error),

    /// A blocking operation ran out of time
    #[error("{operation} deadline expired")]
    DeadlineExpired {
        /// Which adapter operation was bounded by the deadline
        operation: &'static str,
    },

    /// The listener has been closed; no further connections will be produced
    #[error("listener closed")]
    ListenerClosed,

    /// An environment-supplied log filter did not parse
    #[error("tracing filter from {var}: {source}")]
    LogFilter {
        /// Name of the offending environment variable
        var: &'static str,
        #[source]
        source: tracing_subscriber::filter::FromEnvError,
    },

    /// No async runtime was found to drive the endpoint
    #[error("no compatible async runtime found")]
    NoRuntime,

    /// Socket or file I/O failure
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TransportError {
    /// True if this failure was caused by a deadline or idle timer expiring.
    /// The operation may be retried with a fresh deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::DeadlineExpired { .. } => true,
            Self::Session(quinn::ConnectionError::TimedOut) => true,
            Self::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// True if this failure means the underlying resource is gone for good:
    /// the session was closed (by either side) or the listener shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::ListenerClosed => true,
            Self::Session(
                quinn::ConnectionError::ApplicationClosed { .. }
                | quinn::ConnectionError::ConnectionClosed { .. }
                | quinn::ConnectionError::LocallyClosed,
            ) => true,
            _ => false,
        }
    }
}

impl From<TransportError> for io::Error {
    /// Lossy conversion for integration points that traffic in `io::Error`.
    /// The original error is preserved as the source.
    fn from(e: TransportError) -> Self {
        let kind = if e.is_timeout() {
            io::ErrorKind::TimedOut
        } else if e.is_closed() {
            io::ErrorKind::NotConnected
        } else {
            io::ErrorKind::Other
        };
        io::Error::new(kind, e)
    }
}
