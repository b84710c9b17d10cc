//! QUIC sessions as single-stream connections for RPC stacks
// (c) 2024 Ross Younger
//
#![allow(clippy::doc_markdown)]
//! # Overview
//!
//! QUIC's unit of currency is a _session_ carrying any number of independent
//! _streams_. Most RPC frameworks want none of that; they are built around
//! "one reliable ordered byte-stream per logical connection" and expect to
//! dial, accept, read, write, set deadlines and close, exactly as they would
//! a TCP socket.
//!
//! This crate bridges the two models by pinning **exactly one bidirectional
//! stream of exactly one session** into a [`Connection`]:
//!
//! * [`Connection`] implements `AsyncRead` + `AsyncWrite` plus addresses and
//!   absolute I/O deadlines. Reads and writes pass straight through to the
//!   stream; close tears down stream then session.
//! * [`Listener`] accepts a session, waits for the peer's first stream on it,
//!   and only then yields a `Connection` - so an accepted connection can
//!   always carry bytes.
//! * [`dial`] opens a session and its first stream under one deadline and
//!   returns the `Connection`; [`dialer`] packages that as a cloneable
//!   closure for an RPC framework's custom-dialer extension point.
//!
//! The transport configuration caps each session at one bidirectional stream,
//! so the one-stream-per-connection contract is enforced on the wire, not
//! just in the API.
//!
//! ## Security design
//!
//! Sessions are TLS-protected by the transport. The adapter interprets none
//! of it; it only assembles the TLS context from explicit parameters
//! ([`config::ClientParams`] / [`config::ServerParams`]): an ALPN list, a
//! trust policy (CA bundle, single pinned certificate, or - for testing -
//! no verification), and an identity (certificate/key files, or a fresh
//! self-signed certificate generated in memory). The same parameters yield
//! the transport-credentials value
//! ([`config::ClientParams::tls_config`]) an RPC framework can use to keep
//! its own security negotiation consistent with the dial step.
//!
//! Configuration is threaded explicitly through every call. There is no
//! process-wide state, so concurrent dials with different configurations are
//! safe.

/// X509 certificate helpers
pub mod cert;
/// Dial-time and listen-time parameters
pub mod config;
mod connection;
mod dial;
mod error;
mod listener;
mod tls;
/// Capability traits for RPC integration points
pub mod traits;
/// QUIC transport configuration
pub mod transport;
/// Utilities
pub mod util;

pub use connection::Connection;
pub use dial::{dial, dialer};
pub use error::TransportError;
pub use listener::Listener;

#[cfg(test)]
pub(crate) mod test_support {
    //! Loopback fixtures shared by the integration-style tests

    use crate::config::{ClientParams, ServerParams, ServerVerification};
    use crate::{dial, Connection, Listener};

    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    // A QUIC stream only becomes visible to its acceptor once data flows on
    // it, so freshly dialed test connections say hello straight away.
    const GREETING: &[u8; 1] = b"Q";

    pub(crate) async fn send_greeting(conn: &mut Connection) -> anyhow::Result<()> {
        conn.write_all(GREETING).await?;
        Ok(())
    }

    pub(crate) async fn read_greeting(conn: &mut Connection) -> anyhow::Result<()> {
        let mut buf = [0u8; 1];
        conn.read_exact(&mut buf).await?;
        anyhow::ensure!(&buf == GREETING, "unexpected greeting byte {buf:?}");
        Ok(())
    }

    /// Dials `target` with certificate verification off and sends the greeting.
    pub(crate) async fn dial_and_greet(target: &str) -> anyhow::Result<Connection> {
        let params = ClientParams::new(ServerVerification::SkipVerify);
        let mut conn = dial(target, &params).await?;
        send_greeting(&mut conn).await?;
        Ok(conn)
    }

    /// Binds a loopback listener with generated credentials, dials it, and
    /// returns both ends of the resulting connection (greeting already
    /// consumed) plus the listener itself.
    pub(crate) async fn connected_pair(
    ) -> anyhow::Result<(Connection, Connection, Listener)> {
        let listener = Listener::bind("127.0.0.1:0".parse()?, &ServerParams::default())?;
        let target = format!("127.0.0.1:{}", listener.local_addr()?.port());

        let (dialed, accepted) = tokio::join!(dial_and_greet(&target), async {
            let mut conn = listener.accept().await?;
            read_greeting(&mut conn).await?;
            Ok::<_, anyhow::Error>(conn)
        });
        Ok((dialed?, accepted?, listener))
    }
}
