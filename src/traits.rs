//! Capability traits for RPC integration points
// (c) 2024 Ross Younger
//
// Integration code consumes these capability sets rather than any concrete
// QUIC type, so nothing downstream of the adapter needs to know what the
// transport is.

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::TransportError;

/// One established, ordered, bidirectional byte channel with known endpoints.
///
/// Reading, writing and shutdown come from the tokio I/O supertraits; this
/// trait adds the addressing every transport connection is expected to answer.
pub trait StreamConnection: AsyncRead + AsyncWrite + Send + Unpin {
    /// The address of this end of the connection
    fn local_addr(&self) -> SocketAddr;
    /// The address of the peer
    fn remote_addr(&self) -> SocketAddr;
}

/// A source of established connections for a server loop.
pub trait StreamListener {
    /// The connection type produced
    type Conn: StreamConnection;

    /// Waits for the next fully-established connection
    fn accept(&self) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;

    /// The local address connections arrive at
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;

    /// Stops producing connections; connections already handed out are
    /// unaffected
    fn close(&self);
}
