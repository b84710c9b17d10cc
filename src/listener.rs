//! Accepting inbound sessions and their first stream
// (c) 2024 Ross Younger

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::Stream;
use quinn::crypto::rustls::QuicServerConfig;
use quinn::EndpointConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::ServerParams;
use crate::connection::Connection;
use crate::traits::{StreamConnection, StreamListener};
use crate::util::socket;
use crate::{transport, TransportError};

/// Produces [`Connection`]s from inbound QUIC sessions.
///
/// A connection is only yielded once its peer has opened the session's first
/// bidirectional stream, so every accepted connection can carry bytes
/// immediately. Ownership of each connection passes entirely to the caller;
/// closing the listener does not disturb connections already handed out.
#[derive(Debug)]
pub struct Listener {
    endpoint: quinn::Endpoint,
    shutdown: CancellationToken,
}

impl Listener {
    /// Binds a listener on the given UDP address.
    /// Port 0 requests an ephemeral port; see [`local_addr`](Listener::local_addr).
    pub fn bind(addr: SocketAddr, params: &ServerParams) -> Result<Self, TransportError> {
        let tls_config = params.tls_config()?;
        let qsc = QuicServerConfig::try_from(tls_config)?;
        let mut config = quinn::ServerConfig::with_crypto(Arc::new(qsc));
        let _ = config.transport_config(transport::create_config(params.keep_alive));

        let socket = socket::bind(addr)?;
        let runtime = quinn::default_runtime().ok_or(TransportError::NoRuntime)?;
        let endpoint = quinn::Endpoint::new(EndpointConfig::default(), Some(config), socket, runtime)?;
        debug!("listening on {}", endpoint.local_addr()?);

        Ok(Self {
            endpoint,
            shutdown: CancellationToken::new(),
        })
    }

    /// Waits for the next connection: first the session, then the peer's first
    /// bidirectional stream on it. Whichever step fails first is the error
    /// reported; the second step is not attempted.
    ///
    /// Returns [`TransportError::ListenerClosed`] once the listener is closed.
    pub async fn accept(&self) -> Result<Connection, TransportError> {
        tokio::select! {
            () = self.shutdown.cancelled() => Err(TransportError::ListenerClosed),
            result = self.accept_inner() => result,
        }
    }

    async fn accept_inner(&self) -> Result<Connection, TransportError> {
        let incoming = self
            .endpoint
            .accept()
            .await
            .ok_or(TransportError::ListenerClosed)?;
        let session = incoming.await?;
        debug!("accepted session from {}", session.remote_address());

        // A session alone carries no bytes; wait for the peer to open its stream
        let (send, recv) = session.accept_bi().await?;
        trace!("peer opened its stream");

        Ok(Connection::new(
            self.endpoint.local_addr()?,
            session,
            send,
            recv,
        ))
    }

    /// The local address this listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Stops accepting: pending and future [`accept`](Listener::accept) calls
    /// return [`TransportError::ListenerClosed`], and new inbound handshakes
    /// are refused. Connections already handed out are unaffected.
    pub fn close(&self) {
        self.endpoint.set_server_config(None);
        self.shutdown.cancel();
    }

    /// This listener as a stream of connections, ending when the listener is
    /// closed. Errors on individual accepts are yielded, not terminal.
    pub fn incoming(&self) -> impl Stream<Item = Result<Connection, TransportError>> + '_ {
        futures_util::stream::unfold(self, |listener| async move {
            match listener.accept().await {
                Err(TransportError::ListenerClosed) => None,
                item => Some((item, listener)),
            }
        })
    }
}

impl StreamListener for Listener {
    type Conn = Connection;

    fn accept(
        &self,
    ) -> impl std::future::Future<Output = Result<Self::Conn, TransportError>> + Send {
        Listener::accept(self)
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Listener::local_addr(self)
    }

    fn close(&self) {
        Listener::close(self);
    }
}

static_assertions::assert_impl_all!(Connection: StreamConnection, Send, Unpin);

#[cfg(test)]
mod tests {
    use super::Listener;
    use crate::config::ServerParams;
    use crate::test_support::{connected_pair, dial_and_greet, read_greeting};
    use crate::util::setup_tracing_for_tests;

    use futures_util::StreamExt as _;
    use std::pin::pin;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::time::timeout;

    #[tokio::test]
    async fn ping_pong_round_trip() -> anyhow::Result<()> {
        setup_tracing_for_tests();
        let (mut client, mut server, _listener) = connected_pair().await?;

        client.write_all(b"ping").await?;
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await?;
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").await?;
        client.read_exact(&mut buf).await?;
        assert_eq!(&buf, b"pong");

        client.close()?;
        server.close()?;
        Ok(())
    }

    #[tokio::test]
    async fn close_unblocks_pending_accept() -> anyhow::Result<()> {
        let listener = Listener::bind("127.0.0.1:0".parse()?, &ServerParams::default())?;
        let ((), result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                listener.close();
            },
            timeout(Duration::from_secs(5), listener.accept())
        );
        let err = result?.expect_err("accept should fail after close");
        assert!(err.is_closed());

        // and it stays closed
        let err = listener.accept().await.expect_err("still closed");
        assert!(err.is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn close_leaves_handed_out_connections_alone() -> anyhow::Result<()> {
        let (mut client, mut server, listener) = connected_pair().await?;
        listener.close();

        client.write_all(b"still here").await?;
        let mut buf = [0u8; 10];
        server.read_exact(&mut buf).await?;
        assert_eq!(&buf, b"still here");
        Ok(())
    }

    #[tokio::test]
    async fn incoming_yields_connections_then_ends_on_close() -> anyhow::Result<()> {
        let listener = Listener::bind("127.0.0.1:0".parse()?, &ServerParams::default())?;
        let target = format!("127.0.0.1:{}", listener.local_addr()?.port());
        let mut incoming = pin!(listener.incoming());

        let (dialed, served) = tokio::join!(dial_and_greet(&target), async {
            incoming.next().await
        });
        let _client = dialed?;
        let mut server = served.expect("stream should yield a connection")?;
        read_greeting(&mut server).await?;

        listener.close();
        assert!(timeout(Duration::from_secs(5), incoming.next())
            .await?
            .is_none());
        Ok(())
    }
}
