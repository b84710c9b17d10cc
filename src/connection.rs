//! One session, one stream, presented as a single connection
// (c) 2024 Ross Younger

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::Instant;
use tracing::debug;

use crate::traits::StreamConnection;
use crate::util::time::Deadline;
use crate::TransportError;

/// A QUIC session pinned to its one and only bidirectional stream, behaving as
/// a conventional connection.
///
/// Reads and writes delegate to the stream with no buffering, framing or retry;
/// partial writes surface verbatim. Addresses come from the session. The
/// pairing of session and stream is fixed at construction and lasts for the
/// life of the value; no second stream is ever opened or exposed.
///
/// Dropping a `Connection` tears the session down abruptly. Prefer
/// [`close`](Connection::close), which finishes the stream first.
#[derive(Debug)]
pub struct Connection {
    session: quinn::Connection,
    send: quinn::SendStream,
    recv: quinn::RecvStream,
    // The session knows its peer but only the endpoint knows our own port,
    // so the local address is captured at construction.
    local_addr: SocketAddr,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl Connection {
    pub(crate) fn new(
        local_addr: SocketAddr,
        session: quinn::Connection,
        send: quinn::SendStream,
        recv: quinn::RecvStream,
    ) -> Self {
        Self {
            session,
            send,
            recv,
            local_addr,
            read_deadline: Deadline::default(),
            write_deadline: Deadline::default(),
        }
    }

    /// The local network address
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The peer's network address
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.session.remote_address()
    }

    /// Sets the read and write deadlines together. Equivalent to calling both
    /// [`set_read_deadline`](Connection::set_read_deadline) and
    /// [`set_write_deadline`](Connection::set_write_deadline).
    pub fn set_deadline(&mut self, at: Option<Instant>) {
        self.set_read_deadline(at);
        self.set_write_deadline(at);
    }

    /// Sets the deadline for future (and currently pending) reads.
    ///
    /// Once the deadline has passed, reads fail with an
    /// [`io::ErrorKind::TimedOut`] error instead of blocking - including reads
    /// issued after expiry, and even if data is waiting. The connection itself
    /// remains usable; setting a fresh deadline (or `None`, meaning no
    /// timeout) makes reads block normally again.
    pub fn set_read_deadline(&mut self, at: Option<Instant>) {
        self.read_deadline.set(at);
    }

    /// Sets the deadline for future (and currently pending) writes.
    /// `None` means writes will not time out.
    ///
    /// Even if a write times out, some of the data may already have been
    /// accepted by the transport.
    pub fn set_write_deadline(&mut self, at: Option<Instant>) {
        self.write_deadline.set(at);
    }

    /// Closes the connection: the stream is finished, then the session is
    /// terminated with application error code 0 and an empty reason. Any
    /// blocked reads or writes (here and at the peer) unblock with errors.
    ///
    /// Safe to call more than once; later calls are no-ops returning success,
    /// as a finished stream and a closed session are both terminal states.
    pub fn close(&mut self) -> Result<(), TransportError> {
        if let Err(e) = self.send.finish() {
            // Already finished or reset; the session teardown below covers it
            debug!("finishing stream during close: {e}");
        }
        self.session.close(0u8.into(), b"");
        Ok(())
    }
}

impl StreamConnection for Connection {
    fn local_addr(&self) -> SocketAddr {
        Connection::local_addr(self)
    }

    fn remote_addr(&self) -> SocketAddr {
        Connection::remote_addr(self)
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        // Deadline first: an expired deadline beats available data
        if this.read_deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "read deadline expired",
            )));
        }
        Pin::new(&mut this.recv).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.write_deadline.poll_elapsed(cx).is_ready() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "write deadline expired",
            )));
        }
        AsyncWrite::poll_write(Pin::new(&mut this.send), cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().send).poll_flush(cx)
    }

    /// Finishes the send stream (a graceful half-close). The session stays up
    /// so the peer can still be read; full teardown is [`Connection::close`].
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().send).poll_shutdown(cx)
    }
}
