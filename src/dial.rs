//! Establishing outbound sessions and their first stream
// (c) 2024 Ross Younger

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt as _;
use quinn::crypto::rustls::QuicClientConfig;
use quinn::EndpointConfig;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use crate::config::ClientParams;
use crate::connection::Connection;
use crate::util::{lookup_host_by_family, socket};
use crate::{transport, TransportError};

/// Dials `target` (a `host:port` string) and returns the resulting
/// [`Connection`]: one new session with its first bidirectional stream open.
///
/// `params.handshake_timeout` bounds the whole of session establishment plus
/// stream open; on expiry the attempt fails with a timeout-classified error.
/// It has no bearing on later I/O deadlines, which belong to the connection.
/// Dropping the returned future cancels the attempt; a partially-established
/// session is never returned, and on a late failure the session is closed
/// before the error surfaces.
pub async fn dial(target: &str, params: &ClientParams) -> Result<Connection, TransportError> {
    let (host, remote) = resolve(target, params)?;
    let deadline = Instant::now() + params.handshake_timeout;
    let server_name = params.server_name.as_deref().unwrap_or(&host);

    let endpoint = create_endpoint(&remote, params)?;
    debug!("opening session to {remote} as {server_name}");
    let connecting = endpoint.connect(remote, server_name)?;
    let session = timeout_at(deadline, connecting)
        .await
        .map_err(|_| TransportError::DeadlineExpired { operation: "dial" })??;

    // The session is useless to the caller without its stream, so any failure
    // from here on closes it before reporting.
    let (send, recv) = match timeout_at(deadline, session.open_bi()).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            session.close(0u8.into(), b"");
            return Err(e.into());
        }
        Err(_) => {
            session.close(0u8.into(), b"");
            return Err(TransportError::DeadlineExpired {
                operation: "stream open",
            });
        }
    };

    let local_addr = endpoint.local_addr()?;
    trace!("session and stream ready, local address {local_addr}");
    Ok(Connection::new(local_addr, session, send, recv))
}

/// Wraps [`dial`] with a fixed configuration into a cloneable closure, the
/// shape RPC frameworks expect from a custom-dialer extension point.
/// Each invocation performs an independent dial.
pub fn dialer(
    params: ClientParams,
) -> impl Fn(String) -> BoxFuture<'static, Result<Connection, TransportError>> + Clone + Send + Sync
{
    let params = Arc::new(params);
    move |target: String| {
        let params = Arc::clone(&params);
        async move { dial(&target, &params).await }.boxed()
    }
}

/// Splits `host:port` and resolves the host within the configured address
/// family. Returns the bare host (for TLS server-name use) and the socket
/// address to dial.
fn resolve(target: &str, params: &ClientParams) -> Result<(String, SocketAddr), TransportError> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| TransportError::InvalidTarget {
            target: target.to_string(),
            reason: "expected host:port",
        })?;
    let port: u16 = port.parse().map_err(|_| TransportError::InvalidTarget {
        target: target.to_string(),
        reason: "port is not a number",
    })?;
    // IPv6 literals arrive bracketed
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let ip = lookup_host_by_family(host, params.address_family)?;
    Ok((host.to_string(), SocketAddr::new(ip, port)))
}

/// Creates the client endpoint: TLS context from the dial parameters, our
/// standard transport configuration, and a fresh local socket for the peer's
/// address family.
fn create_endpoint(
    remote: &SocketAddr,
    params: &ClientParams,
) -> Result<quinn::Endpoint, TransportError> {
    let tls_config = params.tls_config()?;
    let mut config = quinn::ClientConfig::new(Arc::new(QuicClientConfig::try_from(tls_config)?));
    let _ = config.transport_config(transport::create_config(params.keep_alive));

    let socket = socket::bind_unspecified_for(remote)?;
    let runtime = quinn::default_runtime().ok_or(TransportError::NoRuntime)?;
    let mut endpoint = quinn::Endpoint::new(EndpointConfig::default(), None, socket, runtime)?;
    endpoint.set_default_client_config(config);
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use super::{dial, dialer};
    use crate::config::{ClientParams, ServerParams, ServerVerification};
    use crate::test_support::{read_greeting, send_greeting};
    use crate::Listener;

    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn malformed_targets_are_rejected() {
        let params = ClientParams::new(ServerVerification::SkipVerify);
        let err = dial("no-port-here", &params).await.expect_err("no port");
        assert!(matches!(
            err,
            crate::TransportError::InvalidTarget { .. }
        ));
        let err = dial("localhost:not-a-port", &params)
            .await
            .expect_err("bad port");
        assert!(matches!(
            err,
            crate::TransportError::InvalidTarget { .. }
        ));
    }

    #[tokio::test]
    async fn dial_with_nobody_listening_fails_within_deadline() -> anyhow::Result<()> {
        // A bound socket that never answers: the handshake can only time out
        let silent = std::net::UdpSocket::bind("127.0.0.1:0")?;
        let target = format!("127.0.0.1:{}", silent.local_addr()?.port());

        let mut params = ClientParams::new(ServerVerification::SkipVerify);
        params.handshake_timeout = Duration::from_secs(1);

        let start = Instant::now();
        let err = dial(&target, &params).await.expect_err("nobody is there");
        assert!(err.is_timeout(), "unexpected error {err}");
        assert!(start.elapsed() < Duration::from_secs(4));
        Ok(())
    }

    #[tokio::test]
    async fn dialer_closure_produces_connections() -> anyhow::Result<()> {
        let listener = Listener::bind("127.0.0.1:0".parse()?, &ServerParams::default())?;
        let target = format!("127.0.0.1:{}", listener.local_addr()?.port());

        let connect = dialer(ClientParams::new(ServerVerification::SkipVerify));
        let connect2 = connect.clone();

        let (dialed, accepted) = tokio::join!(
            async {
                let mut conn = connect(target.clone()).await?;
                send_greeting(&mut conn).await?;
                Ok::<_, anyhow::Error>(conn)
            },
            listener.accept()
        );
        let _client = dialed?;
        let mut server = accepted?;
        read_greeting(&mut server).await?;

        drop(connect2);
        Ok(())
    }

    #[tokio::test]
    async fn verification_against_pinned_certificate() -> anyhow::Result<()> {
        use crate::config::IdentitySource;

        // Stand the server up on known credentials from files, pin them client-side
        let tempdir = tempfile::tempdir()?;
        let cert_path = tempdir.path().join("cert.pem");
        let key_path = tempdir.path().join("key.pem");
        let raw = rcgen::generate_simple_self_signed(["pinned.test.invalid".to_string()])?;
        std::fs::write(&cert_path, raw.cert.pem())?;
        std::fs::write(&key_path, raw.key_pair.serialize_pem())?;

        let server_params = ServerParams {
            identity: IdentitySource::Files {
                cert: cert_path,
                key: key_path,
            },
            ..ServerParams::default()
        };
        let listener = Listener::bind("127.0.0.1:0".parse()?, &server_params)?;
        let target = format!("127.0.0.1:{}", listener.local_addr()?.port());

        let mut params =
            ClientParams::new(ServerVerification::Pinned(raw.cert.der().as_ref().to_vec()));
        params.server_name = Some("pinned.test.invalid".to_string());

        let (dialed, accepted) = tokio::join!(
            async {
                let mut conn = dial(&target, &params).await?;
                send_greeting(&mut conn).await?;
                Ok::<_, anyhow::Error>(conn)
            },
            listener.accept()
        );
        let _client = dialed?;
        let mut server = accepted?;
        read_greeting(&mut server).await?;
        Ok(())
    }
}
