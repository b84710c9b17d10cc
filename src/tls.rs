//! TLS context assembly
// (c) 2024 Ross Younger

use std::path::Path;
use std::sync::Arc;

use quinn::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use quinn::rustls::crypto::CryptoProvider;
use quinn::rustls::server::WebPkiClientVerifier;
use quinn::rustls::{self, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::pem::PemObject as _;
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tracing::warn;

use crate::cert::Credentials;
use crate::config::{
    ClientParams, ClientVerification, ServerParams, ServerVerification,
};
use crate::TransportError;

fn alpn_wire(protocols: &[String]) -> Vec<Vec<u8>> {
    protocols.iter().map(|p| p.as_bytes().to_vec()).collect()
}

fn root_store_from_ca_file(path: &Path) -> Result<RootCertStore, TransportError> {
    let mut store = RootCertStore::empty();
    for cert in CertificateDer::pem_file_iter(path)? {
        store.add(cert?)?;
    }
    Ok(store)
}

fn root_store_from_pinned(der: &[u8]) -> Result<RootCertStore, TransportError> {
    let mut store = RootCertStore::empty();
    store.add(CertificateDer::from(der.to_vec()))?;
    Ok(store)
}

/// Builds the rustls context for outbound sessions.
/// This is the single source of truth shared by the dialer and by
/// [`ClientParams::tls_config`].
pub(crate) fn client_config(
    params: &ClientParams,
) -> Result<Arc<rustls::ClientConfig>, TransportError> {
    let builder = rustls::ClientConfig::builder();
    let builder = match &params.verification {
        ServerVerification::CaFile(path) => {
            builder.with_root_certificates(root_store_from_ca_file(path)?)
        }
        ServerVerification::Pinned(der) => {
            builder.with_root_certificates(root_store_from_pinned(der)?)
        }
        ServerVerification::SkipVerify => {
            warn!("server certificate verification is disabled");
            builder
                .dangerous()
                .with_custom_certificate_verifier(SkipServerVerification::new())
        }
    };
    let mut config = match &params.identity {
        Some(source) => {
            let creds = Credentials::from_source(source)?;
            builder.with_client_auth_cert(creds.cert_chain(), creds.keypair)?
        }
        None => builder.with_no_client_auth(),
    };
    config.alpn_protocols = alpn_wire(&params.alpn);
    Ok(Arc::new(config))
}

/// Builds the rustls context for inbound sessions.
pub(crate) fn server_config(params: &ServerParams) -> Result<rustls::ServerConfig, TransportError> {
    let creds = Credentials::from_source(&params.identity)?;
    let builder = rustls::ServerConfig::builder();
    let builder = match &params.client_verification {
        ClientVerification::None => builder.with_no_client_auth(),
        ClientVerification::CaFile(path) => {
            let verifier = WebPkiClientVerifier::builder(root_store_from_ca_file(path)?.into())
                .build()?;
            builder.with_client_cert_verifier(verifier)
        }
        ClientVerification::Pinned(der) => {
            let verifier = WebPkiClientVerifier::builder(root_store_from_pinned(der)?.into())
                .build()?;
            builder.with_client_cert_verifier(verifier)
        }
    };
    let mut config = builder.with_single_cert(creds.cert_chain(), creds.keypair)?;
    config.alpn_protocols = alpn_wire(&params.alpn);
    Ok(config)
}

/// A verifier which accepts any server certificate, for
/// [`ServerVerification::SkipVerify`]. Signatures are still checked, so the
/// peer must at least hold the private key for whatever certificate it sent.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl SkipServerVerification {
    fn new() -> Arc<Self> {
        Arc::new(Self(Arc::new(rustls::crypto::ring::default_provider())))
    }
}

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
