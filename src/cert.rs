// X509 certificate management
// (c) 2024 Ross Younger

use std::path::Path;

use rustls_pki_types::pem::PemObject as _;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::IdentitySource;
use crate::TransportError;

/// In-memory representation of X509 credentials (for TLS)
#[derive(Debug)]
pub struct Credentials {
    /// X509 certificate chain, leaf first
    pub chain: Vec<CertificateDer<'static>>,
    /// Keypair the leaf certificate relates to
    pub keypair: PrivateKeyDer<'static>,
    /// Hostname the certificate relates to, where known (convenience member)
    pub hostname: Option<String>,
}

impl Credentials {
    /// Factory method: a fresh self-signed certificate for this host
    pub fn generate() -> Result<Self, TransportError> {
        let hostname = gethostname::gethostname()
            .into_string()
            .unwrap_or("unknown.host.invalid".to_string());
        tracing::trace!("Creating certificate with hostname {hostname}");
        let raw = rcgen::generate_simple_self_signed([hostname.clone()])?;
        Ok(Credentials {
            chain: vec![raw.cert.der().clone()],
            keypair: rustls_pki_types::PrivateKeyDer::Pkcs8(raw.key_pair.serialize_der().into()),
            hostname: Some(hostname),
        })
    }

    /// Factory method: a certificate chain and its private key from PEM files
    pub fn load(cert: &Path, key: &Path) -> Result<Self, TransportError> {
        let chain = CertificateDer::pem_file_iter(cert)?.collect::<Result<Vec<_>, _>>()?;
        let keypair = PrivateKeyDer::from_pem_file(key)?;
        Ok(Credentials {
            chain,
            keypair,
            hostname: None,
        })
    }

    pub(crate) fn from_source(source: &IdentitySource) -> Result<Self, TransportError> {
        match source {
            IdentitySource::Files { cert, key } => Self::load(cert, key),
            IdentitySource::Ephemeral => Self::generate(),
        }
    }

    /// Cloning accessor
    pub fn cert_chain(&self) -> Vec<CertificateDer<'static>> {
        self.chain.clone()
    }
}
