//! TLS configuration from PEM files.
//!
//! Both sides use rustls with the ring crypto provider. The server presents
//! a single certificate chain; clients trust the certificates found in one
//! PEM bundle (normally the server's own self-signed certificate).

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::{CourierError, Result};

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn load_certs(path: &Path) -> std::result::Result<Vec<CertificateDer<'static>>, String> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| format!("failed to read certificates from {}: {e}", path.display()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid certificate in {}: {e}", path.display()))?;
    if certs.is_empty() {
        return Err(format!("no certificates found in {}", path.display()));
    }
    Ok(certs)
}

/// Build the listener's TLS configuration. Any failure is a startup error.
pub fn server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let certs = load_certs(cert_path).map_err(CourierError::Startup)?;
    let key = PrivateKeyDer::from_pem_file(key_path).map_err(|e| {
        CourierError::Startup(format!(
            "failed to load private key from {}: {e}",
            key_path.display()
        ))
    })?;

    let config = ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| CourierError::Startup(format!("TLS protocol setup failed: {e}")))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| CourierError::Startup(format!("certificate and key do not match: {e}")))?;

    Ok(Arc::new(config))
}

/// Build a client TLS configuration trusting the certificates in `ca_path`.
pub fn client_config(ca_path: &Path) -> Result<Arc<ClientConfig>> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(ca_path).map_err(CourierError::Configuration)? {
        roots.add(cert).map_err(|e| {
            CourierError::Configuration(format!(
                "unusable CA certificate in {}: {e}",
                ca_path.display()
            ))
        })?;
    }

    let config = ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| CourierError::Configuration(format!("TLS protocol setup failed: {e}")))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}
