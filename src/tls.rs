//! TLS acceptor setup for the relay listener.
//!
//! If the configured certificate/key files are absent, a self-signed pair is
//! generated and written to those paths on first run, matching the
//! original's `GenerateServerCert` behavior.

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        ServerConfig,
        pki_types::{CertificateDer, PrivateKeyDer, pem::PemObject},
    },
};

use crate::config::Tls;

/// Builds the [`TlsAcceptor`] the relay listener wraps every accepted
/// socket in, generating a self-signed certificate pair if neither
/// configured file exists yet.
pub fn acceptor(tls: &Tls) -> Result<TlsAcceptor> {
    if !Path::new(&tls.certificate_chain).exists() || !Path::new(&tls.private_key).exists() {
        generate_self_signed(tls)?;
    }

    let certs = CertificateDer::pem_file_iter(&tls.certificate_chain)
        .context("reading certificate chain")?
        .collect::<Result<Vec<_>, _>>()
        .context("parsing certificate chain")?;

    let key = PrivateKeyDer::from_pem_file(&tls.private_key).context("reading private key")?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("building tls server config")?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn generate_self_signed(tls: &Tls) -> Result<()> {
    log::info!(
        "generating self-signed certificate: chain={}, key={}",
        tls.certificate_chain,
        tls.private_key,
    );

    let rcgen::CertifiedKey { cert, key_pair } = rcgen::generate_simple_self_signed(["localhost".to_string()])
        .context("generating self-signed certificate")?;

    fs::write(&tls.certificate_chain, cert.pem()).context("writing certificate chain")?;
    fs::write(&tls.private_key, key_pair.serialize_pem()).context("writing private key")?;

    Ok(())
}
