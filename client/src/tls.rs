//! Client-side TLS connector.
//!
//! By default this accepts whatever certificate the server presents,
//! matching the original client's known weakness of skipping verification
//! entirely. Passing `--ca-cert` opts into verifying the server's
//! certificate against a supplied trust root instead.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_rustls::{
    rustls::{
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        pki_types::{pem::PemObject, CertificateDer, ServerName, UnixTime},
        ClientConfig, RootCertStore, SignatureScheme,
    },
    TlsConnector,
};

/// Builds a connector. With `ca_cert` set, the server's certificate must
/// chain to it. Without it, any certificate is accepted and a warning is
/// logged — this mirrors the original implementation rather than fixing it,
/// since the fix is opt-in via the flag.
pub fn connector(ca_cert: Option<&str>) -> Result<TlsConnector> {
    let config = match ca_cert {
        Some(path) => {
            let mut roots = RootCertStore::empty();
            for cert in CertificateDer::pem_file_iter(path).context("reading CA certificate")? {
                roots.add(cert.context("parsing CA certificate")?).context("adding CA certificate to trust store")?;
            }

            ClientConfig::builder().with_root_certificates(roots).with_no_client_auth()
        }
        None => {
            log::warn!("no --ca-cert given: accepting the server's certificate unconditionally");

            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAny))
                .with_no_client_auth()
        }
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Accepts any certificate chain. Only ever installed when the operator has
/// not supplied `--ca-cert`.
#[derive(Debug)]
struct AcceptAny;

impl ServerCertVerifier for AcceptAny {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
        ]
    }
}
