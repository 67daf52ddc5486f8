//! Channel construction, including the certificate-verification bypass.
//!
//! Three channel flavors: plaintext, TLS against native roots, and TLS with
//! a no-op certificate verifier for servers running self-signed certs. The
//! last one follows tonic's rustls client example: a manual TCP + rustls
//! handshake wrapped in `TokioIo`, handed to `connect_with_connector`.

use std::sync::Arc;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint, Uri};
use tracing::warn;

use crate::config::ConnectConfig;
use crate::error::ClientError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

pub(crate) async fn build_channel(config: &ConnectConfig) -> Result<Channel, ClientError> {
    let scheme = if config.use_tls { "https" } else { "http" };
    let uri = format!("{}://{}:{}", scheme, config.host, config.port);
    let endpoint = Endpoint::from_shared(uri)
        .map_err(|e| ClientError::Connect(e.to_string()))?
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

    if !config.use_tls {
        return Ok(endpoint.connect().await?);
    }

    if !config.skip_tls_verify {
        let tls = ClientTlsConfig::new()
            .with_native_roots()
            .domain_name(config.host.clone());
        return Ok(endpoint.tls_config(tls)?.connect().await?);
    }

    warn!(
        host = %config.host,
        "TLS certificate verification disabled for this connection"
    );
    connect_unverified(endpoint, config).await
}

/// TLS channel that accepts any server certificate.
async fn connect_unverified(
    endpoint: Endpoint,
    config: &ConnectConfig,
) -> Result<Channel, ClientError> {
    let mut tls = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerification::new()))
        .with_no_client_auth();
    // gRPC requires HTTP/2.
    tls.alpn_protocols = vec![b"h2".to_vec()];

    let connector = TlsConnector::from(Arc::new(tls));
    let host = config.host.clone();
    let port = config.port;

    let channel = endpoint
        .connect_with_connector(tower::service_fn(move |_: Uri| {
            let connector = connector.clone();
            let host = host.clone();
            async move {
                let tcp = TcpStream::connect((host.as_str(), port)).await?;
                let domain = ServerName::try_from(host.clone()).map_err(|e| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
                })?;
                let stream = connector.connect(domain, tcp).await?;
                Ok::<_, std::io::Error>(TokioIo::new(stream))
            }
        }))
        .await?;
    Ok(channel)
}

/// Accepts every certificate; signatures are still checked so a broken
/// handshake fails loudly rather than silently.
#[derive(Debug)]
struct NoVerification {
    provider: rustls::crypto::CryptoProvider,
}

impl NoVerification {
    fn new() -> Self {
        Self {
            provider: rustls::crypto::ring::default_provider(),
        }
    }
}

impl ServerCertVerifier for NoVerification {
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
            &self.provider.signature_verification_algorithms,
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
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
