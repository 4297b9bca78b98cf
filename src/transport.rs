//! Shared HTTP transport helpers
//!
//! Provides the low-level pieces used by `JmapClient`: building the
//! `reqwest` client, resolving and attaching the `Authorization`
//! header, and sending a request under a cancellation token.

use crate::config::{AuthMethod, JmapConfig};
use crate::error::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-request timeout, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session discovery path (RFC 8620 section 2.2).
pub const WELL_KNOWN_PATH: &str = "/.well-known/jmap";

/// Build the session discovery URL for a host.
///
/// A host that already carries a scheme is used as-is and `port` is
/// ignored. Otherwise `https` is assumed and the port is appended
/// unless it is 443.
///
/// # Examples
///
/// ```
/// use jmap_probe::discovery_url;
///
/// assert_eq!(
///     discovery_url("jmap.example.com", 443),
///     "https://jmap.example.com/.well-known/jmap"
/// );
/// assert_eq!(
///     discovery_url("jmap.example.com", 8080),
///     "https://jmap.example.com:8080/.well-known/jmap"
/// );
/// ```
#[must_use]
pub fn discovery_url(host: &str, port: u16) -> String {
    let base = if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else if port == 443 {
        format!("https://{host}")
    } else {
        format!("https://{host}:{port}")
    };
    format!("{base}{WELL_KNOWN_PATH}")
}

/// The `Authorization` scheme a request will carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    None,
    Basic,
    Bearer,
}

impl AuthScheme {
    /// Pick the scheme for the configured method and credentials.
    ///
    /// Basic needs both username and password, bearer needs a token.
    /// A method whose credentials are missing resolves to
    /// [`AuthScheme::None`], so the result always names the header
    /// that is actually sent.
    #[must_use]
    pub fn resolve(config: &JmapConfig) -> Self {
        let has_basic = !config.username.is_empty() && !config.password.is_empty();
        let has_bearer = !config.token.is_empty();
        match &config.auth_method {
            AuthMethod::Auto | AuthMethod::Bearer if has_bearer => Self::Bearer,
            AuthMethod::Auto | AuthMethod::Basic if has_basic => Self::Basic,
            _ => Self::None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic => "basic",
            Self::Bearer => "bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attach the `Authorization` header for [`AuthScheme::resolve`], if
/// any, to `request`.
pub fn authorize(request: RequestBuilder, config: &JmapConfig) -> RequestBuilder {
    match AuthScheme::resolve(config) {
        AuthScheme::Basic => request.basic_auth(&config.username, Some(&config.password)),
        AuthScheme::Bearer => request.bearer_auth(&config.token),
        AuthScheme::None => request,
    }
}

/// Build the HTTP client for `config`.
///
/// With `config.insecure` set, server certificates are not verified.
///
/// # Errors
///
/// Returns [`Error::Tls`] if the TLS setup or client build fails.
pub fn http_client(config: &JmapConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(config.user_agent.clone());

    if config.insecure {
        builder = builder.use_preconfigured_tls(insecure_tls_config()?);
    }

    builder
        .build()
        .map_err(|e| Error::Tls(format!("Could not build HTTP client: {e}")))
}

/// Send `request` and return the body of a 200 response.
///
/// Cancelling `cancel` drops the in-flight request and yields
/// [`Error::Cancelled`].
///
/// # Errors
///
/// Returns [`Error::Transport`] on network failure and
/// [`Error::HttpStatus`] for any status other than 200.
pub async fn send(
    request: RequestBuilder,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let exchange = async {
        let response = request.send().await.map_err(|source| Error::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|source| Error::Transport {
            url: url.to_string(),
            source,
        })?;
        debug!("{} -> {} ({} bytes)", url, status, body.len());

        if status != StatusCode::OK {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body.to_vec())
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled { url: url.to_string() }),
        result = exchange => result,
    }
}

/// rustls configuration that accepts any server certificate.
fn insecure_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
        .with_no_client_auth();
    Ok(config)
}

/// Server certificate check for `--insecure` runs: every chain and
/// handshake signature is accepted, so a JMAP server behind a
/// self-signed or expired certificate can still be probed.
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
