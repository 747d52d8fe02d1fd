//! HTTPS connection to the keygen service
//!
//! A [`Connection`] is built in exactly one of two identity modes: a client TLS
//! certificate with its private key, or a client ID header. Either mode may carry an
//! API key. Each call to [`Transport::send`] is a single attempt; retrying is the
//! dispatcher's job.

use crate::params::ApiParameters;
use crate::protocol::{KeyRequest, KeyResponse};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Identity, StatusCode};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Header carrying the client identifier in client-id mode
pub const CLIENT_ID_HEADER: &str = "x-client-id";
/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";
/// Path of the keygen endpoint below the service URL
pub const KEYGEN_PATH: &str = "keygen";

/// Single-attempt request capability used by the dispatcher
pub trait Transport {
    fn send(&self, request: &KeyRequest) -> impl Future<Output = Result<KeyResponse>> + Send;
}

/// Encoding of the client certificate file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertType {
    Pem,
}

/// Transport tuning knobs
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Refuse plain HTTP endpoints
    pub https_only: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            https_only: true,
        }
    }
}

/// Which identity a connection authenticates with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Certificate,
    ClientId(String),
}

/// Authenticated client for the keygen endpoint
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    endpoint: Url,
    mode: AuthMode,
}

impl Connection {
    /// Certificate mode: mutual TLS with a PEM certificate and private key
    pub fn with_certificate(
        url: &str,
        certificate_path: impl AsRef<Path>,
        cert_type: CertType,
        private_key_path: impl AsRef<Path>,
        api_key: &str,
        options: &ConnectionOptions,
    ) -> Result<Self> {
        let identity = match cert_type {
            CertType::Pem => load_pem_identity(certificate_path.as_ref(), private_key_path.as_ref())?,
        };
        let headers = auth_headers(None, api_key)?;
        let builder = base_builder(options).identity(identity);
        Self::build(url, builder, headers, AuthMode::Certificate)
    }

    /// Client-id mode: identifier and API key travel as headers
    pub fn with_client_id(
        url: &str,
        client_id: &str,
        api_key: &str,
        options: &ConnectionOptions,
    ) -> Result<Self> {
        let headers = auth_headers(Some(client_id), api_key)?;
        Self::build(
            url,
            base_builder(options),
            headers,
            AuthMode::ClientId(client_id.to_string()),
        )
    }

    /// Pick the identity mode from resolved parameters: no client ID means certificate mode
    pub fn from_api_parameters(api: &ApiParameters, options: &ConnectionOptions) -> Result<Self> {
        if api.auth.client_id.is_empty() {
            Self::with_certificate(
                &api.url,
                &api.auth.client_certificate_filename,
                CertType::Pem,
                &api.auth.private_key_filename,
                &api.auth.api_key,
                options,
            )
        } else {
            Self::with_client_id(&api.url, &api.auth.client_id, &api.auth.api_key, options)
        }
    }

    fn build(url: &str, builder: ClientBuilder, headers: HeaderMap, mode: AuthMode) -> Result<Self> {
        let endpoint = keygen_endpoint(url)?;
        let client = builder.default_headers(headers).build().map_err(Error::Network)?;
        debug!("Connection to {} using {:?} identity", endpoint, mode);
        Ok(Self {
            client,
            endpoint,
            mode,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }
}

impl Transport for Connection {
    async fn send(&self, request: &KeyRequest) -> Result<KeyResponse> {
        debug!("POST {} ({})", self.endpoint, request.describe());

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach {}: {}", self.endpoint, e);
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HTTP error {}: {}", status, body);
            return Err(status_error(status, body));
        }

        let bytes = response.bytes().await.map_err(Error::Network)?;
        let key_response: KeyResponse = serde_json::from_slice(&bytes)?;
        debug!(
            "Received {} encrypted bytes",
            key_response.encrypted.encrypted_data.len()
        );
        Ok(key_response)
    }
}

fn base_builder(options: &ConnectionOptions) -> ClientBuilder {
    ClientBuilder::new()
        .timeout(options.timeout)
        .tcp_keepalive(Duration::from_secs(60))
        .use_rustls_tls()
        .https_only(options.https_only)
}

fn auth_headers(client_id: Option<&str>, api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(client_id) = client_id {
        let value = HeaderValue::from_str(client_id)
            .map_err(|_| Error::Config("Client ID contains invalid characters".to_string()))?;
        headers.insert(CLIENT_ID_HEADER, value);
    }
    if !api_key.is_empty() {
        let mut value = HeaderValue::from_str(api_key)
            .map_err(|_| Error::Config("API key contains invalid characters".to_string()))?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);
    }
    Ok(headers)
}

fn load_pem_identity(certificate_path: &Path, private_key_path: &Path) -> Result<Identity> {
    let read = |path: &Path, what: &str| {
        std::fs::read(path).map_err(|e| {
            Error::Config(format!("Failed to read {} {}: {}", what, path.display(), e))
        })
    };
    let mut pem = read(certificate_path, "client certificate")?;
    pem.push(b'\n');
    pem.extend_from_slice(&read(private_key_path, "private key")?);

    Identity::from_pem(&pem)
        .map_err(|e| Error::Config(format!("Invalid client certificate/key pair: {}", e)))
}

fn keygen_endpoint(url: &str) -> Result<Url> {
    let mut base =
        Url::parse(url).map_err(|e| Error::Config(format!("Invalid URL '{}': {}", url, e)))?;
    let last_segment = base
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back());
    if last_segment == Some(KEYGEN_PATH) {
        return Ok(base);
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(KEYGEN_PATH)
        .map_err(|e| Error::Config(format!("Invalid URL '{}': {}", url, e)))
}

fn status_error(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication,
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
        _ => Error::Service {
            status: status.as_u16(),
            body,
        },
    }
}
