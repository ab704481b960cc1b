//! HTTP transport for SOAP documents.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, trace};
use url::Url;

use super::{WinRmError, WinRmResult};

/// Content type of SOAP 1.2 requests
pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// Moves request documents to a WS-Management endpoint and returns the
/// response document.
///
/// Implementations fail with [`WinRmError::Transport`] on connection
/// failures, non-success statuses and non-SOAP responses.
#[async_trait]
pub trait HttpConnector: Send + Sync {
    /// POST `request`, setting the `SOAPAction` header when `soap_action` is given.
    async fn send(&self, request: &str, soap_action: Option<&str>) -> WinRmResult<String>;
}

/// Client settings for [`ReqwestConnector`].
#[derive(Clone, Default)]
pub struct TransportSettings {
    /// Basic auth username; no credentials are sent when empty
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Overall request timeout
    pub timeout: Option<Duration>,
    /// Accept self-signed or otherwise invalid certificates
    pub accept_invalid_certs: bool,
}

impl fmt::Debug for TransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSettings")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// [`HttpConnector`] backed by a `reqwest` client.
pub struct ReqwestConnector {
    client: Client,
    endpoint: Url,
    username: Option<String>,
    password: Option<String>,
}

impl ReqwestConnector {
    /// Create a connector for `endpoint`.
    pub fn new(endpoint: Url, settings: TransportSettings) -> WinRmResult<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            WinRmError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint,
            username: settings.username.filter(|u| !u.is_empty()),
            password: settings.password,
        })
    }

    /// The endpoint requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for ReqwestConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestConnector")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .finish()
    }
}

#[async_trait]
impl HttpConnector for ReqwestConnector {
    async fn send(&self, request: &str, soap_action: Option<&str>) -> WinRmResult<String> {
        let mut http = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(request.to_string());
        if let Some(action) = soap_action {
            http = http.header("SOAPAction", action);
        }
        if let Some(username) = &self.username {
            http = http.basic_auth(username, self.password.as_ref());
        }

        trace!(endpoint = %self.endpoint, action = ?soap_action, "Posting SOAP request");
        let response = http
            .send()
            .await
            .map_err(|e| WinRmError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| WinRmError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            debug!(status = %status, "WinRM endpoint returned an error status");
            return Err(WinRmError::Transport(format!("HTTP {} - {}", status, body)));
        }
        if !content_type.to_ascii_lowercase().starts_with("application/soap+xml") {
            return Err(WinRmError::Transport(format!(
                "Unexpected content type {:?}",
                content_type
            )));
        }

        Ok(body)
    }
}
