/*
[INPUT]:  HTTP configuration (base URL, timeouts) and the shared Session
[OUTPUT]: Authenticated request builders and validated responses
[POS]:    HTTP layer - transport wrapper used by every endpoint
[UPDATE]: When adding connection options or changing response validation
*/

use crate::auth::{Session, SignOutReason};
use crate::http::{CasegenError, Result};
use crate::types::ErrorBody;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API root of a locally running service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1/";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("casegen-adapter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Main HTTP client for the case generation service.
///
/// Cheap to clone: the connection pool and the session are shared.
#[derive(Debug, Clone)]
pub struct CasegenClient {
    http_client: Client,
    base_url: Url,
    session: Session,
}

impl CasegenClient {
    /// Create a new client with default configuration and an empty session
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_session(config, Session::new())
    }

    /// Create a new client bound to an existing session
    pub fn with_session(config: ClientConfig, session: Session) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| CasegenError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: parse_base_url(&config.base_url)?,
            session,
        })
    }

    /// Session shared with this client
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for an endpoint relative to the API root
    fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Build request builder, attaching the bearer token when one is held
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        let builder = self.http_client.request(method, url);
        Ok(match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Send a request and validate the status
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        self.check_response(response).await
    }

    /// Send a request and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a request whose body is irrelevant
    pub(crate) async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.send(builder).await.map(|_| ())
    }

    async fn check_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.bytes().await.unwrap_or_default();
        let message = error_message(status, &body);

        if status == StatusCode::UNAUTHORIZED {
            warn!(path = %url, "request rejected with 401, signing out");
            self.session.sign_out(SignOutReason::Unauthorized);
            return Err(CasegenError::Unauthorized { message });
        }

        debug!(path = %url, status = status.as_u16(), %message, "request failed");
        Err(CasegenError::service_error(status, message))
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CasegenError::Config("base URL must not be empty".to_string()));
    }
    // Url::join drops the last segment unless the base ends with a slash
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&normalized)?)
}

/// Extract the server's message from an error body, or fall back to `HTTP <status>`
pub(crate) fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
