//! Generation providers and the HTTP transport they share.

pub mod gemini;
pub mod openai;

#[cfg(test)]
pub(crate) mod mock;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::secrets;

/// Low temperature keeps the observations factual.
pub const TEMPERATURE: f64 = 0.2;
pub const MAX_OUTPUT_TOKENS: u32 = 500;

const LOG_BODY_PREVIEW: usize = 2048;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
}

/// Why a provider produced no usable text.
#[derive(Debug, Clone, Error)]
pub enum ProviderFailure {
    #[error("provider reported an error: {0}")]
    Rejected(String),
    #[error("unexpected response shape")]
    Malformed,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A provider reply after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    Success { text: String },
    Malformed,
    ProviderError { message: String },
}

impl ProviderResponse {
    pub fn into_result(self) -> Result<String, ProviderFailure> {
        match self {
            ProviderResponse::Success { text } => Ok(text),
            ProviderResponse::Malformed => Err(ProviderFailure::Malformed),
            ProviderResponse::ProviderError { message } => Err(ProviderFailure::Rejected(message)),
        }
    }
}

/// How a provider's failure is presented to the caller when nothing else is tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Short diagnostic text for provider errors; transport failures become a 500.
    Report,
    /// Any failure is replaced by the canned analysis.
    Degrade,
}

/// Input to a single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Model requested by the dashboard; providers may ignore it.
    pub model: Option<String>,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn failure_mode(&self) -> FailureMode;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderFailure>;
}

/// An outbound JSON POST.
#[derive(Debug)]
pub struct OutboundRequest {
    pub url: String,
    pub query: Vec<(&'static str, SecretString)>,
    pub bearer: Option<SecretString>,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: OutboundRequest) -> Result<HttpReply, TransportError>;
}

/// Production transport over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("caterflow-insights/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, request: OutboundRequest) -> Result<HttpReply, TransportError> {
        let query: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (*k, v.expose_secret()))
            .collect();

        let mut builder = self.http.post(&request.url).query(&query).json(&request.body);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        // url is logged bare; the query may carry a credential
        debug!(url = %request.url, "POST provider endpoint");
        let res = builder.send().await.map_err(map_reqwest_error)?;
        let status = res.status().as_u16();
        let body = res.text().await.map_err(map_reqwest_error)?;
        debug!(status, body = %secrets::preview(&body, LOG_BODY_PREVIEW), "provider replied");

        Ok(HttpReply { status, body })
    }
}

/// reqwest errors embed the request URL, query included; it is stripped so a
/// credential passed as `?key=` never reaches logs or error bodies.
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.without_url().to_string())
    }
}

/// Parses a reply body as JSON, `None` when it is not JSON at all.
pub(crate) fn parse_body(reply: &HttpReply) -> Option<serde_json::Value> {
    serde_json::from_str(&reply.body).ok()
}

/// Pulls a readable message out of a provider `error` payload.
pub(crate) fn error_message(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}
