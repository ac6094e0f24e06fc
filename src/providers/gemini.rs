use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    error_message, parse_body, FailureMode, GenerationProvider, GenerationRequest, HttpReply,
    OutboundRequest, ProviderFailure, ProviderResponse, Transport, MAX_OUTPUT_TOKENS, TEMPERATURE,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Google Gemini `generateContent` provider. Primary: failures are reported, not hidden.
pub struct GeminiProvider {
    transport: Arc<dyn Transport>,
    api_key: SecretString,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_key: SecretString,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_key,
            base_url: base_url.into(),
            default_model: default_model.into(),
        }
    }

    /// The requested model when it is safe to splice into the URL path.
    fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(m) if is_model_name(m) => m,
            Some(m) => {
                warn!(requested = %m, fallback = %self.default_model, "ignoring malformed model name");
                &self.default_model
            }
            None => &self.default_model,
        }
    }
}

fn is_model_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

#[derive(Deserialize)]
struct Envelope {
    candidates: Option<Vec<Candidate>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Decode `candidates[0].content.parts[0].text`, falling back to the `error` payload.
pub fn decode_response(reply: &HttpReply) -> ProviderResponse {
    // A non-JSON body (gateway error page) is an unexpected shape: the caller
    // gets the short diagnostic with a 200, not a 500.
    let Some(value) = parse_body(reply) else {
        return ProviderResponse::Malformed;
    };
    let Ok(envelope) = serde_json::from_value::<Envelope>(value) else {
        return ProviderResponse::Malformed;
    };

    let text = envelope
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty());

    match (text, envelope.error) {
        (Some(text), _) => ProviderResponse::Success { text },
        (None, Some(error)) => ProviderResponse::ProviderError {
            message: error_message(&error),
        },
        (None, None) => ProviderResponse::Malformed,
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::Report
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderFailure> {
        let model = self.resolve_model(request.model.as_deref());
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            }
        });

        info!(provider = "gemini", model, prompt_chars = request.prompt.len(), "requesting analysis");
        let reply = self
            .transport
            .post_json(OutboundRequest {
                url,
                query: vec![("key", SecretString::from(self.api_key.expose_secret().to_owned()))],
                bearer: None,
                body,
            })
            .await?;

        let response = decode_response(&reply);
        if let ProviderResponse::ProviderError { message } = &response {
            warn!(provider = "gemini", status = reply.status, error = %message, "provider returned an error");
        } else if response == ProviderResponse::Malformed {
            warn!(provider = "gemini", status = reply.status, "unexpected response format");
        }
        response.into_result()
    }
}
