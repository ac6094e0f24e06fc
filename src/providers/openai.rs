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
use crate::prompt::SYSTEM_PROMPT;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI chat completions provider, used when Gemini is not configured.
pub struct OpenAiProvider {
    transport: Arc<dyn Transport>,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_key,
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    choices: Option<Vec<Choice>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Decode `choices[0].message.content`.
pub fn decode_response(reply: &HttpReply) -> ProviderResponse {
    let Some(value) = parse_body(reply) else {
        return ProviderResponse::Malformed;
    };
    let Ok(envelope) = serde_json::from_value::<Envelope>(value) else {
        return ProviderResponse::Malformed;
    };

    let text = envelope
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
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
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn failure_mode(&self) -> FailureMode {
        FailureMode::Degrade
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderFailure> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });

        info!(provider = "openai", model = %self.model, prompt_chars = request.prompt.len(), "requesting analysis");
        let reply = self
            .transport
            .post_json(OutboundRequest {
                url,
                query: Vec::new(),
                bearer: Some(SecretString::from(self.api_key.expose_secret().to_owned())),
                body,
            })
            .await?;

        let response = decode_response(&reply);
        if !matches!(response, ProviderResponse::Success { .. }) {
            warn!(provider = "openai", status = reply.status, response = ?response, "unexpected response");
        }
        response.into_result()
    }
}
