use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{HttpReply, OutboundRequest, Transport, TransportError};

/// A request as the mock saw it, secrets exposed for assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub bearer: Option<String>,
    pub body: serde_json::Value,
}

/// Scripted transport: replies are consumed in order, every call is recorded.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, body: serde_json::Value) {
        self.push_reply(200, body.to_string());
    }

    pub fn push_reply(&self, status: u16, body: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(HttpReply {
            status,
            body: body.into(),
        }));
    }

    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(&self, request: OutboundRequest) -> Result<HttpReply, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: request.url,
            query: request
                .query
                .iter()
                .map(|(k, v)| (*k, v.expose_secret().to_string()))
                .collect(),
            bearer: request.bearer.as_ref().map(|b| b.expose_secret().to_string()),
            body: request.body,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
    }
}
