//! Sequences the data check, provider selection, generation call and response
//! normalization for one analyze-trends request.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, DEFAULT_MAX_ROWS};
use crate::error::AppError;
use crate::insights::{
    aggregate_clients, aggregate_events, aggregate_menu_items, ClientRow, EventRow, MenuItemRow,
};
use crate::prompt::{build_prompt, FALLBACK_ANALYSIS};
use crate::providers::{
    FailureMode, GeminiProvider, GenerationProvider, GenerationRequest, OpenAiProvider,
    ProviderFailure, ReqwestTransport, Transport, TransportError,
};

pub const PROVIDER_ERROR_TEXT: &str = "Error analyzing data. Please try again later.";
pub const MALFORMED_RESPONSE_TEXT: &str = "Unable to generate insights at this time.";

/// Body posted by the dashboard.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub model: Option<String>,
    pub analytics_data: Option<AnalyticsData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub events: Option<Vec<EventRow>>,
    pub clients: Option<Vec<ClientRow>>,
    pub menu_items: Option<Vec<MenuItemRow>>,
}

impl AnalyticsData {
    /// All three collections present and non-empty.
    fn split(self) -> Option<(Vec<EventRow>, Vec<ClientRow>, Vec<MenuItemRow>)> {
        match (self.events, self.clients, self.menu_items) {
            (Some(e), Some(c), Some(m)) if !e.is_empty() && !c.is_empty() && !m.is_empty() => {
                Some((e, c, m))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    InsufficientData,
    NoProvider,
    ProviderFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    Generated(&'static str),
    /// Provider answered but not with text; the analysis is a short diagnostic.
    Diagnostic(&'static str),
    Fallback(FallbackReason),
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub text: String,
    pub source: AnalysisSource,
}

impl Analysis {
    fn fallback(reason: FallbackReason) -> Self {
        Self {
            text: FALLBACK_ANALYSIS.to_string(),
            source: AnalysisSource::Fallback(reason),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerOptions {
    pub max_rows: usize,
    pub cascade: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            cascade: false,
        }
    }
}

pub struct TrendAnalyzer {
    providers: Vec<Box<dyn GenerationProvider>>,
    options: AnalyzerOptions,
}

impl TrendAnalyzer {
    /// Providers are tried in the given order.
    pub fn new(providers: Vec<Box<dyn GenerationProvider>>, options: AnalyzerOptions) -> Self {
        Self { providers, options }
    }

    /// Gemini first, then OpenAI, each only when its credential is configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.provider_timeout)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: &AppConfig, transport: Arc<dyn Transport>) -> Self {
        let mut providers: Vec<Box<dyn GenerationProvider>> = Vec::new();
        if let Some(g) = &config.gemini {
            providers.push(Box::new(GeminiProvider::new(
                transport.clone(),
                SecretString::from(g.api_key.expose_secret().to_owned()),
                g.base_url.clone(),
                g.model.clone(),
            )));
        }
        if let Some(o) = &config.openai {
            providers.push(Box::new(OpenAiProvider::new(
                transport,
                SecretString::from(o.api_key.expose_secret().to_owned()),
                o.base_url.clone(),
                o.model.clone(),
            )));
        }

        Self::new(
            providers,
            AnalyzerOptions {
                max_rows: config.max_rows,
                cascade: config.cascade_providers,
            },
        )
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<Analysis, AppError> {
        let data = request.analytics_data.unwrap_or_default();
        info!(
            model = request.model.as_deref().unwrap_or("-"),
            events = data.events.as_ref().map_or(0, Vec::len),
            clients = data.clients.as_ref().map_or(0, Vec::len),
            menu_items = data.menu_items.as_ref().map_or(0, Vec::len),
            "analyze-trends request"
        );

        let Some((mut events, mut clients, mut menu_items)) = data.split() else {
            info!("Insufficient data for analysis");
            return Ok(Analysis::fallback(FallbackReason::InsufficientData));
        };

        if self.providers.is_empty() {
            info!("No provider credentials configured, returning sample analysis");
            return Ok(Analysis::fallback(FallbackReason::NoProvider));
        }

        let max_rows = self.options.max_rows;
        truncate_rows("events", &mut events, max_rows);
        truncate_rows("clients", &mut clients, max_rows);
        truncate_rows("menu_items", &mut menu_items, max_rows);

        let prompt = build_prompt(
            &aggregate_events(&events),
            &aggregate_clients(&clients),
            &aggregate_menu_items(&menu_items),
        );
        let generation = GenerationRequest {
            prompt,
            model: request.model,
        };

        let last = self.providers.len() - 1;
        for (idx, provider) in self.providers.iter().enumerate() {
            let failure = match provider.generate(&generation).await {
                Ok(text) => {
                    info!(provider = provider.name(), chars = text.len(), "analysis generated");
                    return Ok(Analysis {
                        text,
                        source: AnalysisSource::Generated(provider.name()),
                    });
                }
                Err(failure) => failure,
            };

            if self.options.cascade && idx < last {
                warn!(provider = provider.name(), error = %failure, "provider failed, trying next");
                continue;
            }
            return resolve_failure(provider.as_ref(), failure);
        }

        Ok(Analysis::fallback(FallbackReason::NoProvider))
    }
}

/// Applies the provider's failure mode to its failure.
fn resolve_failure(
    provider: &dyn GenerationProvider,
    failure: ProviderFailure,
) -> Result<Analysis, AppError> {
    let name = provider.name();
    match (provider.failure_mode(), failure) {
        (FailureMode::Report, ProviderFailure::Rejected(message)) => {
            warn!(provider = name, error = %message, "provider rejected the request");
            Ok(Analysis {
                text: PROVIDER_ERROR_TEXT.to_string(),
                source: AnalysisSource::Diagnostic(name),
            })
        }
        (FailureMode::Report, ProviderFailure::Malformed) => Ok(Analysis {
            text: MALFORMED_RESPONSE_TEXT.to_string(),
            source: AnalysisSource::Diagnostic(name),
        }),
        (FailureMode::Report, ProviderFailure::Transport(source)) => Err(AppError::Transport {
            provider: name,
            source,
        }),
        (FailureMode::Degrade, failure) => {
            warn!(provider = name, error = %failure, "provider failed, returning sample analysis");
            Ok(Analysis::fallback(FallbackReason::ProviderFailed))
        }
    }
}

fn truncate_rows<T>(collection: &'static str, rows: &mut Vec<T>, max: usize) {
    if rows.len() > max {
        warn!(collection, received = rows.len(), kept = max, "truncating rows before aggregation");
        rows.truncate(max);
    }
}
