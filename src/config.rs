use clap::Parser;
use secrecy::SecretString;
use std::{env, net::SocketAddr, time::Duration};
use tracing::{info, warn};

use crate::providers::{gemini, openai};
use crate::secrets;

pub const DEFAULT_MAX_ROWS: usize = 200;

#[derive(Debug, Parser)]
#[command(
    name = "caterflow-insights",
    version,
    about = "Trend analysis endpoint for the catering dashboard"
)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Allowed browser origin (any origin when unset; FRONTEND_ORIGIN is also read)
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Gemini credential, or an op:// reference
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// OpenAI credential, or an op:// reference
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = gemini::DEFAULT_MODEL)]
    pub gemini_model: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = openai::DEFAULT_MODEL)]
    pub openai_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = gemini::DEFAULT_BASE_URL)]
    pub gemini_base_url: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = openai::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Timeout for one provider call, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 30)]
    pub provider_timeout_secs: u64,

    /// Rows kept per collection before aggregation
    #[arg(
        long,
        env = "MAX_ROWS",
        default_value_t = DEFAULT_MAX_ROWS as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_rows: u64,

    /// Try the next configured provider when one fails
    #[arg(long, env = "CASCADE_PROVIDERS")]
    pub cascade_providers: bool,
}

/// Where and how to reach one provider.
#[derive(Debug)]
pub struct ProviderSettings {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub cors_origin: Option<String>,
    /// `None` when no credential is configured.
    pub gemini: Option<ProviderSettings>,
    pub openai: Option<ProviderSettings>,
    pub provider_timeout: Duration,
    pub max_rows: usize,
    pub cascade_providers: bool,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Self {
        let gemini = resolve_credential("GEMINI_API_KEY", cli.gemini_api_key).map(|api_key| {
            ProviderSettings {
                api_key,
                base_url: cli.gemini_base_url,
                model: cli.gemini_model,
            }
        });
        let openai = resolve_credential("OPENAI_API_KEY", cli.openai_api_key).map(|api_key| {
            ProviderSettings {
                api_key,
                base_url: cli.openai_base_url,
                model: cli.openai_model,
            }
        });

        let cors_origin = cli
            .cors_origin
            .or_else(|| env::var("FRONTEND_ORIGIN").ok())
            .filter(|o| !o.trim().is_empty());

        Self {
            bind: cli.bind,
            cors_origin,
            gemini,
            openai,
            provider_timeout: Duration::from_secs(cli.provider_timeout_secs),
            max_rows: usize::try_from(cli.max_rows).unwrap_or(usize::MAX),
            cascade_providers: cli.cascade_providers,
        }
    }

    pub fn log_summary(&self) {
        for (name, settings) in [("gemini", &self.gemini), ("openai", &self.openai)] {
            match settings {
                Some(s) => info!(
                    provider = name,
                    model = %s.model,
                    credential = %secrets::describe_secret(&s.api_key),
                    "provider configured"
                ),
                None => info!(provider = name, "provider not configured"),
            }
        }
        if self.gemini.is_none() && self.openai.is_none() {
            warn!("no provider credentials set; every request will receive the sample analysis");
        }
    }
}

/// Blank values count as unset; `op://` references go through 1Password.
fn resolve_credential(name: &str, raw: Option<String>) -> Option<SecretString> {
    let raw = raw?.trim().to_string();
    if raw.is_empty() {
        return None;
    }
    if !raw.starts_with(secrets::OP_REFERENCE_PREFIX) {
        return Some(SecretString::from(raw));
    }
    match secrets::get_secret(&raw) {
        Ok(secret) => {
            info!(credential = name, "loaded credential from 1Password");
            Some(secret)
        }
        Err(e) => {
            warn!(credential = name, error = %e, "could not resolve 1Password reference, provider disabled");
            None
        }
    }
}
