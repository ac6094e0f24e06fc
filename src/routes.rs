use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use crate::error::AppError;
use crate::orchestrator::{AnalyzeRequest, TrendAnalyzer};

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<TrendAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: TrendAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Builds the service router. `cors_origin` restricts browsers to one origin; any origin otherwise.
pub fn router(
    state: AppState,
    cors_origin: Option<&str>,
) -> Result<Router, header::InvalidHeaderValue> {
    let mut cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .allow_credentials(false);
    if let Some(origin) = cors_origin {
        cors = cors.allow_origin(origin.parse::<HeaderValue>()?);
    } else {
        cors = cors.allow_origin(Any);
    }

    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/analyze-trends", post(analyze_trends).options(preflight))
        .route(
            "/functions/v1/analyze-trends",
            post(analyze_trends).options(preflight),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors))
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "caterflow-insights",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// TREND ANALYSIS
// =============================================================================

/// Plain OPTIONS without CORS request headers; real preflights are answered by the CORS layer.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn analyze_trends(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request: AnalyzeRequest = serde_json::from_slice(&body)?;
    let analysis = state.analyzer.analyze(request).await?;
    debug!(source = ?analysis.source, "analysis ready");
    Ok(Json(AnalyzeResponse {
        analysis: analysis.text,
    }))
}
