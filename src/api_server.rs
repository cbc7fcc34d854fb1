// Axum API Server Module
//
// Purpose: REST API over the yield engine for a conversational front-end.
// Single-date predictions run inline; the 365-day scan runs on the blocking
// pool under a timeout so it never stalls the request-accepting tasks.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use serde::Deserialize;
use std::sync::Arc;

use crate::config::{EngineConfig, ServerConfig};
use crate::conversation::{ConversationState, MissingContext};
use crate::engine::{planting_status, YieldEngine};
use crate::error::EngineError;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<YieldEngine>,
    pub config: ServerConfig,
}

impl AppState {
    /// Load the engine (records, schema, model) and wrap it for sharing
    pub async fn new(engine_config: &EngineConfig, config: ServerConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading yield engine...");
        let engine_config = engine_config.clone();
        let engine = tokio::task::spawn_blocking(move || YieldEngine::load(&engine_config)).await??;

        Ok(Self::from_engine(Arc::new(engine), config))
    }

    pub fn from_engine(engine: Arc<YieldEngine>, config: ServerConfig) -> Self {
        Self { engine, config }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Known crops and provinces
        .route("/api/catalog", get(get_catalog))

        // Yield endpoints
        .route("/api/predict", post(predict))
        .route("/api/optimize", post(optimize))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub crop: Option<String>,
    pub province: Option<String>,
    /// ISO-8601 date; today when omitted
    pub date: Option<String>,
    #[serde(default)]
    pub session: ConversationState,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub crop: Option<String>,
    pub province: Option<String>,
    #[serde(default)]
    pub session: ConversationState,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_catalog(State(state): State<AppState>) -> impl IntoResponse {
    let tables = state.engine.tables();
    Json(serde_json::json!({
        "crops": tables.crops(),
        "provinces": tables.provinces(),
    }))
}

async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<PredictRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = payload.session.merge(payload.crop.as_deref(), payload.province.as_deref());
    let (crop, province) = require_context(&session)?;

    let today = chrono::Local::now().date_naive();
    let prediction = match payload.date.as_deref() {
        Some(date) => state.engine.predict_yield_str(crop, province, date)?,
        None => state.engine.predict_yield(crop, province, today)?,
    };

    tracing::debug!("Prediction for {} / {} on {}", crop, province, prediction.planting_date);

    let status = planting_status(&prediction, today);

    Ok(Json(serde_json::json!({
        "crop": prediction.crop,
        "province": prediction.province,
        "planting_date": prediction.planting_date,
        "predicted_yield_tons_per_ha": prediction.yield_tons_per_ha,
        "duration_days": prediction.duration_days,
        "harvest_date": prediction.harvest_date,
        "status": status,
        "novelty": prediction.novelty,
        "session": session,
    })))
}

async fn optimize(
    State(state): State<AppState>,
    Json(payload): Json<OptimizeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = payload.session.merge(payload.crop.as_deref(), payload.province.as_deref());
    let (crop, province) = require_context(&session)?;
    let (crop, province) = (crop.to_string(), province.to_string());

    tracing::info!("Optimizing planting date for {} in {}", crop, province);

    // CPU-bound work: run in blocking thread pool
    let engine = state.engine.clone();
    let today = chrono::Local::now().date_naive();
    let task = tokio::task::spawn_blocking(move || {
        let recommendation = engine.find_best_planting_time_parallel_from(&crop, &province, today)?;
        let comparison = engine.baseline_comparison(&crop, &province, recommendation.best_yield);
        Ok::<_, EngineError>((recommendation, comparison))
    });

    let (recommendation, comparison) = tokio::time::timeout(state.config.optimize_timeout, task)
        .await
        .map_err(|_| AppError::Timeout(format!(
            "optimization exceeded {:?}", state.config.optimize_timeout
        )))?
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(serde_json::json!({
        "crop": recommendation.crop,
        "province": recommendation.province,
        "best_date": recommendation.best_date,
        "best_yield_tons_per_ha": recommendation.best_yield,
        "harvest_date": recommendation.harvest_date,
        "baseline_yield_tons_per_ha": comparison.baseline_yield,
        "uplift_pct": comparison.uplift_pct,
        "candidates_scored": recommendation.candidates_scored,
        "novelty": recommendation.novelty,
        "session": session,
    })))
}

fn require_context(session: &ConversationState) -> Result<(&str, &str), AppError> {
    session.resolved().ok_or_else(|| AppError::MissingContext {
        missing: session.missing(),
        session: session.clone(),
    })
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    MissingContext {
        missing: Vec<MissingContext>,
        session: ConversationState,
    },
    Timeout(String),
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(msg) => AppError::BadRequest(msg),
            other => {
                tracing::error!("Engine failure: {}", other);
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            AppError::MissingContext { missing, session } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "crop and province are both required",
                    "missing": missing,
                    "session": session,
                }),
            ),
            AppError::Timeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                serde_json::json!({ "error": msg }),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
