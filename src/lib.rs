//! Crop Yield Engine
//!
//! Estimates crop yield (tons/ha) for a crop, province and planting date, and
//! recommends the best planting date within the coming year.
//!
//! Layout:
//! - `data`: Historical records loading with Polars
//! - `lookup_tables`: Soil, weather, duration and baseline tables with explicit fallbacks
//! - `weather`: Day-level interpolation between monthly weather means
//! - `features`: Fixed-schema feature vector assembly
//! - `model`: Injected scorer trait and the tree-ensemble model
//! - `engine` / `optimizer`: Prediction pipeline and the 365-day scan
//! - `conversation`: Explicit per-session crop/province context
//! - `api_server`: Axum HTTP surface (feature `api`)

pub mod utils;
pub mod config;
pub mod error;
pub mod data;
pub mod lookup_tables;
pub mod weather;
pub mod features;
pub mod model;
pub mod engine;
pub mod optimizer;
pub mod conversation;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use config::{EngineConfig, ServerConfig};
pub use error::{EngineError, EngineResult, ScorerError};
pub use data::HistoricalRecords;
pub use lookup_tables::{LookupTables, SoilProfile, WeatherProfile, Fallback, Novelty, CropMatch};
pub use features::{FeatureSchema, FeatureVector};
pub use model::{YieldScorer, TreeEnsembleModel, inverse_log_yield};
pub use engine::{YieldEngine, Prediction, PlantingStatus, BaselineComparison, planting_status};
pub use optimizer::{PlantingRecommendation, PLANTING_HORIZON_DAYS};
pub use conversation::{ConversationState, MissingContext};

#[cfg(feature = "api")]
pub use api_server::{AppState, create_router};
