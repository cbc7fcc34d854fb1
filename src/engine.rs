//! Yield Engine - Main coordinator for yield prediction
//!
//! Pipeline per query: resolve crop → assemble features → score →
//! inverse log transform → clamp at zero. No caching; a prediction is a
//! pure function of its inputs, the lookup tables and the model.

use crate::config::EngineConfig;
use crate::data::{parse_iso_date, HistoricalRecords};
use crate::error::{EngineError, EngineResult};
use crate::features::{self, FeatureSchema};
use crate::lookup_tables::{CropMatch, Fallback, LookupTables, Novelty};
use crate::model::{inverse_log_yield, TreeEnsembleModel, YieldScorer};
use crate::utils::normalize_province;
use anyhow::Result;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

/// Main yield engine
///
/// Everything inside is read-only after construction, so one engine can be
/// shared across threads behind an `Arc`.
pub struct YieldEngine {
    tables: LookupTables,
    schema: Arc<FeatureSchema>,
    scorer: Arc<dyn YieldScorer>,
}

/// Yield estimate for one planting date
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Stored crop name the query resolved to
    pub crop: String,
    /// Normalized province key
    pub province: String,
    pub planting_date: NaiveDate,
    pub yield_tons_per_ha: f64,
    pub duration_days: f64,
    pub harvest_date: NaiveDate,
    pub novelty: Novelty,
}

/// Where a planting stands relative to today
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlantingStatus {
    /// Planting date is today or later
    Planned,
    Growing { days_elapsed: i64, progress_pct: f64 },
    ReadyToHarvest,
}

/// Predicted yield against the historical mean for the same crop/province
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub baseline_yield: f64,
    /// `None` when the baseline is not positive
    pub uplift_pct: Option<f64>,
    pub baseline_defaulted: bool,
}

impl YieldEngine {
    /// Assemble an engine from prebuilt parts (tests inject stub scorers here)
    pub fn new(tables: LookupTables, schema: Arc<FeatureSchema>, scorer: Arc<dyn YieldScorer>) -> Self {
        Self { tables, schema, scorer }
    }

    /// Load records, schema and model from the configured data directory
    ///
    /// Any failure aborts startup; there is no partially initialized engine.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        tracing::info!("Initializing yield engine from {}", config.data_dir.display());

        let records = HistoricalRecords::load(&config.records_path())?;

        tracing::info!("Building lookup tables...");
        let tables = LookupTables::from_records(&records)?;

        tracing::info!("Loading feature schema...");
        let schema = Arc::new(FeatureSchema::load(&config.columns_path())?);

        tracing::info!("Loading yield model...");
        let model = TreeEnsembleModel::load(&config.model_path(), &schema)?;

        tracing::info!("Engine ready ({} features)", schema.len());

        Ok(Self::new(tables, schema, Arc::new(model)))
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Predict yield (tons/ha) for a planting date
    pub fn predict_yield(&self, crop: &str, province: &str, date: NaiveDate) -> EngineResult<Prediction> {
        let resolved = self.tables.resolve_crop(crop);
        let prediction = self.evaluate(&resolved, province, date)?;

        tracing::debug!(
            "Predicted {:.3} t/ha for {} in {} planted {}",
            prediction.yield_tons_per_ha, prediction.crop, prediction.province, date
        );

        Ok(prediction)
    }

    /// Predict from an ISO-8601 date string
    ///
    /// # Errors
    /// `EngineError::InvalidInput` when the date does not parse; the query is
    /// never silently moved to another day.
    pub fn predict_yield_str(&self, crop: &str, province: &str, date: &str) -> EngineResult<Prediction> {
        let parsed = parse_iso_date(date).ok_or_else(|| {
            EngineError::InvalidInput(format!("'{}' is not an ISO-8601 date (YYYY-MM-DD)", date))
        })?;

        self.predict_yield(crop, province, parsed)
    }

    /// Compare a yield against the historical mean for the pair
    pub fn baseline_comparison(&self, crop: &str, province: &str, yield_tons_per_ha: f64) -> BaselineComparison {
        let resolved = self.tables.resolve_crop(crop);
        let (baseline_yield, fallback) = self.tables.baseline_yield(&resolved.name, province);

        let uplift_pct = if baseline_yield > 0.0 {
            Some((yield_tons_per_ha - baseline_yield) / baseline_yield * 100.0)
        } else {
            None
        };

        BaselineComparison {
            baseline_yield,
            uplift_pct,
            baseline_defaulted: fallback != Fallback::Exact,
        }
    }

    /// Score one date for an already-resolved crop
    pub(crate) fn evaluate(&self, crop: &CropMatch, province: &str, date: NaiveDate) -> EngineResult<Prediction> {
        let assembled = features::assemble(&self.tables, &self.schema, &crop.name, province, date);

        let score = self.scorer
            .score(&assembled.vector)
            .map_err(|source| EngineError::Scorer { date, source })?;

        let mut novelty = assembled.novelty;
        novelty.crop_unresolved = crop.resolution == Fallback::Default;

        Ok(Prediction {
            crop: crop.name.clone(),
            province: normalize_province(province),
            planting_date: date,
            yield_tons_per_ha: inverse_log_yield(score),
            duration_days: assembled.duration_days,
            harvest_date: harvest_date(date, assembled.duration_days),
            novelty,
        })
    }
}

/// Planting date plus whole days of the mean growth duration
pub fn harvest_date(planting_date: NaiveDate, duration_days: f64) -> NaiveDate {
    let whole_days = duration_days.max(0.0).floor() as u64;
    planting_date
        .checked_add_days(Days::new(whole_days))
        .unwrap_or(NaiveDate::MAX)
}

/// Status of a planting as of `today`
pub fn planting_status(prediction: &Prediction, today: NaiveDate) -> PlantingStatus {
    if prediction.planting_date >= today {
        return PlantingStatus::Planned;
    }

    let days_elapsed = (today - prediction.planting_date).num_days();
    if (days_elapsed as f64) < prediction.duration_days {
        PlantingStatus::Growing {
            days_elapsed,
            progress_pct: days_elapsed as f64 / prediction.duration_days * 100.0,
        }
    } else {
        PlantingStatus::ReadyToHarvest
    }
}
