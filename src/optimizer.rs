//! Planting-Time Optimizer
//!
//! Exhaustive scan of the next [`PLANTING_HORIZON_DAYS`] days: every candidate
//! date is scored and the maximum kept. Ties go to the earliest date. No
//! pruning or seasonal shortcuts, so the answer does not depend on the shape
//! of the model's yield curve.
//!
//! A scorer failure on any candidate aborts the whole scan; a best date
//! picked from a partially scored horizon could silently be wrong.
//!
//! Includes both sequential and parallel (Rayon) implementations, which
//! return identical results.

use crate::engine::{Prediction, YieldEngine};
use crate::error::{EngineError, EngineResult};
use crate::lookup_tables::{CropMatch, Novelty};
use chrono::{Days, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;

/// Candidate offsets scanned: `0..PLANTING_HORIZON_DAYS` from the start date
pub const PLANTING_HORIZON_DAYS: usize = 365;

/// Best planting date within the horizon
#[derive(Debug, Clone, Serialize)]
pub struct PlantingRecommendation {
    pub crop: String,
    pub province: String,
    pub best_date: NaiveDate,
    pub best_yield: f64,
    pub harvest_date: NaiveDate,
    pub novelty: Novelty,
    pub candidates_scored: usize,
}

impl PlantingRecommendation {
    fn from_best(best: Prediction, candidates_scored: usize) -> Self {
        Self {
            crop: best.crop,
            province: best.province,
            best_date: best.planting_date,
            best_yield: best.yield_tons_per_ha,
            harvest_date: best.harvest_date,
            novelty: best.novelty,
            candidates_scored,
        }
    }
}

fn candidate_date(start: NaiveDate, offset: usize) -> EngineResult<NaiveDate> {
    start.checked_add_days(Days::new(offset as u64)).ok_or_else(|| {
        EngineError::InvalidInput(format!("planting horizon from {} runs past the calendar", start))
    })
}

/// Keep the running maximum; strict `>` so the earliest candidate wins ties
fn keep_best(best: Option<Prediction>, candidate: Prediction) -> Option<Prediction> {
    match best {
        Some(current) if candidate.yield_tons_per_ha <= current.yield_tons_per_ha => Some(current),
        _ => Some(candidate),
    }
}

impl YieldEngine {
    /// Best planting date in the year starting today (local time)
    pub fn find_best_planting_time(&self, crop: &str, province: &str) -> EngineResult<PlantingRecommendation> {
        let today = chrono::Local::now().date_naive();
        self.find_best_planting_time_from(crop, province, today)
    }

    /// Best planting date in `[start, start + 364 days]`, scanned sequentially
    pub fn find_best_planting_time_from(
        &self,
        crop: &str,
        province: &str,
        start: NaiveDate,
    ) -> EngineResult<PlantingRecommendation> {
        let started = Instant::now();
        let resolved = self.tables().resolve_crop(crop);

        let mut best: Option<Prediction> = None;
        for offset in 0..PLANTING_HORIZON_DAYS {
            let date = candidate_date(start, offset)?;
            let candidate = self.evaluate(&resolved, province, date)?;
            best = keep_best(best, candidate);
        }

        self.finish_scan(best, &resolved, province, started)
    }

    /// Same result as [`find_best_planting_time_from`](Self::find_best_planting_time_from),
    /// with candidates scored on the Rayon pool
    pub fn find_best_planting_time_parallel_from(
        &self,
        crop: &str,
        province: &str,
        start: NaiveDate,
    ) -> EngineResult<PlantingRecommendation> {
        let started = Instant::now();
        let resolved = self.tables().resolve_crop(crop);

        // Collect keeps date order, so the sequential reduce below breaks ties identically
        let candidates: Vec<Prediction> = (0..PLANTING_HORIZON_DAYS)
            .into_par_iter()
            .map(|offset| {
                let date = candidate_date(start, offset)?;
                self.evaluate(&resolved, province, date)
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let best = candidates.into_iter().fold(None, keep_best);

        self.finish_scan(best, &resolved, province, started)
    }

    fn finish_scan(
        &self,
        best: Option<Prediction>,
        crop: &CropMatch,
        province: &str,
        started: Instant,
    ) -> EngineResult<PlantingRecommendation> {
        let best = best.ok_or_else(|| {
            EngineError::InvalidInput(format!("no candidate dates scored for {} in {}", crop.name, province))
        })?;

        tracing::info!(
            "Best planting date for {} in {}: {} ({:.3} t/ha), {} candidates in {:?}",
            best.crop,
            best.province,
            best.planting_date,
            best.yield_tons_per_ha,
            PLANTING_HORIZON_DAYS,
            started.elapsed()
        );

        Ok(PlantingRecommendation::from_best(best, PLANTING_HORIZON_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScorerError;
    use crate::features::{FeatureSchema, FeatureVector};
    use crate::lookup_tables::{LookupTables, WeatherProfile};
    use crate::model::YieldScorer;
    use std::sync::Arc;

    /// Yield tracks interpolated rainfall
    struct RainScorer;

    impl YieldScorer for RainScorer {
        fn score(&self, features: &FeatureVector) -> std::result::Result<f64, ScorerError> {
            Ok((features.get("Total_Rainfall").unwrap_or(0.0) / 100.0).ln_1p())
        }
    }

    /// Constant yield everywhere
    struct FlatScorer;

    impl YieldScorer for FlatScorer {
        fn score(&self, _: &FeatureVector) -> std::result::Result<f64, ScorerError> {
            Ok(1.0)
        }
    }

    /// Fails for one planting month
    struct FailingInMonth(f64);

    impl YieldScorer for FailingInMonth {
        fn score(&self, features: &FeatureVector) -> std::result::Result<f64, ScorerError> {
            if features.get("Planting_Month") == Some(self.0) {
                return Err(ScorerError::Model("tree evaluation failed".to_string()));
            }
            Ok(1.0)
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine(scorer: Arc<dyn YieldScorer>) -> YieldEngine {
        // Rainfall peaks in August
        let tables = (1..=12).fold(LookupTables::default(), |t, m| {
            let rain = 1000.0 - 100.0 * (m as f64 - 8.0).abs();
            t.with_weather("bali", m, WeatherProfile {
                avg_temp: 27.0,
                total_rainfall: rain,
                avg_humidity: 80.0,
                avg_soil_moisture: 30.0,
            })
        });
        let schema = Arc::new(FeatureSchema::new(vec![
            "Total_Rainfall".into(),
            "Planting_Month".into(),
        ]).unwrap());
        YieldEngine::new(tables, schema, scorer)
    }

    #[test]
    fn test_finds_seasonal_peak() {
        let engine = engine(Arc::new(RainScorer));
        let rec = engine.find_best_planting_time_from("Padi", "Bali", ymd(2025, 1, 1)).unwrap();

        assert_eq!(rec.best_date, ymd(2025, 8, 15));
        assert_eq!(rec.candidates_scored, 365);
        assert_eq!(rec.province, "bali");
    }

    #[test]
    fn test_ties_go_to_earliest_date() {
        let engine = engine(Arc::new(FlatScorer));
        let start = ymd(2025, 3, 10);
        let rec = engine.find_best_planting_time_from("Padi", "bali", start).unwrap();
        assert_eq!(rec.best_date, start);

        let parallel = engine.find_best_planting_time_parallel_from("Padi", "bali", start).unwrap();
        assert_eq!(parallel.best_date, start);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let engine = engine(Arc::new(RainScorer));
        for start in [ymd(2025, 1, 1), ymd(2025, 9, 1), ymd(2024, 2, 29)] {
            let seq = engine.find_best_planting_time_from("Padi", "bali", start).unwrap();
            let par = engine.find_best_planting_time_parallel_from("Padi", "bali", start).unwrap();
            assert_eq!(seq.best_date, par.best_date);
            assert_eq!(seq.best_yield, par.best_yield);
        }
    }

    #[test]
    fn test_scorer_failure_aborts_scan() {
        let engine = engine(Arc::new(FailingInMonth(11.0)));

        let err = engine.find_best_planting_time_from("Padi", "bali", ymd(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::Scorer { date, .. } if date == ymd(2025, 11, 1)));

        let err = engine.find_best_planting_time_parallel_from("Padi", "bali", ymd(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::Scorer { .. }));
    }
}
