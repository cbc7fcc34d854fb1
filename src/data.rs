//! Data Loading
//!
//! Loads the historical planting records table using Polars and derives the
//! columns every lookup table is grouped on:
//! - `Province_Key`: normalized province
//! - `Month`: planting month (1-12), null unless both dates parse
//! - `Duration_Days`: whole days from planting to harvest

use crate::error::EngineError;
use crate::utils::{column_as_strings, normalize_province, require_columns};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::path::Path;

/// Columns the records table must provide
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "Province",
    "Crop",
    "Planting_Date",
    "Harvest_Date",
    "Soil_pH",
    "Clay_Ratio",
    "Sand_Ratio",
    "Avg_Temp",
    "Total_Rainfall",
    "Avg_Humidity",
    "Avg_Soil_Moisture",
    "Target_Yield",
];

/// Historical records with derived grouping columns
pub struct HistoricalRecords {
    /// Records plus `Province_Key`, `Month`, `Duration_Days`
    pub df: DataFrame,

    /// Rows whose planting or harvest date did not parse
    pub undated_rows: usize,
}

impl HistoricalRecords {
    /// Load records from CSV
    ///
    /// # Errors
    /// Missing file, unreadable CSV, or a missing required column.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::MissingArtifact(
                format!("historical records not found at {}", path.display())
            ).into());
        }

        tracing::info!("Loading historical records from {}", path.display());

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
            .finish()
            .with_context(|| "Failed to load historical records CSV")?;

        Self::from_dataframe(df)
    }

    /// Build from an already-loaded DataFrame
    pub fn from_dataframe(mut df: DataFrame) -> Result<Self> {
        require_columns(&df, &REQUIRED_COLUMNS, "historical records")?;

        let province_keys: Vec<String> = column_as_strings(&df, "Province")?
            .into_iter()
            .map(|p| p.as_deref().map(normalize_province).unwrap_or_default())
            .collect();

        let planting = column_as_strings(&df, "Planting_Date")?;
        let harvest = column_as_strings(&df, "Harvest_Date")?;

        let mut months: Vec<Option<i32>> = Vec::with_capacity(df.height());
        let mut durations: Vec<Option<f64>> = Vec::with_capacity(df.height());
        let mut undated_rows = 0;

        for (planted, harvested) in planting.iter().zip(harvest.iter()) {
            let planted = planted.as_deref().and_then(parse_iso_date);
            let harvested = harvested.as_deref().and_then(parse_iso_date);

            if planted.is_none() || harvested.is_none() {
                undated_rows += 1;
            }

            // Month and duration are both null unless the row is fully dated
            let (month, duration) = match (planted, harvested) {
                (Some(p), Some(h)) => (Some(p.month() as i32), Some((h - p).num_days() as f64)),
                _ => (None, None),
            };
            months.push(month);
            durations.push(duration);
        }

        df.with_column(Series::new("Province_Key".into(), province_keys))?;
        df.with_column(Series::new("Month".into(), months))?;
        df.with_column(Series::new("Duration_Days".into(), durations))?;

        if undated_rows > 0 {
            tracing::warn!(
                "{} of {} records have unparseable dates; excluded from weather and duration tables",
                undated_rows,
                df.height()
            );
        }

        tracing::info!("  Records: {}", df.height());

        Ok(Self { df, undated_rows })
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

/// Parse an ISO-8601 calendar date, tolerating a trailing time component
///
/// `"2024-06-30"` and `"2024-06-30 00:00:00"` both parse; anything else is `None`.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);

    if trimmed.len() > 10 {
        let sep = trimmed.as_bytes()[10];
        if sep != b' ' && sep != b'T' {
            return None;
        }
    }

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
