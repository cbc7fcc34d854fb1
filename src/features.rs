//! Feature Assembly
//!
//! Maps (crop, province, date) onto the fixed column schema the yield model
//! was fit on. All columns start at 0.0, computed numeric features are
//! written by name, then the `Crop_<crop>` and `Province_<province>` one-hot
//! columns are set if the schema has them. Categories the model never saw
//! carry no category signal rather than failing.

use crate::error::EngineError;
use crate::lookup_tables::{Fallback, LookupTables, Novelty};
use crate::utils::normalize_province;
use crate::weather;
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Numeric (non one-hot) feature names, in assembly order
pub const NUMERIC_FEATURES: [&str; 11] = [
    "Avg_Temp",
    "Total_Rainfall",
    "Avg_Humidity",
    "Avg_Soil_Moisture",
    "Soil_pH",
    "Clay_Ratio",
    "Sand_Ratio",
    "Planting_Month",
    "Duration_Days",
    "Rain_Intensity",
    "Heat_Sum",
];

pub const CROP_PREFIX: &str = "Crop_";
pub const PROVINCE_PREFIX: &str = "Province_";

/// Ordered column list the model was trained on
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema; rejects empty lists and duplicate names
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            bail!("Feature schema is empty");
        }

        let mut index = FxHashMap::default();
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                bail!("Duplicate feature column '{}' in schema", name);
            }
        }

        Ok(Self { columns, index })
    }

    /// Load from a JSON array of column names
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EngineError::MissingArtifact(
                format!("feature schema not found at {}", path.display())
            ).into());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature schema: {}", path.display()))?;

        let columns: Vec<String> = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse feature schema JSON")?;

        Self::new(columns)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}

/// Dense feature values in schema order
#[derive(Debug, Clone)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// All-zero vector for a schema
    pub fn zeros(schema: Arc<FeatureSchema>) -> Self {
        let values = vec![0.0; schema.len()];
        Self { schema, values }
    }

    /// Write a value by column name; returns false if the schema lacks the column
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.schema.index_of(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.index_of(name).map(|i| self.values[i])
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// (column, value) pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema.columns.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

/// Assembled vector plus what went into it
#[derive(Debug, Clone)]
pub struct AssembledFeatures {
    pub vector: FeatureVector,
    pub duration_days: f64,
    pub novelty: Novelty,
}

/// Assemble the model input for one candidate planting date
///
/// `crop` must already be the resolved stored name; province is normalized here.
pub fn assemble(
    tables: &LookupTables,
    schema: &Arc<FeatureSchema>,
    crop: &str,
    province: &str,
    date: NaiveDate,
) -> AssembledFeatures {
    let province_key = normalize_province(province);

    let (soil, soil_fallback) = tables.soil(&province_key);
    let weather = weather::interpolate(tables, &province_key, date);
    let (duration, duration_fallback) = tables.duration(crop);
    let w = weather.profile;

    let numeric = [
        w.avg_temp,
        w.total_rainfall,
        w.avg_humidity,
        w.avg_soil_moisture,
        soil.soil_ph,
        soil.clay_ratio,
        soil.sand_ratio,
        date.month() as f64,
        duration,
        w.total_rainfall / duration,
        w.avg_temp * duration,
    ];

    let mut vector = FeatureVector::zeros(Arc::clone(schema));
    for (name, value) in NUMERIC_FEATURES.iter().zip(numeric) {
        vector.set(name, value);
    }

    let crop_hit = vector.set(&format!("{}{}", CROP_PREFIX, crop), 1.0);
    let province_hit = vector.set(&format!("{}{}", PROVINCE_PREFIX, province_key), 1.0);

    let novelty = Novelty {
        crop_unresolved: false,
        soil_defaulted: soil_fallback != Fallback::Exact,
        weather_defaulted: weather.fallback != Fallback::Exact,
        duration_defaulted: duration_fallback != Fallback::Exact,
        crop_category_missing: !crop_hit,
        province_category_missing: !province_hit,
    };

    AssembledFeatures { vector, duration_days: duration, novelty }
}
