//! Lookup Tables
//!
//! Precomputed mappings built once from the historical records and read-only
//! afterwards:
//! - Soil profile per province
//! - Weather profile per (province, month)
//! - Mean growth duration per crop
//! - Mean historical yield per (crop, province), for baseline comparison
//!
//! Every lookup follows an explicit, ordered fallback list and reports which
//! step answered through [`Fallback`], so callers can surface novelty instead
//! of masking it.

use crate::data::HistoricalRecords;
use crate::utils::{column_as_f64, column_as_strings, crop_alias_parts, fold_crop_key, normalize_province};
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// Growth duration used when a crop has no dated history
pub const DEFAULT_DURATION_DAYS: f64 = 90.0;

/// Baseline yield (tons/ha) used when a (crop, province) pair is absent
pub const DEFAULT_BASELINE_YIELD: f64 = 4.0;

/// Which step of a fallback list produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Requested key found as-is
    Exact,
    /// A documented substitute key was used (e.g. January weather)
    Partial,
    /// Hardcoded default
    Default,
}

/// Mean soil statistics of a province
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoilProfile {
    pub soil_ph: f64,
    pub clay_ratio: f64,
    pub sand_ratio: f64,
}

impl SoilProfile {
    pub const DEFAULT: SoilProfile = SoilProfile {
        soil_ph: 6.0,
        clay_ratio: 30.0,
        sand_ratio: 30.0,
    };
}

/// Mean weather statistics of a (province, month)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherProfile {
    pub avg_temp: f64,
    pub total_rainfall: f64,
    pub avg_humidity: f64,
    pub avg_soil_moisture: f64,
}

impl WeatherProfile {
    pub const DEFAULT: WeatherProfile = WeatherProfile {
        avg_temp: 28.0,
        total_rainfall: 1000.0,
        avg_humidity: 80.0,
        avg_soil_moisture: 30.0,
    };

    /// Linear blend `self * (1 - weight) + target * weight`, per feature
    pub fn blend(&self, target: &WeatherProfile, weight: f64) -> WeatherProfile {
        // Identical endpoints must come back bit-for-bit
        if weight == 0.0 || self == target {
            return *self;
        }

        let mix = |current: f64, toward: f64| current * (1.0 - weight) + toward * weight;

        WeatherProfile {
            avg_temp: mix(self.avg_temp, target.avg_temp),
            total_rainfall: mix(self.total_rainfall, target.total_rainfall),
            avg_humidity: mix(self.avg_humidity, target.avg_humidity),
            avg_soil_moisture: mix(self.avg_soil_moisture, target.avg_soil_moisture),
        }
    }
}

/// Outcome of matching a user-supplied crop name against stored names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CropMatch {
    /// Stored crop name (or the input verbatim when unresolved)
    pub name: String,
    pub resolution: Fallback,
}

/// Which lookups fell back while answering one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Novelty {
    pub crop_unresolved: bool,
    pub soil_defaulted: bool,
    pub weather_defaulted: bool,
    pub duration_defaulted: bool,
    pub crop_category_missing: bool,
    pub province_category_missing: bool,
}

impl Novelty {
    pub fn is_novel(&self) -> bool {
        self.crop_unresolved
            || self.soil_defaulted
            || self.weather_defaulted
            || self.duration_defaulted
            || self.crop_category_missing
            || self.province_category_missing
    }
}

/// All lookup tables, keyed by normalized province and stored crop name
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    soil: FxHashMap<String, SoilProfile>,
    /// Province → profile per month (index 0 = January)
    weather: FxHashMap<String, [Option<WeatherProfile>; 12]>,
    durations: FxHashMap<String, f64>,
    /// Crop → province → mean yield
    baselines: FxHashMap<String, FxHashMap<String, f64>>,
    known_crops: BTreeSet<String>,
    /// Folded crop name → stored name
    crop_folds: FxHashMap<String, String>,
    /// Folded alias component → stored name
    crop_aliases: FxHashMap<String, String>,
}

impl LookupTables {
    /// Build every table from the historical records
    pub fn from_records(records: &HistoricalRecords) -> Result<Self> {
        let mut tables = LookupTables::default();
        let df = &records.df;

        // Rows without a province name never become a province key
        let has_province = || col("Province_Key").neq(lit(""));

        // Soil: static per province
        let soil_df = df.clone().lazy()
            .filter(has_province())
            .group_by([col("Province_Key")])
            .agg([
                col("Soil_pH").cast(DataType::Float64).mean(),
                col("Clay_Ratio").cast(DataType::Float64).mean(),
                col("Sand_Ratio").cast(DataType::Float64).mean(),
            ])
            .collect()
            .with_context(|| "Failed to aggregate soil profiles")?;

        let provinces = column_as_strings(&soil_df, "Province_Key")?;
        let ph = column_as_f64(&soil_df, "Soil_pH")?;
        let clay = column_as_f64(&soil_df, "Clay_Ratio")?;
        let sand = column_as_f64(&soil_df, "Sand_Ratio")?;

        for i in 0..soil_df.height() {
            if let (Some(province), Some(soil_ph), Some(clay_ratio), Some(sand_ratio)) =
                (&provinces[i], ph[i], clay[i], sand[i])
            {
                tables = tables.with_soil(province, SoilProfile { soil_ph, clay_ratio, sand_ratio });
            }
        }

        // Weather: monthly means per province
        let weather_df = df.clone().lazy()
            .filter(col("Month").is_not_null().and(has_province()))
            .group_by([col("Province_Key"), col("Month")])
            .agg([
                col("Avg_Temp").cast(DataType::Float64).mean(),
                col("Total_Rainfall").cast(DataType::Float64).mean(),
                col("Avg_Humidity").cast(DataType::Float64).mean(),
                col("Avg_Soil_Moisture").cast(DataType::Float64).mean(),
            ])
            .collect()
            .with_context(|| "Failed to aggregate weather profiles")?;

        let provinces = column_as_strings(&weather_df, "Province_Key")?;
        let months = column_as_f64(&weather_df, "Month")?;
        let temp = column_as_f64(&weather_df, "Avg_Temp")?;
        let rain = column_as_f64(&weather_df, "Total_Rainfall")?;
        let humidity = column_as_f64(&weather_df, "Avg_Humidity")?;
        let moisture = column_as_f64(&weather_df, "Avg_Soil_Moisture")?;

        for i in 0..weather_df.height() {
            if let (Some(province), Some(month), Some(avg_temp), Some(total_rainfall), Some(avg_humidity), Some(avg_soil_moisture)) =
                (&provinces[i], months[i], temp[i], rain[i], humidity[i], moisture[i])
            {
                let profile = WeatherProfile { avg_temp, total_rainfall, avg_humidity, avg_soil_moisture };
                tables = tables.with_weather(province, month as u32, profile);
            }
        }

        // Duration: mean days from planting to harvest per crop
        let duration_df = df.clone().lazy()
            .filter(col("Duration_Days").is_not_null())
            .group_by([col("Crop")])
            .agg([col("Duration_Days").cast(DataType::Float64).mean()])
            .collect()
            .with_context(|| "Failed to aggregate crop durations")?;

        let crops = column_as_strings(&duration_df, "Crop")?;
        let days = column_as_f64(&duration_df, "Duration_Days")?;
        for (crop, days) in crops.iter().zip(days.iter()) {
            if let (Some(crop), Some(days)) = (crop, days) {
                tables = tables.with_duration(crop, *days);
            }
        }

        // Baseline: mean yield per (crop, province)
        let baseline_df = df.clone().lazy()
            .filter(has_province())
            .group_by([col("Crop"), col("Province_Key")])
            .agg([col("Target_Yield").cast(DataType::Float64).mean()])
            .collect()
            .with_context(|| "Failed to aggregate baseline yields")?;

        let crops = column_as_strings(&baseline_df, "Crop")?;
        let provinces = column_as_strings(&baseline_df, "Province_Key")?;
        let yields = column_as_f64(&baseline_df, "Target_Yield")?;
        for i in 0..baseline_df.height() {
            if let (Some(crop), Some(province), Some(mean_yield)) = (&crops[i], &provinces[i], yields[i]) {
                tables = tables.with_baseline(crop, province, mean_yield);
            }
        }

        tracing::info!("  Soil profiles: {}", tables.soil.len());
        tracing::info!("  Weather provinces: {}", tables.weather.len());
        tracing::info!("  Crop durations: {}", tables.durations.len());
        tracing::info!("  Known crops: {}", tables.known_crops.len());

        Ok(tables)
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn with_soil(mut self, province: &str, profile: SoilProfile) -> Self {
        self.soil.insert(normalize_province(province), profile);
        self
    }

    /// Insert a monthly weather profile; months outside 1-12 are ignored
    pub fn with_weather(mut self, province: &str, month: u32, profile: WeatherProfile) -> Self {
        if (1..=12).contains(&month) {
            let months = self.weather.entry(normalize_province(province)).or_insert([None; 12]);
            months[(month - 1) as usize] = Some(profile);
        }
        self
    }

    /// Insert a mean growth duration; non-positive durations are dropped
    pub fn with_duration(mut self, crop: &str, days: f64) -> Self {
        self.register_crop(crop);
        if days.is_finite() && days > 0.0 {
            self.durations.insert(crop.to_string(), days);
        } else {
            tracing::warn!("Ignoring non-positive mean duration {} for crop '{}'", days, crop);
        }
        self
    }

    pub fn with_baseline(mut self, crop: &str, province: &str, mean_yield: f64) -> Self {
        self.register_crop(crop);
        self.baselines
            .entry(crop.to_string())
            .or_default()
            .insert(normalize_province(province), mean_yield);
        self
    }

    fn register_crop(&mut self, crop: &str) {
        if !self.known_crops.insert(crop.to_string()) {
            return;
        }

        self.crop_folds
            .entry(fold_crop_key(crop))
            .or_insert_with(|| crop.to_string());

        for part in crop_alias_parts(crop) {
            self.crop_aliases.entry(part).or_insert_with(|| crop.to_string());
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Soil profile: exact province → default
    pub fn soil(&self, province: &str) -> (SoilProfile, Fallback) {
        match self.soil.get(&normalize_province(province)) {
            Some(profile) => (*profile, Fallback::Exact),
            None => (SoilProfile::DEFAULT, Fallback::Default),
        }
    }

    /// Weather profile: (province, month) → (province, January) → default
    pub fn weather(&self, province: &str, month: u32) -> (WeatherProfile, Fallback) {
        let key = normalize_province(province);
        let decisions = [(month, Fallback::Exact), (1, Fallback::Partial)];

        for (candidate, fallback) in decisions {
            if let Some(profile) = self.weather_exact(&key, candidate) {
                return (profile, fallback);
            }
        }

        (WeatherProfile::DEFAULT, Fallback::Default)
    }

    /// Stored profile for exactly this (province key, month), no fallback
    pub fn weather_exact(&self, province_key: &str, month: u32) -> Option<WeatherProfile> {
        if !(1..=12).contains(&month) {
            return None;
        }
        self.weather
            .get(province_key)
            .and_then(|months| months[(month - 1) as usize])
    }

    /// Mean growth duration in days: exact crop → default
    pub fn duration(&self, crop: &str) -> (f64, Fallback) {
        match self.durations.get(crop) {
            Some(days) => (*days, Fallback::Exact),
            None => (DEFAULT_DURATION_DAYS, Fallback::Default),
        }
    }

    /// Historical mean yield: exact (crop, province) → default
    pub fn baseline_yield(&self, crop: &str, province: &str) -> (f64, Fallback) {
        let key = normalize_province(province);
        match self.baselines.get(crop).and_then(|by_province| by_province.get(&key)) {
            Some(mean_yield) => (*mean_yield, Fallback::Exact),
            None => (DEFAULT_BASELINE_YIELD, Fallback::Default),
        }
    }

    /// Match a crop name: exact → case-insensitive → alias component → unresolved
    pub fn resolve_crop(&self, crop: &str) -> CropMatch {
        if self.known_crops.contains(crop) {
            return CropMatch { name: crop.to_string(), resolution: Fallback::Exact };
        }

        let folded = fold_crop_key(crop);
        let substitutes = [&self.crop_folds, &self.crop_aliases];
        for table in substitutes {
            if let Some(stored) = table.get(&folded) {
                return CropMatch { name: stored.clone(), resolution: Fallback::Partial };
            }
        }

        CropMatch { name: crop.to_string(), resolution: Fallback::Default }
    }

    /// Stored crop names, sorted
    pub fn crops(&self) -> Vec<String> {
        self.known_crops.iter().cloned().collect()
    }

    /// Province keys with a soil profile, sorted
    pub fn provinces(&self) -> Vec<String> {
        let mut provinces: Vec<String> = self.soil.keys().cloned().collect();
        provinces.sort();
        provinces
    }
}
