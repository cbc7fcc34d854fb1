//! DataFrame column helpers with validation
//!
//! Explicit checks so a malformed records file fails at startup with the
//! missing column named, instead of deep inside a group-by.

use polars::prelude::*;
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;

/// Verify that every required column is present
///
/// # Errors
/// Returns error naming the first missing column and listing the available ones.
pub fn require_columns(df: &DataFrame, columns: &[&str], context: &str) -> Result<()> {
    let actual_cols: HashSet<String> = df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    for &expected in columns {
        if !actual_cols.contains(expected) {
            let mut available: Vec<&String> = actual_cols.iter().collect();
            available.sort();
            return Err(anyhow!(
                "{}: Missing expected column '{}'. Available columns: {:?}",
                context, expected, available
            ));
        }
    }

    Ok(())
}

/// Read a column as owned `f64` values, casting integer columns
///
/// CSV inference turns whole-number columns (e.g. `Clay_Ratio` = 30) into
/// Int64, so every numeric read goes through a cast.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let cast = df.column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;

    let values = cast.f64()
        .with_context(|| format!("Column '{}' is not f64 after cast", name))?
        .into_iter()
        .collect();

    Ok(values)
}

/// Read a column as owned strings
pub fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let cast = df.column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", name))?;

    let values = cast.str()
        .with_context(|| format!("Column '{}' is not string type", name))?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();

    Ok(values)
}
