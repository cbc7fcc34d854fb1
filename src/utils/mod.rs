//! Utility modules for the yield engine
//!
//! Contains shared functionality used across the loaders and the engine:
//! - Normalization: Province/crop key folding
//! - DataFrame helpers: Column validation and typed extraction

pub mod normalization;
pub mod lazy_helpers;

// Re-export commonly used helpers
pub use normalization::{normalize_province, fold_crop_key, crop_alias_parts};
pub use lazy_helpers::{require_columns, column_as_f64, column_as_strings};
