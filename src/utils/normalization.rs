//! Key Normalization Utilities
//!
//! Province keys are compared case-insensitively and whitespace-trimmed.
//! Crop names are stored verbatim; the folded form is only used as the
//! second step of crop resolution (see `LookupTables::resolve_crop`).

/// Normalize a province name into its lookup key
///
/// `"  Jawa Barat "` → `"jawa barat"`
pub fn normalize_province(province: &str) -> String {
    province.trim().to_lowercase()
}

/// Fold a crop name for case-insensitive comparison
pub fn fold_crop_key(crop: &str) -> String {
    crop.trim().to_lowercase()
}

/// Split a stored crop name into its alias components
///
/// Stored names such as `"Ubi Kayu/Singkong"` are reachable through either
/// half. Names without a `/` yield nothing.
pub fn crop_alias_parts(crop: &str) -> Vec<String> {
    if !crop.contains('/') {
        return Vec::new();
    }

    crop.split('/')
        .map(fold_crop_key)
        .filter(|s| !s.is_empty())
        .collect()
}
