//! Text normalization shared by the import pipeline.

/// Trims the value and returns `None` when nothing is left.
pub fn trim_to_option(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Key used for case-insensitive comparison of names.
///
/// Surrounding whitespace is ignored so that `"Smith Family "` and
/// `"smith family"` fold to the same key.
pub fn fold_key(value: &str) -> String {
    value.trim().to_lowercase()
}
