//! Name and prefix helpers shared by the storage operations.

use once_cell::sync::Lazy;
use regex::Regex;

static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^-\w.]").expect("static pattern"));

/// Turn an arbitrary string into a name safe for the flat object
/// namespace: trim surrounding whitespace, spaces become underscores and
/// anything outside `[-\w.]` is dropped.
pub fn get_valid_filename(name: &str) -> String {
    let name = name.trim().replace(' ', "_");
    INVALID_FILENAME_CHARS.replace_all(&name, "").into_owned()
}

/// Listing prefixes address "directories" in the flat namespace, so a
/// non-empty prefix always carries a trailing separator.
pub fn normalize_prefix(prefix: &str) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        format!("{}/", prefix)
    } else {
        prefix.to_string()
    }
}
