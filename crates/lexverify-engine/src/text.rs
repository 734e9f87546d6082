//! Verbatim phrase matching over clause text.
//!
//! "Verbatim" here means case-insensitive with runs of whitespace collapsed;
//! no stemming and no synonym expansion.

/// Lowercase and collapse whitespace.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `haystack` contains `needle` verbatim. An empty needle never matches.
pub fn mentions(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    !needle.is_empty() && normalize(haystack).contains(&needle)
}

/// Whether two labels name the same thing.
pub fn same_label(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}
