//! Text helpers shared by the store and the conflict detector.

/// Normalise a display name into a graph identifier:
/// spaces become underscores, everything is lowercased.
pub fn safe_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// Split a conclusion into sentences on ".".
///
/// Every fragment is trimmed and re-terminated with ".". Fragments that are
/// empty after trimming (e.g. the tail after a final full stop, or "..")
/// are dropped rather than turned into a lone ".".
pub fn split_sentences(conclusion: &str) -> Vec<String> {
    conclusion
        .trim()
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s}."))
        .collect()
}
