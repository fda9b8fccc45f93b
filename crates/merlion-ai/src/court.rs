//! Canonical court-name classification.
//!
//! Only binding-precedent courts map to a canonical name; anything else
//! classifies to `None`. The pattern table is ordered and first match
//! wins, so the bare "high court" pattern must stay last or it would
//! shadow the appellate and general divisions.

use std::sync::LazyLock;

use regex::Regex;

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$.*?\$\$|&emsp;|fig\.\s*\d*|\d+").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

static COURT_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"court\s+of\s+appeal", "Court of Appeal"),
        (
            r"high\s+court\s+appellate\s+division",
            "High Court (Appellate Division)",
        ),
        (
            r"high\s+court\s+general\s+division",
            "High Court (General Division)",
        ),
        (
            r"singapore\s+international\s+commercial\s+court",
            "Singapore International Commercial Court (SICC)",
        ),
        (r"family\s+justice\s+courts", "Family Justice Courts"),
        (
            r"court\s+of\s+three\s+judges|court\s+of\s+3\s+judges",
            "Court of Three Judges",
        ),
        // Keep last: would otherwise shadow the division-specific names.
        (r"high\s+court", "High Court"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).expect("static regex"), name))
    .collect()
});

/// Classify a raw court-name string to its canonical binding-precedent
/// court, or `None` when the court is not recognized as binding.
pub fn standardize_court_name(raw: &str) -> Option<&'static str> {
    if raw.trim().is_empty() {
        return None;
    }
    let cleaned = MARKUP.replace_all(raw, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim().to_lowercase();

    COURT_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&cleaned))
        .map(|(_, name)| *name)
}
