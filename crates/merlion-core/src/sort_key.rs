//! Sort keys for section titles.
//!
//! Extracted sections arrive in document order; re-sorting by the parsed
//! numbering token recovers the statutory order when titles carry one.
//!
//! # Singapore numbering conventions
//!
//! - Plain numeric: s.1, s.2, ..., s.10
//! - Letter suffix (amendment insertion): s.2A between s.2 and s.3
//! - Multi-letter suffix: s.2AA after s.2A (spreadsheet-column scheme)
//! - Schedules sort after every numbered provision
//! - Titles with no parsable number keep their original relative order,
//!   after everything else

use std::sync::LazyLock;

use regex::Regex;

/// Rank classes for [`SectionKey`]; the numeric order is the sort order.
const RANK_PROVISION: u8 = 0;
const RANK_SCHEDULE: u8 = 1;
const RANK_UNPARSED: u8 = 2;

static TITLE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Rule|Section|SCHEDULE)\s*(\d+)([A-Za-z]*)").expect("static regex")
});

/// Sort key parsed from a composed section title.
///
/// Ordering: numbered provisions first (by number, then letter suffix),
/// then numbered schedules, then unparsable titles. Use with a stable
/// sort so unparsable titles keep document order among themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SectionKey {
    rank: u8,
    number: u64,
    suffix: u64,
}

/// Parse the sort key for a composed title like `"Section 2A. Powers"`.
pub fn section_sort_key(title: &str) -> SectionKey {
    let Some(caps) = TITLE_NUMBER.captures(title) else {
        return SectionKey {
            rank: RANK_UNPARSED,
            number: 0,
            suffix: 0,
        };
    };

    // Numbers too large for u64 have no statutory meaning; treat as unparsable.
    let Ok(number) = caps[1].parse::<u64>() else {
        return SectionKey {
            rank: RANK_UNPARSED,
            number: 0,
            suffix: 0,
        };
    };

    let rank = if title.to_ascii_lowercase().contains("schedule") {
        RANK_SCHEDULE
    } else {
        RANK_PROVISION
    };

    SectionKey {
        rank,
        number,
        suffix: letter_suffix_value(&caps[2]),
    }
}

/// Spreadsheet-column value of a letter suffix: A=1, ..., Z=26, AA=27.
///
/// Empty suffix is 0, so `s.2` sorts before `s.2A`.
fn letter_suffix_value(suffix: &str) -> u64 {
    suffix
        .bytes()
        .map(|b| b.to_ascii_uppercase())
        .filter(u8::is_ascii_uppercase)
        .fold(0u64, |acc, b| acc * 26 + u64::from(b - b'A') + 1)
}
