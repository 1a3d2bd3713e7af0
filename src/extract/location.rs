//! Heuristics applied to fields read off a detail page.

use once_cell::sync::Lazy;
use regex::Regex;

const REMOTE_MARKERS: &[&str] = &["remote", "work from home"];

/// Relaxed check that a reported job location fits the searched one.
///
/// Matches when the searched location is a case-insensitive substring of the
/// reported one, when any searched word appears in it, or when the listing is
/// remote. The per-word check is substring based, so short tokens can match
/// unrelated places ("US" is found inside "Austin").
pub fn location_matches(reported: &str, searched: &str) -> bool {
    let reported = reported.to_lowercase();
    let searched = searched.to_lowercase();

    REMOTE_MARKERS.iter().any(|marker| reported.contains(marker))
        || reported.contains(searched.trim())
        || searched
            .split_whitespace()
            .any(|word| reported.contains(word))
}

static RATING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.\d+").expect("valid"));
static REVIEW_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+\s+reviews?").expect("valid"));
static NOT_A_COMPANY: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\d+\s*-\s*\d+\s*years?$",
        r"(?i)^not disclosed$",
        r"(?i)^hybrid$",
        r"(?i)^remote$",
        r"(?i)^posted:",
        r"(?i)^applicants:",
        r"(?i)^openings:",
    ]
    .iter()
    .map(|source| Regex::new(source).expect("valid"))
    .collect()
});

/// Guesses the hiring company from the header lines of a description.
///
/// The first line is assumed to be the job title. The next four non-empty
/// lines are cleaned of ratings and review counts, and the first one that
/// looks like a name is returned.
pub fn infer_company(description: &str) -> Option<String> {
    description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(5)
        .skip(1)
        .map(|line| {
            let cleaned = RATING.replace_all(line, "");
            REVIEW_COUNT.replace_all(&cleaned, "").trim().to_string()
        })
        .find(|candidate| {
            let length = candidate.chars().count();
            length > 2
                && length < 100
                && !NOT_A_COMPANY.iter().any(|pattern| pattern.is_match(candidate))
        })
}
