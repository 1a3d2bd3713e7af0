use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("hard-coded email pattern must compile")
});

/// Returns the first email address in `text`, if any.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|found| found.as_str().to_string())
}

/// Returns every distinct email address in first-seen order.
///
/// Addresses differing only by case are reported once, with the casing of
/// their first occurrence.
pub fn extract_all_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL
        .find_iter(text)
        .map(|found| found.as_str())
        .filter(|email| seen.insert(email.to_lowercase()))
        .map(str::to_string)
        .collect()
}
