//! Posted-date normalization.
//!
//! Listing sites report ages as relative phrases ("3 days ago", "30+ days
//! ago", "Just posted") or as absolute dates in a handful of layouts. Both are
//! normalized to an ISO `YYYY-MM-DD` string relative to a caller-supplied
//! `today`, which keeps the functions deterministic under test.

use chrono::{Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

const ISO_FORMAT: &str = "%Y-%m-%d";

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hard-coded date pattern must compile")
}

static HOURS_AGO: Lazy<Regex> = Lazy::new(|| regex(r"(\d+)\s*(?:hour|hr)s?\s*ago"));
static DAYS_AGO: Lazy<Regex> = Lazy::new(|| regex(r"(\d+)\s*(?:day|d)s?\s*ago"));
static WEEKS_AGO: Lazy<Regex> = Lazy::new(|| regex(r"(\d+)\s*(?:week|wk)s?\s*ago"));
static MONTHS_AGO: Lazy<Regex> = Lazy::new(|| regex(r"(\d+)\s*(?:month|mo)s?\s*ago"));
static OVER_DAYS_AGO: Lazy<Regex> = Lazy::new(|| regex(r"over\s+(\d+)\s*(?:day|d)s?\s*ago"));
static PLUS_DAYS_AGO: Lazy<Regex> = Lazy::new(|| regex(r"(\d+)\+\s*(?:day|d)s?\s*ago"));

static ISO_DATE: Lazy<Regex> = Lazy::new(|| regex(r"(\d{4})-(\d{2})-(\d{2})"));
static US_DATE: Lazy<Regex> = Lazy::new(|| regex(r"(\d{2})/(\d{2})/(\d{4})"));
static EU_DATE: Lazy<Regex> = Lazy::new(|| regex(r"(\d{2})-(\d{2})-(\d{4})"));

/// Normalizes a posted-date phrase against `today`.
///
/// Patterns are tried in a fixed priority order: today/just now, yesterday,
/// hours, days, weeks, months, "over N days", "N+ days", then absolute
/// `YYYY-MM-DD`, `MM/DD/YYYY` and `DD-MM-YYYY`. Returns `None` when nothing
/// matches.
pub fn normalize_posted_date(text: &str, today: NaiveDate) -> Option<String> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    let resolved = resolve_relative(&lower, today).or_else(|| resolve_absolute(text));
    if resolved.is_none() {
        debug!(input = text, "Could not parse date string");
    }
    resolved.map(|date| date.format(ISO_FORMAT).to_string())
}

/// [`normalize_posted_date`] against the local calendar date.
pub fn normalize_posted_date_now(text: &str) -> Option<String> {
    normalize_posted_date(text, Local::now().date_naive())
}

fn resolve_relative(lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    if ["today", "just now", "just posted"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return Some(today);
    }

    if lower.contains("yesterday") {
        return days_before(today, 1);
    }

    if let Some(hours) = first_number(&HOURS_AGO, lower) {
        return days_before(today, hours / 24);
    }

    // Also catches "over N days ago", which ranks below the plain days rule.
    if let Some(days) = first_number(&DAYS_AGO, lower) {
        return days_before(today, days);
    }

    if let Some(weeks) = first_number(&WEEKS_AGO, lower) {
        return days_before(today, weeks.checked_mul(7)?);
    }

    if let Some(months) = first_number(&MONTHS_AGO, lower) {
        return days_before(today, months.checked_mul(30)?);
    }

    if let Some(days) = first_number(&OVER_DAYS_AGO, lower) {
        return days_before(today, days.checked_add(1)?);
    }

    if let Some(days) = first_number(&PLUS_DAYS_AGO, lower) {
        return days_before(today, days);
    }

    None
}

fn resolve_absolute(text: &str) -> Option<NaiveDate> {
    let candidates: [(&Lazy<Regex>, fn(&[u32; 3]) -> (i32, u32, u32)); 3] = [
        (&ISO_DATE, |g| (g[0] as i32, g[1], g[2])),
        (&US_DATE, |g| (g[2] as i32, g[0], g[1])),
        (&EU_DATE, |g| (g[2] as i32, g[1], g[0])),
    ];

    for (pattern, order) in candidates {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let mut groups = [0u32; 3];
        for (slot, index) in groups.iter_mut().zip(1..=3) {
            *slot = caps.get(index)?.as_str().parse().ok()?;
        }
        let (year, month, day) = order(&groups);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    None
}

fn first_number(pattern: &Regex, text: &str) -> Option<u64> {
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}

fn days_before(today: NaiveDate, days: u64) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(days))
}

/// Returns `true` when `posted_date` (ISO) is at most `days` old.
///
/// Missing or unparseable dates count as recent so that listings are not
/// dropped just because a site hid the posting age.
pub fn is_within_days(posted_date: Option<&str>, days: u32, today: NaiveDate) -> bool {
    let Some(raw) = posted_date else {
        return true;
    };
    match NaiveDate::parse_from_str(raw, ISO_FORMAT) {
        Ok(posted) => today.signed_duration_since(posted).num_days() <= i64::from(days),
        Err(e) => {
            debug!(input = raw, error = %e, "Error checking date range");
            true
        }
    }
}
