//! Splits a free-text job description into responsibilities and skills
//! sections and pulls out the requested years of experience.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept per extracted section.
pub const MAX_SECTION_CHARS: usize = 2000;

const TRUNCATION_MARKER: &str = "...";

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|source| {
            Regex::new(&format!("(?i){}", source)).expect("hard-coded heading pattern must compile")
        })
        .collect()
}

static RESPONSIBILITY_HEADINGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(?:key )?responsibilities:?",
        r"what you(?:'ll| will) do:?",
        r"duties:?",
        r"role overview:?",
        r"job description:?",
    ])
});

static SKILL_HEADINGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(?:required )?skills:?",
        r"qualifications:?",
        r"requirements:?",
        r"what we(?:'re| are) looking for:?",
        r"who you are:?",
        r"must haves?:?",
    ])
});

/// Ranged patterns yield "N-M years"; the others yield "N+ years".
static EXPERIENCE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\+?\s*(?:to|-|–)\s*(\d+)\+?\s*years?").expect("valid"));
static EXPERIENCE_MINIMUMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    patterns(&[
        r"(\d+)\+\s*years?",
        r"minimum\s+of\s+(\d+)\+?\s*years?",
        r"at\s+least\s+(\d+)\+?\s*years?",
        r"(\d+)\s*years?\s+of\s+experience",
    ])
});

/// Structured sections pulled out of a description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionSections {
    pub responsibilities: Option<String>,
    pub skills: Option<String>,
    pub years_of_experience: Option<String>,
}

/// Segments `text` by its responsibilities and skills headings.
///
/// For each group the first pattern (in list order) that occurs anywhere
/// marks the heading. The section that starts first runs until the other
/// heading; the later one runs to the end of the text. A missing heading
/// leaves its field `None`.
pub fn segment_description(text: &str) -> DescriptionSections {
    if text.trim().is_empty() {
        return DescriptionSections::default();
    }

    let responsibilities_at = find_heading(&RESPONSIBILITY_HEADINGS, text);
    let skills_at = find_heading(&SKILL_HEADINGS, text);

    let (responsibilities, skills) = match (responsibilities_at, skills_at) {
        (Some(resp), Some(skill)) if resp.0 < skill.0 => (
            slice_between(text, resp.1, skill.0),
            slice_between(text, skill.1, text.len()),
        ),
        (Some(resp), Some(skill)) => (
            slice_between(text, resp.1, text.len()),
            slice_between(text, skill.1, resp.0),
        ),
        (Some(resp), None) => (slice_between(text, resp.1, text.len()), ""),
        (None, Some(skill)) => ("", slice_between(text, skill.1, text.len())),
        (None, None) => ("", ""),
    };

    DescriptionSections {
        responsibilities: clip_section(responsibilities),
        skills: clip_section(skills),
        years_of_experience: extract_years_of_experience(text),
    }
}

/// Finds the first experience requirement and normalizes it to
/// `"N-M years"` or `"N+ years"`.
pub fn extract_years_of_experience(text: &str) -> Option<String> {
    if let Some(caps) = EXPERIENCE_RANGE.captures(text) {
        return Some(format!("{}-{} years", &caps[1], &caps[2]));
    }
    EXPERIENCE_MINIMUMS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|caps| format!("{}+ years", &caps[1]))
}

fn find_heading(headings: &[Regex], text: &str) -> Option<(usize, usize)> {
    headings
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| (found.start(), found.end()))
}

fn slice_between(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    text.get(start..end).unwrap_or("").trim()
}

fn clip_section(section: &str) -> Option<String> {
    if section.is_empty() {
        return None;
    }
    if section.chars().count() <= MAX_SECTION_CHARS {
        return Some(section.to_string());
    }
    let mut clipped: String = section.chars().take(MAX_SECTION_CHARS).collect();
    clipped.push_str(TRUNCATION_MARKER);
    Some(clipped)
}
