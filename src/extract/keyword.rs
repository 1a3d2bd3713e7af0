/// Abbreviations that listing titles commonly spell out.
const KEYWORD_VARIANTS: &[(&str, &[&str])] = &[
    ("sre", &["site reliability engineer", "site reliability", "sre"]),
    ("devops", &["devops", "dev ops", "development operations"]),
    ("ml", &["machine learning", "ml"]),
    ("ai", &["artificial intelligence", "ai"]),
    ("qa", &["quality assurance", "qa", "quality engineer"]),
    ("ui", &["user interface", "ui"]),
    ("ux", &["user experience", "ux"]),
];

/// Checks whether a listing title is relevant for the searched keyword.
///
/// Matching is case-insensitive and tries, in order: plain substring, known
/// abbreviation expansions, and for multi-word keywords every word appearing
/// somewhere in the title.
pub fn keyword_matches(title: &str, keyword: &str) -> bool {
    let title = title.to_lowercase();
    let keyword = keyword.trim().to_lowercase();

    if title.contains(&keyword) {
        return true;
    }

    let variant_hit = KEYWORD_VARIANTS
        .iter()
        .find(|(abbreviation, _)| *abbreviation == keyword)
        .is_some_and(|(_, expansions)| expansions.iter().any(|phrase| title.contains(phrase)));
    if variant_hit {
        return true;
    }

    let words: Vec<&str> = keyword.split_whitespace().collect();
    words.len() > 1 && words.iter().all(|word| title.contains(word))
}
