use crate::harvest::source::PlatformProfile;
use crate::model::ScrapeTask;
use url::Url;

/// Naukri expects the keyword as a hyphenated path slug as well as a query.
fn search_url(task: &ScrapeTask) -> Result<Url, url::ParseError> {
    let slug = task.keyword.split_whitespace().collect::<Vec<_>>().join("-");
    let job_age = task.lookback_days.to_string();
    Url::parse_with_params(
        &format!("https://www.naukri.com/{}-jobs", slug),
        &[
            ("k", task.keyword.as_str()),
            ("l", task.location.as_str()),
            ("jobAge", job_age.as_str()),
        ],
    )
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "naukri",
    name: "Naukri",
    base_url: "https://www.naukri.com",
    search_url,
    results_ready: &[".srp-jobtuple-wrapper", "article.jobTuple", ".cust-job-tuple", "article"],
    card: &[".srp-jobtuple-wrapper", "article.jobTuple", ".cust-job-tuple", "article"],
    card_title: &["a.title", ".title", "a[title]"],
    card_link: &["a.title", "a[title]"],
    load_more_script: None,
    dismiss_overlay_script: Some(
        "(() => { const b = Array.from(document.querySelectorAll('button')) \
         .find(el => el.textContent.includes('Got it')); \
         if (b) { b.click(); return true; } return false; })()",
    ),
    detail_ready: &["h1.jd-header-title", ".job-desc", "article.jobDetails", "h1", "article"],
    expand_description_script: None,
    title: &["h1.jd-header-title", "h1"],
    company: &[
        ".jd-header-comp-name a",
        ".jd-header-comp-name",
        "a.comp-name",
        "a[class*='comp']",
    ],
    location: &[".jd-header-loc", ".location"],
    description: &[
        ".job-desc",
        ".dang-inner-html",
        "div[class*='job-description']",
        "article.jobDetails",
        "article",
        "main",
    ],
    posted: &[".job-post-day", ".jd-stats span"],
    auth_wall_markers: &["Login to continue", "Register to apply"],
    infer_company_from_description: true,
};
