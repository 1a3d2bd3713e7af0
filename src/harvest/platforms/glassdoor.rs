use crate::harvest::source::PlatformProfile;
use crate::model::ScrapeTask;
use url::Url;

fn search_url(task: &ScrapeTask) -> Result<Url, url::ParseError> {
    let query = format!("{} {}", task.keyword, task.location);
    let from_age = task.lookback_days.to_string();
    Url::parse_with_params(
        "https://www.glassdoor.com/Job/jobs.htm",
        &[("sc.keyword", query.as_str()), ("fromAge", from_age.as_str())],
    )
}

pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "glassdoor",
    name: "Glassdoor",
    base_url: "https://www.glassdoor.com",
    search_url,
    results_ready: &[
        "li[data-test='jobListing']",
        ".react-job-listing",
        ".JobsList_jobListItem__JBBUV",
    ],
    card: &[
        "li[data-test='jobListing']",
        ".react-job-listing",
        ".JobsList_jobListItem__JBBUV",
    ],
    card_title: &["a[data-test='job-title']", ".JobCard_jobTitle__GLrKV", ".job-title"],
    card_link: &["a[data-test='job-title']", ".JobCard_jobTitle__GLrKV", ".job-title"],
    load_more_script: Some(
        "(() => { const b = document.querySelector(\"button[data-test='load-more']\"); \
         if (b) { b.click(); return true; } return false; })()",
    ),
    dismiss_overlay_script: Some(
        "(() => { const b = document.querySelector(\"button.CloseButton, [alt='Close']\"); \
         if (b) { b.click(); return true; } return false; })()",
    ),
    detail_ready: &[
        "div[data-test='job-title']",
        "div#JobDescriptionContainer",
        "h1",
    ],
    expand_description_script: Some(
        "(() => { const b = document.querySelector(\"button[class*='showMore']\"); \
         if (b) { b.click(); return true; } return false; })()",
    ),
    title: &["div[data-test='job-title']", "h1", "h2"],
    company: &[
        "div[data-test='employer-name']",
        "a[data-test='employer-name']",
        "div[class*='employer']",
    ],
    location: &["div[data-test='location']", "div[class*='location']"],
    description: &[
        "div#JobDescriptionContainer",
        "div[class*='JobDetails_jobDescription']",
        "div[class*='jobDescriptionContent']",
        "div[data-test='job-description']",
    ],
    posted: &["div[data-test='job-age']", ".JobDetails_jobPostingDate__Mmbjj"],
    auth_wall_markers: &["Sign In", "Log In", "Join Glassdoor"],
    infer_company_from_description: false,
};
