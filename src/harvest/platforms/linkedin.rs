use crate::harvest::source::PlatformProfile;
use crate::model::ScrapeTask;
use url::Url;

const SECONDS_PER_DAY: u64 = 86_400;

fn search_url(task: &ScrapeTask) -> Result<Url, url::ParseError> {
    let posted_within = format!("r{}", u64::from(task.lookback_days) * SECONDS_PER_DAY);
    Url::parse_with_params(
        "https://www.linkedin.com/jobs/search",
        &[
            ("keywords", task.keyword.as_str()),
            ("location", task.location.as_str()),
            ("f_TPR", posted_within.as_str()),
        ],
    )
}

/// Public (logged-out) LinkedIn job search.
pub const PROFILE: PlatformProfile = PlatformProfile {
    id: "linkedin",
    name: "LinkedIn",
    base_url: "https://www.linkedin.com",
    search_url,
    results_ready: &["ul.jobs-search__results-list", "li"],
    card: &["ul.jobs-search__results-list > li", "li"],
    card_title: &[
        ".base-search-card__title",
        "h3.base-search-card__title",
        "a.job-card-list__title",
    ],
    card_link: &[".base-card__full-link", "a[href*='/jobs/view/']"],
    load_more_script: Some(
        "(() => { const b = document.querySelector('button.infinite-scroller__show-more-button'); \
         if (b && b.offsetParent !== null) { b.click(); return true; } return false; })()",
    ),
    dismiss_overlay_script: Some(
        "(() => { const b = document.querySelector('button.modal__dismiss'); \
         if (b) { b.click(); return true; } return false; })()",
    ),
    detail_ready: &["h1.top-card-layout__title", "h1.topcard__title", "h1"],
    expand_description_script: Some(
        "(() => { const b = document.querySelector('button.show-more-less-html__button--more'); \
         if (b) { b.click(); return true; } return false; })()",
    ),
    title: &["h1.top-card-layout__title", "h1.topcard__title", "h1"],
    company: &[
        "a.topcard__org-name-link",
        ".topcard__org-name-link",
        "a.sub-nav-cta__optional-url",
    ],
    location: &["span.topcard__flavor--bullet"],
    description: &["div.show-more-less-html__markup", "div.description__text"],
    posted: &["span.posted-time-ago__text"],
    auth_wall_markers: &["Join LinkedIn", "Sign In", "Sign Up", "Log In"],
    infer_company_from_description: false,
};
