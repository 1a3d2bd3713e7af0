//! Text extraction helpers applied to listing cards and detail pages.
//!
//! Everything here is pure and synchronous: dates, keyword relevance,
//! description sections, contact emails and location/company heuristics.

pub mod date;
pub mod description;
pub mod email;
pub mod keyword;
pub mod location;

pub use date::{is_within_days, normalize_posted_date, normalize_posted_date_now};
pub use description::{
    extract_years_of_experience, segment_description, DescriptionSections, MAX_SECTION_CHARS,
};
pub use email::{extract_all_emails, extract_email};
pub use keyword::keyword_matches;
pub use location::{infer_company, location_matches};
