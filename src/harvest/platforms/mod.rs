//! Built-in job board profiles.

pub mod glassdoor;
pub mod linkedin;
pub mod naukri;

use crate::harvest::source::PlatformProfile;

/// Every profile shipped with the crate.
pub fn builtin_profiles() -> [PlatformProfile; 3] {
    [linkedin::PROFILE, glassdoor::PROFILE, naukri::PROFILE]
}
