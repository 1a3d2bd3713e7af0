use crate::config::BrowserSettings;
use crate::harvest::browser::BrowserDriver;
use crate::harvest::platforms::builtin_profiles;
use crate::harvest::source::BrowserSource;
use crate::traits::ListingSource;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown platform: {requested}. Available: {}", available.join(", "))]
    UnknownPlatform {
        requested: String,
        available: Vec<String>,
    },
}

type SourceFactory = Arc<dyn Fn() -> Arc<dyn ListingSource> + Send + Sync>;

/// Maps platform ids to constructors of their listing source.
///
/// Ids are matched case-insensitively. Registering an id twice replaces the
/// earlier factory.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in job boards backed by `driver`.
    pub fn with_browser(driver: Arc<dyn BrowserDriver>, settings: BrowserSettings) -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            let driver = Arc::clone(&driver);
            let settings = settings.clone();
            registry.register(profile.id, move || {
                Arc::new(BrowserSource::new(profile, Arc::clone(&driver), settings.clone()))
                    as Arc<dyn ListingSource>
            });
        }
        registry
    }

    pub fn register<F>(&mut self, platform: &str, factory: F)
    where
        F: Fn() -> Arc<dyn ListingSource> + Send + Sync + 'static,
    {
        self.factories
            .insert(platform.trim().to_lowercase(), Arc::new(factory));
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownPlatform`] listing the registered ids.
    pub fn create(&self, platform: &str) -> Result<Arc<dyn ListingSource>, RegistryError> {
        self.factories
            .get(&platform.trim().to_lowercase())
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::UnknownPlatform {
                requested: platform.to_string(),
                available: self.platforms(),
            })
    }

    pub fn contains(&self, platform: &str) -> bool {
        self.factories.contains_key(&platform.trim().to_lowercase())
    }

    /// Registered ids in sorted order.
    pub fn platforms(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::browser::{BrowserError, BrowserSession};
    use crate::model::{JobRecord, ListingReference, ScrapeTask};
    use crate::traits::SourceError;
    use async_trait::async_trait;

    struct NoBrowser;

    #[async_trait]
    impl BrowserDriver for NoBrowser {
        async fn open_session(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
            Err(BrowserError::Launch("no browser in tests".into()))
        }
    }

    struct NamedSource(&'static str);

    #[async_trait]
    impl ListingSource for NamedSource {
        fn platform(&self) -> &str {
            self.0
        }

        async fn list_references(
            &self,
            _task: &ScrapeTask,
        ) -> Result<Vec<ListingReference>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_detail(
            &self,
            _task: &ScrapeTask,
            _reference: &ListingReference,
        ) -> Result<Option<JobRecord>, SourceError> {
            Ok(None)
        }
    }

    #[test]
    fn test_create_is_case_insensitive() {
        let mut registry = SourceRegistry::new();
        registry.register("Demo", || Arc::new(NamedSource("Demo")));

        assert!(registry.contains("DEMO"));
        assert_eq!(registry.create("demo").unwrap().platform(), "Demo");
        assert_eq!(registry.platforms(), vec!["demo".to_string()]);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = SourceRegistry::new();
        registry.register("demo", || Arc::new(NamedSource("first")));
        registry.register("demo", || Arc::new(NamedSource("second")));

        assert_eq!(registry.create("demo").unwrap().platform(), "second");
    }

    #[test]
    fn test_unknown_platform_lists_available() {
        let mut registry = SourceRegistry::new();
        registry.register("beta", || Arc::new(NamedSource("Beta")));
        registry.register("alpha", || Arc::new(NamedSource("Alpha")));

        let err = registry.create("monster").err().unwrap();
        assert_eq!(
            err,
            RegistryError::UnknownPlatform {
                requested: "monster".into(),
                available: vec!["alpha".into(), "beta".into()],
            }
        );
        assert_eq!(err.to_string(), "Unknown platform: monster. Available: alpha, beta");
    }

    #[test]
    fn test_with_browser_registers_builtin_platforms() {
        let registry =
            SourceRegistry::with_browser(Arc::new(NoBrowser), BrowserSettings::default());

        assert_eq!(
            registry.platforms(),
            vec!["glassdoor".to_string(), "linkedin".to_string(), "naukri".to_string()]
        );
        assert_eq!(registry.create("LinkedIn").unwrap().platform(), "LinkedIn");
        assert_eq!(registry.create("naukri").unwrap().platform(), "Naukri");
    }
}
