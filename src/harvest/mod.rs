//! Harvest module: browser-backed listing sources and the orchestration
//! pipeline that runs them.
//!
//! - **Browser**: [`browser::BrowserDriver`] boundary to the rendering engine
//! - **Sources**: [`source::BrowserSource`] configured by per-board [`source::PlatformProfile`]s
//! - **Pipeline**: [`pipeline::HarvestPipeline`] concurrent task runner with deduplication

pub mod browser;
#[cfg(feature = "chromium")]
pub mod chromium;
pub mod pipeline;
pub mod platforms;
pub mod source;

pub use browser::{BrowserDriver, BrowserError, BrowserSession, ElementHandle, QueryScope};
pub use pipeline::{
    HarvestPipeline, HarvestReport, HarvestRequest, HarvestStats, PipelineError, SeenUrls,
    TaskOutcome, TaskStatus,
};
pub use source::{BrowserSource, PlatformProfile};
