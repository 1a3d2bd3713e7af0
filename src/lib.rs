pub mod config;
pub mod executor;
pub mod export;
pub mod extract;
pub mod harvest;
pub mod logging;
pub mod model;
pub mod registry;
pub mod traits;

// Re-export common types for convenience
pub use config::*;
pub use executor::*;
pub use export::*;
pub use harvest::{HarvestPipeline, HarvestReport, HarvestRequest, HarvestStats, PipelineError};
pub use model::*;
pub use registry::*;
pub use traits::*;
