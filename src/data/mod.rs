//! Data module - Sheet loading, cleaning and fee merging

mod cleaner;
mod loader;
pub(crate) mod merger;
pub mod model;
mod pipeline;

pub use loader::{LoadCache, LoadError};
pub use model::EnrichedTable;
pub use pipeline::{Pipeline, PipelineError};
