pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod storage;

// Layered boundaries: ports the pipeline depends on, and their adapters
pub mod app;
pub mod infra;

pub use error::{ImportError, InventoryError, Result, ValidationError};
pub use pipeline::InventoryStagingPipeline;
