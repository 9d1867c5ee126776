//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state.
///
/// The store inside the pipeline serializes its own access, so handlers
/// share the state through an `Arc` without any outer lock.
pub struct AppState {
    /// Upload and query operations.
    pub pipeline: Pipeline,
    /// Configuration loaded at startup.
    pub config: Config,
}

impl AppState {
    /// Create new application state.
    pub fn new(pipeline: Pipeline, config: Config) -> Arc<Self> {
        Arc::new(Self { pipeline, config })
    }
}
