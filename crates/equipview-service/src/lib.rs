//! Upload pipeline and HTTP REST API for equipment datasets.
//!
//! This crate provides a service that:
//! - Accepts equipment CSV uploads and normalizes their columns
//! - Computes summary statistics for each upload
//! - Keeps the five most recent datasets in a local database
//! - Exposes a REST API for querying and exporting them
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/datasets` - Upload a CSV file
//! - `GET /api/datasets` - List retained datasets
//! - `GET /api/datasets/latest` - Newest dataset with rows and stats
//! - `GET /api/datasets/{id}` - One dataset
//! - `DELETE /api/datasets/{id}` - Delete a dataset
//! - `GET /api/datasets/{id}/csv` - Export a dataset as CSV
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/equipview/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [storage]
//! path = "~/.local/share/equipview/datasets.db"
//!
//! [ingest]
//! timeout_ms = 10000
//! max_upload_bytes = 10485760
//!
//! [aliases]
//! "Flow (m3/h)" = "flowrate"
//! ```

pub mod api;
pub mod config;
pub mod pipeline;
pub mod state;

pub use config::{
    Config, ConfigError, IngestConfig, ServerConfig, StorageConfig, ValidationError,
};
pub use pipeline::{Pipeline, PipelineError};
pub use state::AppState;
