//! The upload and query operations exposed to the HTTP layer.
//!
//! An upload runs normalize → aggregate → store insert. "Latest" re-runs the
//! aggregation over the stored rows so the returned statistics always match
//! the returned rows.

use std::time::Instant;

use tracing::{debug, info, warn};

use equipview_core::{
    AliasTable, DatasetRecord, DatasetSummary, ExportError, NormalizeError, ParseError,
    SchemaError, normalize, to_csv,
};
use equipview_store::{NewDataset, Store};

/// Errors surfaced by [`Pipeline`] operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Required columns are missing from the upload.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The upload is not well-formed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// No retained dataset has this id.
    #[error("Dataset {0} not found")]
    NotFound(i64),

    /// The caller's deadline passed before the dataset was stored.
    #[error("Deadline exceeded before the dataset was stored")]
    DeadlineExceeded,

    /// Storage failure.
    #[error("Store error: {0}")]
    Store(equipview_store::Error),

    /// Failed to render an export.
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<NormalizeError> for PipelineError {
    fn from(e: NormalizeError) -> Self {
        match e {
            NormalizeError::Schema(e) => PipelineError::Schema(e),
            NormalizeError::Parse(e) => PipelineError::Parse(e),
        }
    }
}

impl From<equipview_store::Error> for PipelineError {
    fn from(e: equipview_store::Error) -> Self {
        match e {
            equipview_store::Error::DeadlineExceeded => PipelineError::DeadlineExceeded,
            other => PipelineError::Store(other),
        }
    }
}

/// Ingest and query operations over a [`Store`].
pub struct Pipeline {
    store: Store,
    aliases: AliasTable,
}

impl Pipeline {
    /// Create a pipeline that resolves headers through `aliases`.
    pub fn new(store: Store, aliases: AliasTable) -> Self {
        Self { store, aliases }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Normalize, aggregate and store an upload.
    ///
    /// If `deadline` passes before the store write begins, nothing is stored
    /// and [`PipelineError::DeadlineExceeded`] is returned.
    pub fn ingest(
        &self,
        raw: &[u8],
        filename: &str,
        deadline: Option<Instant>,
    ) -> Result<DatasetRecord, PipelineError> {
        let rows = normalize(raw, &self.aliases).inspect_err(|e| {
            warn!("Rejected upload {}: {}", filename, e);
        })?;
        debug!("Normalized {} rows from {}", rows.len(), filename);

        let record = self
            .store
            .insert_before(NewDataset::new(filename, rows), deadline)?;
        info!(
            "Ingested {} as dataset {} ({} rows)",
            filename, record.id, record.stats.total_equipment
        );
        Ok(record)
    }

    /// The most recent dataset with statistics recomputed from its rows, or
    /// `None` when nothing is stored.
    pub fn latest(&self) -> Result<Option<DatasetRecord>, PipelineError> {
        Ok(self.store.latest()?.map(DatasetRecord::refreshed))
    }

    /// Summaries of every retained dataset, newest first.
    pub fn list_all(&self) -> Result<Vec<DatasetSummary>, PipelineError> {
        Ok(self.store.summaries()?)
    }

    /// A retained dataset by id.
    pub fn get(&self, id: i64) -> Result<DatasetRecord, PipelineError> {
        self.store.get(id)?.ok_or(PipelineError::NotFound(id))
    }

    /// Delete a retained dataset.
    pub fn delete(&self, id: i64) -> Result<(), PipelineError> {
        if self.store.remove(id)? {
            Ok(())
        } else {
            Err(PipelineError::NotFound(id))
        }
    }

    /// A retained dataset's rows as CSV.
    pub fn export_csv(&self, id: i64) -> Result<Vec<u8>, PipelineError> {
        let record = self.get(id)?;
        Ok(to_csv(&record.rows)?)
    }
}
