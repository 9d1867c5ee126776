//! Main store implementation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use rusqlite::{Connection, OptionalExtension};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

use equipview_core::{DatasetRecord, DatasetSummary};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::models::NewDataset;
use crate::schema;

const SELECT_RECORDS: &str = "SELECT id, uploaded_at, filename, rows_json, stats_json FROM datasets";
const NEWEST_FIRST: &str = "ORDER BY uploaded_at DESC, id DESC";

/// SQLite-backed store that retains the [`CAPACITY`](Store::CAPACITY) most
/// recent uploads.
///
/// Every operation runs under one mutex around the connection. An insert
/// appends and prunes inside a single transaction under that mutex, so no
/// caller ever observes more than `CAPACITY` records, and an evicted record
/// never comes back.
///
/// Retention is FIFO by `uploaded_at` (ties broken by id): reads never affect
/// which record is evicted next.
pub struct Store {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl Store {
    /// Maximum number of retained datasets.
    pub const CAPACITY: usize = 5;

    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Use `clock` for upload timestamps instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }
}

// Write operations
impl Store {
    /// Insert a dataset and prune to capacity as one atomic step.
    pub fn insert(&self, dataset: NewDataset) -> Result<DatasetRecord> {
        self.insert_before(dataset, None)
    }

    /// Like [`insert`](Self::insert), but gives up with
    /// [`Error::DeadlineExceeded`] if `deadline` has passed once the store
    /// lock is held. In that case nothing is written.
    pub fn insert_before(
        &self,
        dataset: NewDataset,
        deadline: Option<Instant>,
    ) -> Result<DatasetRecord> {
        let stats = &dataset.stats;
        if ![stats.avg_flowrate, stats.avg_pressure, stats.avg_temperature]
            .iter()
            .all(|avg| avg.is_finite())
        {
            warn!("Refusing to store {}: non-finite statistics", dataset.filename);
            return Err(Error::NonFiniteStats(dataset.filename));
        }

        let rows_json = serde_json::to_string(&dataset.rows)?;
        let stats_json = serde_json::to_string(&dataset.stats)?;

        let mut conn = self.lock()?;

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!("Deadline passed before storing {}", dataset.filename);
            return Err(Error::DeadlineExceeded);
        }

        let uploaded_at = self.clock.now().to_offset(UtcOffset::UTC);
        let uploaded_at_ns = encode_timestamp(uploaded_at)?;

        // Dropping the transaction without commit rolls everything back.
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO datasets (uploaded_at, filename, rows_json, stats_json)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![uploaded_at_ns, &dataset.filename, rows_json, stats_json],
        )?;
        let id = tx.last_insert_rowid();
        let evicted = prune(&tx, Self::CAPACITY)?;
        tx.commit()?;
        drop(conn);

        info!(
            "Stored dataset {} ({}, {} rows)",
            id,
            dataset.filename,
            dataset.rows.len()
        );
        if !evicted.is_empty() {
            debug!("Evicted datasets {:?}", evicted);
        }

        Ok(DatasetRecord {
            id,
            uploaded_at,
            filename: dataset.filename,
            stats: dataset.stats,
            rows: dataset.rows,
        })
    }

    /// Delete a dataset. Returns `false` if it was not retained.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM datasets WHERE id = ?1", [id])?;
        if deleted > 0 {
            info!("Deleted dataset {}", id);
        }
        Ok(deleted > 0)
    }
}

/// Delete everything beyond the `capacity` newest records, returning the
/// evicted ids oldest last.
fn prune(conn: &Connection, capacity: usize) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM datasets {NEWEST_FIRST} LIMIT -1 OFFSET ?1"
    ))?;
    let evicted = stmt
        .query_map([capacity as i64], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;

    for id in &evicted {
        conn.execute("DELETE FROM datasets WHERE id = ?1", [id])?;
    }

    Ok(evicted)
}

// Read operations
impl Store {
    /// All retained datasets, newest first.
    pub fn list(&self) -> Result<Vec<DatasetRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_RECORDS} {NEWEST_FIRST}"))?;
        let raw = stmt
            .query_map([], RawDataset::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter().map(RawDataset::decode).collect()
    }

    /// Metadata for all retained datasets, newest first. Rows are not decoded.
    pub fn summaries(&self) -> Result<Vec<DatasetSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, uploaded_at, filename FROM datasets {NEWEST_FIRST}"
        ))?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        raw.into_iter()
            .map(|(id, uploaded_at, filename)| -> Result<DatasetSummary> {
                Ok(DatasetSummary {
                    id,
                    filename,
                    uploaded_at: decode_timestamp(uploaded_at)?,
                })
            })
            .collect()
    }

    /// The most recently uploaded dataset, or `None` when the store is empty.
    pub fn latest(&self) -> Result<Option<DatasetRecord>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("{SELECT_RECORDS} {NEWEST_FIRST} LIMIT 1"),
                [],
                RawDataset::from_row,
            )
            .optional()?;
        drop(conn);

        raw.map(RawDataset::decode).transpose()
    }

    /// The dataset with `id`, or `None` if it was evicted or never existed.
    pub fn get(&self, id: i64) -> Result<Option<DatasetRecord>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("{SELECT_RECORDS} WHERE id = ?1"),
                [id],
                RawDataset::from_row,
            )
            .optional()?;
        drop(conn);

        debug!("Lookup of dataset {}: found={}", id, raw.is_some());
        raw.map(RawDataset::decode).transpose()
    }

    /// Number of retained datasets.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM datasets", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether no datasets are retained.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// A row of the `datasets` table before JSON decoding.
struct RawDataset {
    id: i64,
    uploaded_at: i64,
    filename: String,
    rows_json: String,
    stats_json: String,
}

impl RawDataset {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            uploaded_at: row.get(1)?,
            filename: row.get(2)?,
            rows_json: row.get(3)?,
            stats_json: row.get(4)?,
        })
    }

    fn decode(self) -> Result<DatasetRecord> {
        Ok(DatasetRecord {
            id: self.id,
            uploaded_at: decode_timestamp(self.uploaded_at)?,
            filename: self.filename,
            stats: serde_json::from_str(&self.stats_json)?,
            rows: serde_json::from_str(&self.rows_json)?,
        })
    }
}

fn encode_timestamp(at: OffsetDateTime) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos()).map_err(|_| Error::InvalidTimestamp(at.to_string()))
}

fn decode_timestamp(nanos: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|e| Error::InvalidTimestamp(e.to_string()))
}
