//! Fixed-capacity dataset retention for EquipView.
//!
//! [`Store`] keeps the five most recent uploads in SQLite and evicts the
//! oldest on insert. Insert and prune are one transaction under one lock, so
//! concurrent readers never see more than [`Store::CAPACITY`] records.
//!
//! # Example
//!
//! ```
//! use equipview_core::{AliasTable, normalize};
//! use equipview_store::{NewDataset, Store};
//!
//! let store = Store::open_in_memory()?;
//! let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\nPump,Pump,1,2,3\n";
//! let rows = normalize(csv.as_bytes(), &AliasTable::default()).expect("valid csv");
//!
//! let record = store.insert(NewDataset::new("plant.csv", rows))?;
//! assert_eq!(store.latest()?.map(|r| r.id), Some(record.id));
//! # Ok::<(), equipview_store::Error>(())
//! ```

mod clock;
mod error;
mod models;
mod schema;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use models::NewDataset;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/equipview/datasets.db`
/// - macOS: `~/Library/Application Support/equipview/datasets.db`
/// - Windows: `C:\Users\<user>\AppData\Local\equipview\datasets.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("equipview")
        .join("datasets.db")
}
