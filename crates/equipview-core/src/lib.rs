//! Equipment reading normalization and aggregation.
//!
//! This crate holds the pure part of EquipView: the typed data model, the
//! header alias table, the CSV [`normalize`] step and the [`aggregate`] step.
//! Nothing here performs I/O or holds shared state.
//!
//! # Example
//!
//! ```
//! use equipview_core::{AliasTable, Field, NormalizeError, aggregate, normalize};
//!
//! let csv = "equipment name,TYPE,flowrate,pressure,temperature\nPump,Pump,1,2,3\n";
//! let rows = normalize(csv.as_bytes(), &AliasTable::default())?;
//! assert_eq!(aggregate(&rows).total_equipment, 1);
//!
//! let missing = normalize(b"Equipment Name,Type,Flowrate,Temperature\n", &AliasTable::default());
//! match missing {
//!     Err(NormalizeError::Schema(err)) => assert_eq!(err.missing, vec![Field::Pressure]),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok::<(), NormalizeError>(())
//! ```

pub mod aggregate;
pub mod error;
pub mod export;
pub mod field;
pub mod model;
pub mod normalize;

pub use aggregate::aggregate;
pub use error::{ExportError, NormalizeError, ParseError, SchemaError};
pub use export::to_csv;
pub use field::{AliasTable, Field, UnknownField};
pub use model::{DatasetRecord, DatasetSummary, NonFiniteValue, Row, Stats};
pub use normalize::normalize;
