//! Input model for the store.

use equipview_core::{Row, Stats, aggregate};

/// An upload ready to be stored.
///
/// The store assigns `id` and `uploaded_at` on insert. Statistics are computed
/// here from the rows, so a stored snapshot always matches its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataset {
    pub(crate) filename: String,
    pub(crate) rows: Vec<Row>,
    pub(crate) stats: Stats,
}

impl NewDataset {
    /// Prepare `rows` for insertion under `filename`.
    pub fn new(filename: impl Into<String>, rows: Vec<Row>) -> Self {
        let stats = aggregate(&rows);
        Self {
            filename: filename.into(),
            rows,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equipview_core::{AliasTable, normalize};

    #[test]
    fn test_new_dataset_snapshots_stats() {
        let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                   P1,Pump,10,1,20\nV1,Valve,30,3,40\n";
        let rows = normalize(csv.as_bytes(), &AliasTable::default()).unwrap();
        let dataset = NewDataset::new("plant.csv", rows.clone());

        assert_eq!(dataset.filename, "plant.csv");
        assert_eq!(dataset.rows, rows);
        assert_eq!(dataset.stats, aggregate(&rows));
        assert_eq!(dataset.stats.avg_flowrate, 20.0);
    }
}
