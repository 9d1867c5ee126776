//! Summary statistics over normalized rows.
//!
//! Sums are accumulated left to right in IEEE-754 `f64`, so a given row
//! sequence always produces bit-identical averages. A sum that overflows is
//! recomputed from readings pre-scaled by `1 / n`, so the average of finite
//! readings is always finite.

use std::collections::BTreeMap;

use crate::model::{Row, Stats};

/// Compute statistics for `rows`.
///
/// An empty slice yields [`Stats::default`]: zero count, every average exactly
/// `0.0` and an empty type distribution.
///
/// # Example
///
/// ```
/// use equipview_core::{AliasTable, aggregate, normalize};
///
/// let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
///            P1,A,1,2,3\nP2,A,3,4,5\nP3,B,5,6,7\n";
/// let rows = normalize(csv.as_bytes(), &AliasTable::default())?;
/// let stats = aggregate(&rows);
///
/// assert_eq!(stats.total_equipment, 3);
/// assert_eq!(stats.avg_flowrate, 3.0);
/// assert_eq!(stats.type_distribution["A"], 2);
/// # Ok::<(), equipview_core::NormalizeError>(())
/// ```
pub fn aggregate(rows: &[Row]) -> Stats {
    if rows.is_empty() {
        return Stats::default();
    }

    let mut flowrate = 0.0;
    let mut pressure = 0.0;
    let mut temperature = 0.0;
    let mut type_distribution: BTreeMap<String, u64> = BTreeMap::new();

    for row in rows {
        flowrate += row.flowrate();
        pressure += row.pressure();
        temperature += row.temperature();
        *type_distribution.entry(row.kind().to_string()).or_default() += 1;
    }

    Stats {
        total_equipment: rows.len() as u64,
        avg_flowrate: mean(flowrate, rows, Row::flowrate),
        avg_pressure: mean(pressure, rows, Row::pressure),
        avg_temperature: mean(temperature, rows, Row::temperature),
        type_distribution,
    }
}

fn mean(sum: f64, rows: &[Row], value: fn(&Row) -> f64) -> f64 {
    let count = rows.len() as f64;
    if sum.is_finite() {
        return sum / count;
    }

    // The mean of finite readings lies within their range, hence within f64.
    rows.iter()
        .map(|row| value(row) / count)
        .sum::<f64>()
        .clamp(f64::MIN, f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(kind: &str, flowrate: f64, pressure: f64, temperature: f64) -> Row {
        Row::from_validated(format!("{kind} unit"), kind.to_string(), flowrate, pressure, temperature)
    }

    #[test]
    fn test_empty_rows() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total_equipment, 0);
        assert_eq!(stats.avg_flowrate, 0.0);
        assert_eq!(stats.avg_pressure, 0.0);
        assert_eq!(stats.avg_temperature, 0.0);
        assert!(stats.type_distribution.is_empty());
        assert!(!stats.avg_flowrate.is_nan());
    }

    #[test]
    fn test_type_distribution_counts() {
        let rows = [row("A", 1.0, 1.0, 1.0), row("A", 1.0, 1.0, 1.0), row("B", 1.0, 1.0, 1.0)];
        let stats = aggregate(&rows);

        assert_eq!(stats.total_equipment, 3);
        assert_eq!(
            stats.type_distribution,
            BTreeMap::from([("A".to_string(), 2), ("B".to_string(), 1)])
        );
    }

    #[test]
    fn test_types_are_not_folded() {
        let rows = [row("Pump", 0.0, 0.0, 0.0), row("pump", 0.0, 0.0, 0.0), row("Pump ", 0.0, 0.0, 0.0)];
        assert_eq!(aggregate(&rows).type_distribution.len(), 3);
    }

    #[test]
    fn test_averages() {
        let rows = [row("A", 150.5, 8.2, 45.0), row("B", 280.0, 12.5, 120.0)];
        let stats = aggregate(&rows);

        assert_eq!(stats.avg_flowrate, (150.5 + 280.0) / 2.0);
        assert_eq!(stats.avg_pressure, (8.2 + 12.5) / 2.0);
        assert_eq!(stats.avg_temperature, 82.5);
    }

    #[test]
    fn test_large_readings_do_not_overflow() {
        let rows = [row("P", 1e308, 1.0, 1.0), row("P", 1e308, 1.0, 1.0)];
        let stats = aggregate(&rows);
        assert_eq!(stats.avg_flowrate, 1e308);
        assert_eq!(stats.avg_pressure, 1.0);

        let rows = [row("P", 1e308, 0.0, 0.0), row("P", 1e308, 0.0, 0.0), row("P", -1e308, 0.0, 0.0)];
        let avg = aggregate(&rows).avg_flowrate;
        assert!((avg - 1e308 / 3.0).abs() < 1e295, "{avg}");

        let rows = [row("P", f64::MAX, 0.0, f64::MIN), row("P", f64::MAX, 0.0, f64::MIN), row("P", f64::MAX, 0.0, f64::MIN)];
        let stats = aggregate(&rows);
        assert!(stats.avg_flowrate.is_finite() && stats.avg_flowrate > 0.0);
        assert!(stats.avg_temperature.is_finite() && stats.avg_temperature < 0.0);
    }

    fn arb_row() -> impl Strategy<Value = Row> {
        (
            prop::sample::select(vec!["Pump", "Valve", "Reactor", "Tank"]),
            -1.0e6..1.0e6f64,
            -1.0e6..1.0e6f64,
            -1.0e6..1.0e6f64,
        )
            .prop_map(|(kind, f, p, t)| row(kind, f, p, t))
    }

    proptest! {
        #[test]
        fn distribution_sums_to_total(rows in prop::collection::vec(arb_row(), 0..64)) {
            let stats = aggregate(&rows);
            prop_assert_eq!(stats.total_equipment, rows.len() as u64);
            prop_assert_eq!(stats.type_distribution.values().sum::<u64>(), stats.total_equipment);
        }

        #[test]
        fn averages_lie_within_bounds(rows in prop::collection::vec(arb_row(), 1..64)) {
            let stats = aggregate(&rows);
            let min = rows.iter().map(Row::flowrate).fold(f64::INFINITY, f64::min);
            let max = rows.iter().map(Row::flowrate).fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(stats.avg_flowrate >= min - 1e-6 && stats.avg_flowrate <= max + 1e-6);
        }

        #[test]
        fn averages_of_finite_readings_are_finite(
            readings in prop::collection::vec(prop::num::f64::NORMAL, 1..16)
        ) {
            let rows: Vec<Row> = readings.iter().map(|&x| row("P", x, -x, x)).collect();
            let stats = aggregate(&rows);
            prop_assert!(stats.avg_flowrate.is_finite());
            prop_assert!(stats.avg_pressure.is_finite());
            prop_assert!(stats.avg_temperature.is_finite());
        }

        #[test]
        fn aggregation_is_deterministic(rows in prop::collection::vec(arb_row(), 0..32)) {
            let a = aggregate(&rows);
            let b = aggregate(&rows);
            prop_assert_eq!(a.avg_pressure.to_bits(), b.avg_pressure.to_bits());
            prop_assert_eq!(a, b);
        }
    }
}
