//! CSV rendering of stored rows.

use csv::Writer;

use crate::error::ExportError;
use crate::field::Field;
use crate::model::Row;

/// Render `rows` as CSV with display headers.
///
/// The output normalizes back to the same rows with the default alias table.
pub fn to_csv(rows: &[Row]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(Field::ALL.map(|field| field.display_header()))?;

    for row in rows {
        let flowrate = row.flowrate().to_string();
        let pressure = row.pressure().to_string();
        let temperature = row.temperature().to_string();
        writer.write_record([
            row.equipment_name(),
            row.kind(),
            flowrate.as_str(),
            pressure.as_str(),
            temperature.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}
