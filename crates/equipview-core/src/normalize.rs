//! CSV ingestion onto the canonical field set.
//!
//! Headers are resolved once through an [`AliasTable`]; every canonical field
//! without a matching header is reported together in a [`SchemaError`].
//!
//! Numeric cells that do not parse to a finite `f64` reject the whole upload
//! with [`ParseError::InvalidNumber`]. Rows are never dropped and no sentinel
//! value ever reaches the aggregates.

use csv::{ErrorKind, ReaderBuilder, StringRecord};

use crate::error::{NormalizeError, ParseError, SchemaError};
use crate::field::{AliasTable, Field};
use crate::model::Row;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Longest cell excerpt echoed back in a parse error.
const MAX_ECHOED_CELL: usize = 40;

/// Parse raw CSV bytes into rows.
///
/// # Example
///
/// ```
/// use equipview_core::{AliasTable, normalize};
///
/// let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
///            Pump A1,Pump,150.5,8.2,45.0\n";
/// let rows = normalize(csv.as_bytes(), &AliasTable::default())?;
///
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].kind(), "Pump");
/// # Ok::<(), equipview_core::NormalizeError>(())
/// ```
pub fn normalize(raw: &[u8], aliases: &AliasTable) -> Result<Vec<Row>, NormalizeError> {
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(raw);

    let columns = {
        let headers = reader.headers().map_err(|e| parse_error(&e, 1))?;
        Columns::resolve(headers, aliases)?
    };

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| parse_error(&e, 0))?;
        rows.push(columns.row(&record)?);
    }

    Ok(rows)
}

/// Column index for each canonical field.
#[derive(Debug)]
struct Columns([usize; 5]);

impl Columns {
    fn resolve(headers: &StringRecord, aliases: &AliasTable) -> Result<Self, SchemaError> {
        let mut slots: [Option<usize>; 5] = [None; 5];
        for (idx, header) in headers.iter().enumerate() {
            if let Some(field) = aliases.lookup(header) {
                // Leftmost matching header wins.
                slots[field.index()].get_or_insert(idx);
            }
        }

        let missing: Vec<Field> = Field::ALL
            .into_iter()
            .filter(|field| slots[field.index()].is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError { missing });
        }

        Ok(Self(slots.map(|slot| slot.unwrap_or_default())))
    }

    fn cell<'r>(&self, record: &'r StringRecord, field: Field) -> &'r str {
        record.get(self.0[field.index()]).unwrap_or_default()
    }

    fn number(&self, record: &StringRecord, field: Field) -> Result<f64, ParseError> {
        let cell = self.cell(record, field);
        match cell.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(ParseError::InvalidNumber {
                line: line_of(record),
                field,
                value: cell.chars().take(MAX_ECHOED_CELL).collect(),
            }),
        }
    }

    fn row(&self, record: &StringRecord) -> Result<Row, ParseError> {
        Ok(Row::from_validated(
            self.cell(record, Field::EquipmentName).to_string(),
            self.cell(record, Field::Type).to_string(),
            self.number(record, Field::Flowrate)?,
            self.number(record, Field::Pressure)?,
            self.number(record, Field::Temperature)?,
        ))
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, |pos| pos.line())
}

/// Map a reader failure to a caller-safe error.
fn parse_error(err: &csv::Error, fallback_line: u64) -> ParseError {
    let line = err.position().map_or(fallback_line, |pos| pos.line());
    match err.kind() {
        ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => ParseError::FieldCount {
            line,
            expected: *expected_len,
            found: *len,
        },
        ErrorKind::Utf8 { .. } => ParseError::Encoding { line },
        _ => ParseError::Malformed { line },
    }
}
