//! Canonical fields and the header alias table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The canonical column set every upload is normalized onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "equipmentName")]
    EquipmentName,
    #[serde(rename = "type")]
    Type,
    #[serde(rename = "flowrate")]
    Flowrate,
    #[serde(rename = "pressure")]
    Pressure,
    #[serde(rename = "temperature")]
    Temperature,
}

impl Field {
    /// All canonical fields in canonical order.
    pub const ALL: [Field; 5] = [
        Field::EquipmentName,
        Field::Type,
        Field::Flowrate,
        Field::Pressure,
        Field::Temperature,
    ];

    /// Canonical name as used in JSON output and error reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::EquipmentName => "equipmentName",
            Field::Type => "type",
            Field::Flowrate => "flowrate",
            Field::Pressure => "pressure",
            Field::Temperature => "temperature",
        }
    }

    /// Header written for this field by CSV export.
    pub fn display_header(&self) -> &'static str {
        match self {
            Field::EquipmentName => "Equipment Name",
            Field::Type => "Type",
            Field::Flowrate => "Flowrate",
            Field::Pressure => "Pressure",
            Field::Temperature => "Temperature",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown field '{0}': expected one of equipmentName, type, flowrate, pressure, temperature")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    /// Parses a canonical field name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Mapping from raw header spellings to canonical fields.
///
/// Keys are stored trimmed and lowercased, so lookups are case-insensitive
/// and ignore surrounding whitespace.
///
/// # Example
///
/// ```
/// use equipview_core::{AliasTable, Field};
///
/// let mut aliases = AliasTable::default();
/// aliases.insert("Flow (m3/h)", Field::Flowrate);
///
/// assert_eq!(aliases.lookup("  EQUIPMENT NAME "), Some(Field::EquipmentName));
/// assert_eq!(aliases.lookup("flow (M3/H)"), Some(Field::Flowrate));
/// assert_eq!(aliases.lookup("serial"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, Field>,
}

impl AliasTable {
    fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Register `alias` as a spelling of `field`, replacing any previous mapping.
    pub fn insert(&mut self, alias: &str, field: Field) {
        self.aliases.insert(normalize_header(alias), field);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_alias(mut self, alias: &str, field: Field) -> Self {
        self.insert(alias, field);
        self
    }

    /// Resolve a raw header to its canonical field.
    pub fn lookup(&self, header: &str) -> Option<Field> {
        self.aliases.get(&normalize_header(header)).copied()
    }

    /// Number of registered aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether the table has no aliases.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        [
            ("equipment name", Field::EquipmentName),
            ("equipmentname", Field::EquipmentName),
            ("equipment_name", Field::EquipmentName),
            ("type", Field::Type),
            ("equipment type", Field::Type),
            ("flowrate", Field::Flowrate),
            ("flow rate", Field::Flowrate),
            ("flow_rate", Field::Flowrate),
            ("pressure", Field::Pressure),
            ("temperature", Field::Temperature),
            ("temp", Field::Temperature),
        ]
        .into_iter()
        .fold(Self::empty(), |table, (alias, field)| table.with_alias(alias, field))
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aliases_cover_every_field() {
        let aliases = AliasTable::default();
        for field in Field::ALL {
            assert_eq!(aliases.lookup(field.as_str()), Some(field), "{field}");
            assert_eq!(aliases.lookup(field.display_header()), Some(field), "{field}");
        }
    }

    #[test]
    fn test_lookup_ignores_case_and_whitespace() {
        let aliases = AliasTable::default();
        assert_eq!(aliases.lookup("\tEquipmentName  "), Some(Field::EquipmentName));
        assert_eq!(aliases.lookup(" TEMPERATURE"), Some(Field::Temperature));
    }

    #[test]
    fn test_inner_whitespace_is_significant() {
        let aliases = AliasTable::default();
        assert_eq!(aliases.lookup("equipment  name"), None);
    }

    #[test]
    fn test_insert_overrides_existing_alias() {
        let mut aliases = AliasTable::default();
        aliases.insert("TEMP", Field::Pressure);
        assert_eq!(aliases.lookup("temp"), Some(Field::Pressure));
    }

    #[test]
    fn test_field_from_str() {
        assert_eq!("equipmentName".parse::<Field>(), Ok(Field::EquipmentName));
        assert_eq!(" Pressure ".parse::<Field>(), Ok(Field::Pressure));
        assert!("humidity".parse::<Field>().is_err());
    }

    #[test]
    fn test_field_serializes_as_canonical_name() {
        let json = serde_json::to_string(&Field::ALL).unwrap();
        assert_eq!(
            json,
            r#"["equipmentName","type","flowrate","pressure","temperature"]"#
        );
    }
}
