use crate::error::{DataError, DataResult};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Columns the event table must carry, in display order after the year.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "AÑO",
    "CICLON",
    "NOMBRE",
    "FECHA",
    "CANTON",
    "DISTRITO",
    "TOTAL_AFECTADOS",
    "PERDIDA_DOLARES",
    "INUNDACION",
    "DESLIZAMIENTO",
];

/// Hazard category, identified by its binary flag column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Flood,
    Landslide,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Flood, EventKind::Landslide];

    /// Name of the flag column in the event table
    pub fn column(self) -> &'static str {
        match self {
            EventKind::Flood => "INUNDACION",
            EventKind::Landslide => "DESLIZAMIENTO",
        }
    }

    /// Text shown in selectors and titles
    pub fn label(self) -> &'static str {
        self.column()
    }

    pub fn from_column(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.column().eq_ignore_ascii_case(name))
    }

    pub fn next(self) -> Self {
        match self {
            EventKind::Flood => EventKind::Landslide,
            EventKind::Landslide => EventKind::Flood,
        }
    }

    pub fn prev(self) -> Self {
        // Two variants: cycling backwards is the same step
        self.next()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_column(s).ok_or_else(|| {
            format!(
                "unknown event type '{s}', expected one of: {}",
                Self::ALL.map(EventKind::column).join(", ")
            )
        })
    }
}

/// One historical cyclonic event occurrence
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "AÑO")]
    pub year: i32,
    #[serde(rename = "CICLON")]
    pub cyclone: String,
    #[serde(rename = "NOMBRE")]
    pub name: String,
    #[serde(rename = "FECHA")]
    pub date: String,
    #[serde(rename = "CANTON")]
    pub canton: String,
    #[serde(rename = "DISTRITO")]
    pub district: String,
    #[serde(rename = "INUNDACION", deserialize_with = "flag")]
    pub flood: bool,
    #[serde(rename = "DESLIZAMIENTO", deserialize_with = "flag")]
    pub landslide: bool,
    #[serde(rename = "TOTAL_AFECTADOS", deserialize_with = "csv::invalid_option")]
    pub total_affected: Option<u64>,
    #[serde(rename = "PERDIDA_DOLARES", deserialize_with = "csv::invalid_option")]
    pub loss_usd: Option<f64>,
}

impl EventRecord {
    /// Whether the flag column for `kind` equals 1
    pub fn has(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Flood => self.flood,
            EventKind::Landslide => self.landslide,
        }
    }
}

/// Flag cells hold `1` when set; `1.0` is accepted for tables exported
/// from spreadsheets. Anything else, blanks included, is unset.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    Ok(raw == "1" || raw.parse::<f64>().map(|v| v == 1.0).unwrap_or(false))
}

/// The full event table, loaded once and never mutated
#[derive(Debug, Clone)]
pub struct EventTable {
    columns: Vec<String>,
    records: Vec<EventRecord>,
}

impl EventTable {
    /// Parse a semicolon-delimited table with a header row
    pub fn from_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|required| !columns.iter().any(|c| c == *required))
        {
            return Err(DataError::MissingColumn(missing.to_string()));
        }

        // Deserialize against the cleaned header so a BOM on the first
        // column does not hide it from serde
        let header = csv::StringRecord::from(columns.clone());
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(row.deserialize(Some(&header))?);
        }

        tracing::debug!(rows = records.len(), columns = columns.len(), "parsed event table");
        Ok(Self { columns, records })
    }

    pub fn from_bytes(bytes: &[u8]) -> DataResult<Self> {
        Self::from_reader(bytes)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years present in the table, ascending
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .map(|r| r.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HEADER: &str = "AÑO;CICLON;NOMBRE;FECHA;CANTON;DISTRITO;INUNDACION;DESLIZAMIENTO;TOTAL_AFECTADOS;PERDIDA_DOLARES";

    /// Small table used across the crate's tests: 2010 has three floods in
    /// two districts and one landslide.
    pub(crate) fn sample_csv() -> String {
        [
            HEADER,
            "2010;C-01;Tomas;04/11/2010;PEREZ ZELEDON;San Isidro de El General;1;0;120;15000.5",
            "2010;C-01;Tomas;05/11/2010;PEREZ ZELEDON;Daniel Flores;1;1;80;",
            "2010;C-02;Matthew;30/09/2010;PEREZ ZELEDON;San Isidro de El General;1;0;;2000",
            "2011;C-03;Rina;25/10/2011;PEREZ ZELEDON;Rivas;0;1;5;100",
            "2016;C-04;Otto;24/11/2016;PEREZ ZELEDON;Páramo;1;0;300;250000",
        ]
        .join("\n")
    }

    pub(crate) fn sample_table() -> EventTable {
        EventTable::from_bytes(sample_csv().as_bytes()).unwrap()
    }

    #[test]
    fn test_parses_rows_and_columns() {
        let table = sample_table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.columns().len(), 10);
        let first = &table.records()[0];
        assert_eq!(first.year, 2010);
        assert_eq!(first.cyclone, "C-01");
        assert_eq!(first.district, "San Isidro de El General");
        assert!(first.has(EventKind::Flood));
        assert!(!first.has(EventKind::Landslide));
        assert_eq!(first.total_affected, Some(120));
        assert_eq!(first.loss_usd, Some(15000.5));
    }

    #[test]
    fn test_blank_numbers_are_none() {
        let table = sample_table();
        assert_eq!(table.records()[1].loss_usd, None);
        assert_eq!(table.records()[2].total_affected, None);
    }

    #[test]
    fn test_years_sorted_distinct() {
        assert_eq!(sample_table().years(), vec![2010, 2011, 2016]);
    }

    #[test]
    fn test_bom_is_tolerated() {
        let csv = format!("\u{feff}{}", sample_csv());
        let table = EventTable::from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.columns()[0], "AÑO");
        assert_eq!(table.records()[0].year, 2010);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let csv = "AÑO;CICLON;NOMBRE\n2010;C-01;Tomas";
        match EventTable::from_bytes(csv.as_bytes()) {
            Err(DataError::MissingColumn(col)) => assert_eq!(col, "FECHA"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_flag_accepts_decimal_one() {
        let csv = format!("{HEADER}\n2012;C-9;X;01/01/2012;PZ;Rivas;1.0;0.0;1;1");
        let table = EventTable::from_bytes(csv.as_bytes()).unwrap();
        assert!(table.records()[0].flood);
        assert!(!table.records()[0].landslide);
    }

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!("inundacion".parse::<EventKind>(), Ok(EventKind::Flood));
        assert_eq!(EventKind::from_column("DESLIZAMIENTO"), Some(EventKind::Landslide));
        assert!("SISMO".parse::<EventKind>().is_err());
        assert_eq!(EventKind::Flood.next(), EventKind::Landslide);
        assert_eq!(EventKind::Landslide.prev(), EventKind::Flood);
    }
}
