use crate::data::{EventKind, EventRecord, EventTable};
use std::collections::BTreeMap;

/// Shown instead of the table, chart and map when nothing matches
pub const EMPTY_NOTICE: &str = "No se encontraron datos para este evento.";

/// Rows whose `kind` flag is set and whose year is `year`, in table order
pub fn filter(table: &EventTable, kind: EventKind, year: i32) -> Vec<&EventRecord> {
    table
        .records()
        .iter()
        .filter(|r| r.has(kind) && r.year == year)
        .collect()
}

/// Number of rows with the `kind` flag set, per year, over the whole table.
/// Years without any such row are absent.
pub fn counts_by_year(table: &EventTable, kind: EventKind) -> BTreeMap<i32, u64> {
    let mut counts = BTreeMap::new();
    for record in table.records().iter().filter(|r| r.has(kind)) {
        *counts.entry(record.year).or_insert(0) += 1;
    }
    counts
}

/// Number of selected rows per district name
pub fn counts_by_district<'a>(
    rows: impl IntoIterator<Item = &'a EventRecord>,
    kind: EventKind,
) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in rows.into_iter().filter(|r| r.has(kind)) {
        *counts.entry(record.district.clone()).or_insert(0) += 1;
    }
    counts
}

/// Everything one render pass needs for a non-empty selection
#[derive(Clone, Debug)]
pub struct Summary {
    pub kind: EventKind,
    pub year: i32,
    pub rows: Vec<EventRecord>,
    pub by_year: BTreeMap<i32, u64>,
    pub by_district: BTreeMap<String, u64>,
    /// Sum of `TOTAL_AFECTADOS` over the selected rows (blanks skipped)
    pub total_affected: u64,
    /// Sum of `PERDIDA_DOLARES` over the selected rows (blanks skipped)
    pub total_loss_usd: f64,
}

/// Result of one pipeline run
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The filter matched nothing; no aggregation was done
    Empty { kind: EventKind, year: i32 },
    Ready(Summary),
}

impl Outcome {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Outcome::Ready(summary) => Some(summary),
            Outcome::Empty { .. } => None,
        }
    }
}

/// Filter, then aggregate unless the selection is empty
pub fn run(table: &EventTable, kind: EventKind, year: i32) -> Outcome {
    let rows = filter(table, kind, year);
    if rows.is_empty() {
        tracing::debug!(%kind, year, "selection is empty");
        return Outcome::Empty { kind, year };
    }

    let by_district = counts_by_district(rows.iter().copied(), kind);
    let by_year = counts_by_year(table, kind);
    let total_affected = rows.iter().filter_map(|r| r.total_affected).sum();
    let total_loss_usd = rows.iter().filter_map(|r| r.loss_usd).sum();

    tracing::debug!(
        %kind,
        year,
        rows = rows.len(),
        districts = by_district.len(),
        "selection aggregated"
    );

    Outcome::Ready(Summary {
        kind,
        year,
        rows: rows.into_iter().cloned().collect(),
        by_year,
        by_district,
        total_affected,
        total_loss_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::events::tests::sample_table;

    #[test]
    fn test_filter_matches_flag_and_year() {
        let table = sample_table();
        for kind in EventKind::ALL {
            for year in table.years() {
                for row in filter(&table, kind, year) {
                    assert!(row.has(kind));
                    assert_eq!(row.year, year);
                }
            }
        }
    }

    #[test]
    fn test_filter_keeps_table_order() {
        let table = sample_table();
        let rows = filter(&table, EventKind::Flood, 2010);
        let dates: Vec<_> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["04/11/2010", "05/11/2010", "30/09/2010"]);
    }

    #[test]
    fn test_year_series_sums_to_flagged_rows() {
        let table = sample_table();
        for kind in EventKind::ALL {
            let series = counts_by_year(&table, kind);
            let flagged = table.records().iter().filter(|r| r.has(kind)).count() as u64;
            assert_eq!(series.values().sum::<u64>(), flagged);
        }
    }

    #[test]
    fn test_year_series_covers_all_years() {
        let series = counts_by_year(&sample_table(), EventKind::Flood);
        assert_eq!(series, BTreeMap::from([(2010, 3), (2016, 1)]));
    }

    #[test]
    fn test_flood_2010_scenario() {
        let table = sample_table();
        let Outcome::Ready(summary) = run(&table, EventKind::Flood, 2010) else {
            panic!("expected rows for floods in 2010");
        };
        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.by_year[&2010], 3);
        assert_eq!(summary.by_district.len(), 2);
        assert_eq!(summary.by_district["San Isidro de El General"], 2);
        assert_eq!(summary.by_district["Daniel Flores"], 1);
        assert_eq!(summary.total_affected, 200);
        assert!((summary.total_loss_usd - 17000.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_selection_short_circuits() {
        let table = sample_table();
        match run(&table, EventKind::Landslide, 2016) {
            Outcome::Empty { kind, year } => {
                assert_eq!(kind, EventKind::Landslide);
                assert_eq!(year, 2016);
            }
            Outcome::Ready(_) => panic!("no landslides in 2016"),
        }
        assert!(run(&table, EventKind::Flood, 1999).summary().is_none());
    }
}
