//! Plain-text rendering of a selection, for `--print`.

use crate::analysis::{self, Outcome, EMPTY_NOTICE};
use crate::choropleth;
use crate::data::{Datasets, EventKind, EventRecord};
use std::io::{self, Write};

pub const TITLE: &str = "Eventos ciclónicos en el cantón de Pérez Zeledón";

/// Columns of the event table view, in display order
pub const TABLE_COLUMNS: [&str; 7] = [
    "CICLON",
    "NOMBRE",
    "FECHA",
    "CANTON",
    "DISTRITO",
    "TOTAL_AFECTADOS",
    "PERDIDA_DOLARES",
];

/// Digits grouped by thousands: 1234567 → "1,234,567"
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Dollar amount with two decimals: 17000.5 → "17,000.50"
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// Display cells of one record, matching [`TABLE_COLUMNS`]
pub fn record_cells(record: &EventRecord) -> [String; 7] {
    [
        record.cyclone.clone(),
        record.name.clone(),
        record.date.clone(),
        record.canton.clone(),
        record.district.clone(),
        record.total_affected.map(group_thousands).unwrap_or_default(),
        record.loss_usd.map(format_usd).unwrap_or_default(),
    ]
}

/// Write the table, year series and district counts for one selection
pub fn write_report<W: Write>(out: &mut W, data: &Datasets, kind: EventKind, year: i32) -> io::Result<()> {
    writeln!(out, "{TITLE}")?;
    writeln!(out)?;
    writeln!(out, "Eventos registrados: {kind} en {year}")?;

    let summary = match analysis::run(&data.events, kind, year) {
        Outcome::Empty { .. } => {
            writeln!(out, "{EMPTY_NOTICE}")?;
            return Ok(());
        }
        Outcome::Ready(summary) => summary,
    };

    let rows: Vec<[String; 7]> = summary.rows.iter().map(record_cells).collect();
    let mut widths = TABLE_COLUMNS.map(|c| c.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    writeln!(out, "{}", line(&TABLE_COLUMNS.map(String::from)[..]))?;
    for row in &rows {
        writeln!(out, "{}", line(&row[..]))?;
    }
    writeln!(
        out,
        "Total: {} registros, {} afectados, {} dólares",
        rows.len(),
        group_thousands(summary.total_affected),
        format_usd(summary.total_loss_usd)
    )?;

    writeln!(out)?;
    writeln!(out, "Cantidad de {kind} por año")?;
    for (y, count) in &summary.by_year {
        let marker = if *y == year { " <" } else { "" };
        writeln!(out, "{y}  {count:>4}  {}{marker}", "█".repeat(*count as usize))?;
    }

    let map = choropleth::join(&data.districts, &summary.by_district);
    writeln!(out)?;
    writeln!(out, "Cantidad de {kind} por distrito ({kind} en {year})")?;
    let name_width = map.regions.iter().map(|r| r.name.chars().count()).max().unwrap_or(0);
    for region in &map.regions {
        writeln!(out, "{:<name_width$}  {:>4}", region.name, region.count)?;
    }
    for name in &map.unmatched {
        writeln!(out, "Sin polígono: {name} ({})", summary.by_district[name])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::districts::tests::sample_layer;
    use crate::data::events::tests::sample_table;

    fn sample_data() -> Datasets {
        Datasets {
            events: sample_table(),
            districts: sample_layer(),
        }
    }

    fn report(kind: EventKind, year: i32) -> String {
        let mut out = Vec::new();
        write_report(&mut out, &sample_data(), kind, year).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(format_usd(17000.5), "17,000.50");
        assert_eq!(format_usd(0.004), "0.00");
        assert_eq!(format_usd(-1500.0), "-1,500.00");
    }

    #[test]
    fn test_flood_report() {
        let text = report(EventKind::Flood, 2010);
        assert!(text.starts_with(TITLE));
        assert!(text.contains("Eventos registrados: INUNDACION en 2010"));
        assert!(text.contains("Total: 3 registros, 200 afectados, 17,000.50 dólares"));
        assert!(text.contains("2010     3  ███ <"));
        assert!(text.contains("2016     1  █\n"));
        assert!(text.contains("Cantidad de INUNDACION por distrito (INUNDACION en 2010)"));
        assert!(text.contains(&format!("{:<24}  {:>4}\n", "Cajón", 0)));
    }

    #[test]
    fn test_empty_report_stops_after_notice() {
        let text = report(EventKind::Landslide, 2016);
        assert!(text.trim_end().ends_with(EMPTY_NOTICE));
        assert!(!text.contains("por año"));
    }
}
