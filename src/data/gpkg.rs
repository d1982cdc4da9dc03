//! Minimal GeoPackage reader.
//!
//! A GeoPackage is an SQLite database; `gpkg_geometry_columns` names the
//! feature table and its geometry column, and each geometry blob is a
//! small GeoPackage header followed by little-endian WKB. Only polygonal
//! geometry is kept since districts are areas.

use crate::data::districts::{District, NAME_PROPERTY};
use crate::error::{DataError, DataResult};
use geo::{Geometry, MultiPolygon};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

const WGS84: i64 = 4326;

/// Read every feature of the first geometry table as a district
pub fn read_districts(path: &Path) -> DataResult<Vec<District>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let (table, geom_column, srs_id): (String, String, i64) = conn.query_row(
        "SELECT table_name, column_name, srs_id FROM gpkg_geometry_columns LIMIT 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    if srs_id != WGS84 {
        tracing::warn!(srs_id, table = %table, "GeoPackage is not in EPSG:4326; coordinates used as-is");
    }

    let sql = format!(
        "SELECT {}, {} FROM {}",
        quote_ident(NAME_PROPERTY),
        quote_ident(&geom_column),
        quote_ident(&table)
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut districts = Vec::new();
    let mut index = 0;
    while let Some(row) = rows.next()? {
        let name: Option<String> = row.get(0)?;
        let blob: Option<Vec<u8>> = row.get(1)?;
        let name = name.ok_or(DataError::MissingProperty {
            index,
            property: NAME_PROPERTY,
        })?;
        index += 1;

        let Some(blob) = blob else {
            tracing::warn!(district = %name, "skipping feature with null geometry");
            continue;
        };
        match District::new(name.clone(), decode_geometry(&blob)?) {
            Some(district) => districts.push(district),
            None => tracing::warn!(district = %name, "skipping feature with empty geometry"),
        }
    }

    tracing::debug!(table = %table, districts = districts.len(), "read GeoPackage districts");
    Ok(districts)
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Decode a GeoPackage geometry blob (header + WKB) into a multipolygon
pub fn decode_geometry(blob: &[u8]) -> DataResult<MultiPolygon<f64>> {
    if blob.len() < 8 || &blob[0..2] != b"GP" {
        return Err(DataError::Geometry("missing GeoPackage magic".into()));
    }
    let flags = blob[3];
    if flags & 0b0001_0000 != 0 {
        return Ok(MultiPolygon::new(Vec::new()));
    }
    let envelope_len = match (flags >> 1) & 0b111 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => {
            return Err(DataError::Geometry(format!(
                "invalid envelope indicator {other}"
            )))
        }
    };
    let start = 8 + envelope_len;
    if blob.len() < start {
        return Err(DataError::Geometry("truncated GeoPackage header".into()));
    }

    let mut wkb = &blob[start..];
    let geometry = wkb::wkb_to_geom(&mut wkb)
        .map_err(|e| DataError::Geometry(format!("invalid WKB: {e:?}")))?;
    match geometry {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(shape) => Ok(shape),
        _ => Err(DataError::Geometry(
            "expected polygonal geometry in GeoPackage".into(),
        )),
    }
}
