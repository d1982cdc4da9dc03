use thiserror::Error;

/// Errors raised while fetching or decoding the event table and the
/// district geometries.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("HTTP request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("source is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed event table: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("GeoPackage query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("feature {index} has no string `{property}` property")]
    MissingProperty { index: usize, property: &'static str },

    #[error("event table has no `{0}` column")]
    MissingColumn(String),
}

pub type DataResult<T> = Result<T, DataError>;
