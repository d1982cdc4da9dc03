pub mod districts;
pub mod events;
mod gpkg;

pub use districts::{District, DistrictLayer};
pub use events::{EventKind, EventRecord, EventTable};

use crate::error::{DataError, DataResult};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a dataset comes from: a remote URL or a local file
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl Source {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Source::Url(raw.to_string())
        } else {
            Source::Path(PathBuf::from(raw))
        }
    }

    /// Lowercased file extension, ignoring any URL query or fragment
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Source::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            Source::Path(path) => path.to_string_lossy().into_owned(),
        };
        let file = name.rsplit('/').next().unwrap_or(&name);
        file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The two inputs of the dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sources {
    pub events: Source,
    pub districts: Source,
}

/// Load-once store of fetched source bytes.
///
/// Entries live as long as the cache and are never evicted, so every
/// re-run of the pipeline sees exactly the bytes of the first fetch.
#[derive(Default)]
pub struct SourceCache {
    entries: HashMap<Source, Vec<u8>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of `source`, fetching it on first use
    pub fn fetch(&mut self, source: &Source) -> DataResult<&[u8]> {
        if !self.is_cached(source) {
            let bytes = self.download(source)?;
            tracing::info!(%source, bytes = bytes.len(), "loaded source");
            self.entries.insert(source.clone(), bytes);
        } else {
            tracing::debug!(%source, "source served from cache");
        }
        Ok(&self.entries[source])
    }

    pub fn is_cached(&self, source: &Source) -> bool {
        self.entries.contains_key(source)
    }

    fn download(&self, source: &Source) -> DataResult<Vec<u8>> {
        match source {
            Source::Path(path) => fs::read(path).map_err(|e| DataError::Io {
                path: path.display().to_string(),
                source: e,
            }),
            Source::Url(url) => {
                let http = |e: reqwest::Error| DataError::Http {
                    url: url.clone(),
                    source: e,
                };
                let client = reqwest::blocking::Client::builder()
                    .timeout(HTTP_TIMEOUT)
                    .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                    .build()
                    .map_err(http)?;
                let response = client.get(url).send().and_then(|r| r.error_for_status()).map_err(http)?;
                let bytes = response.bytes().map_err(http)?;
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Both datasets, parsed from the cached source bytes
#[derive(Clone, Debug)]
pub struct Datasets {
    pub events: EventTable,
    pub districts: DistrictLayer,
}

impl Datasets {
    pub fn load(cache: &mut SourceCache, sources: &Sources) -> DataResult<Self> {
        let events = EventTable::from_bytes(cache.fetch(&sources.events)?)?;
        let districts = load_districts(cache.fetch(&sources.districts)?, &sources.districts)?;
        tracing::info!(
            events = events.len(),
            districts = districts.len(),
            years = events.years().len(),
            "datasets ready"
        );
        Ok(Self { events, districts })
    }
}

/// GeoPackage by extension, GeoJSON otherwise
fn load_districts(bytes: &[u8], source: &Source) -> DataResult<DistrictLayer> {
    if source.extension().as_deref() == Some("gpkg") {
        // SQLite needs a file on disk
        let io = |e: std::io::Error| DataError::Io {
            path: format!("temporary copy of {source}"),
            source: e,
        };
        let mut file = tempfile::Builder::new()
            .suffix(".gpkg")
            .tempfile()
            .map_err(io)?;
        file.write_all(bytes).map_err(io)?;
        file.flush().map_err(io)?;
        DistrictLayer::from_geopackage(file.path())
    } else {
        DistrictLayer::from_geojson(std::str::from_utf8(bytes)?)
    }
}
