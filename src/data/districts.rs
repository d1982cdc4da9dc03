use crate::data::gpkg;
use crate::error::{DataError, DataResult};
use geo::{
    coord, Area, BoundingRect, Centroid, Contains, Geometry, InteriorPoint, MultiPolygon, Point, Rect,
};
use geojson::GeoJson;
use std::path::Path;

/// Property / column holding the district name in both geometry formats
pub const NAME_PROPERTY: &str = "distrito";

/// Smallest rectangle covering both
fn merge(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

/// One administrative district polygon
#[derive(Clone, Debug)]
pub struct District {
    pub name: String,
    pub shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl District {
    /// `None` when the shape has no coordinates to bound
    pub fn new(name: impl Into<String>, shape: MultiPolygon<f64>) -> Option<Self> {
        let bounds = shape.bounding_rect()?;
        Some(Self {
            name: name.into(),
            shape,
            bounds,
        })
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.shape.contains(&Point::new(lon, lat))
    }

    /// Label anchor: an interior point of the largest polygon
    pub fn label_point(&self) -> (f64, f64) {
        self.shape
            .0
            .iter()
            .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .and_then(|polygon| polygon.interior_point().or_else(|| polygon.centroid()))
            .map(|point| (point.x(), point.y()))
            .unwrap_or_else(|| {
                let center = self.bounds.center();
                (center.x, center.y)
            })
    }
}

/// All district geometries, in source order
#[derive(Clone, Debug, Default)]
pub struct DistrictLayer {
    districts: Vec<District>,
}

impl DistrictLayer {
    pub fn new(districts: Vec<District>) -> Self {
        Self { districts }
    }

    /// Read a GeoJSON FeatureCollection (or single Feature) whose features
    /// carry a `distrito` property and polygonal geometry
    pub fn from_geojson(text: &str) -> DataResult<Self> {
        let geojson: GeoJson = text.parse()?;
        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                return Err(DataError::Geometry(
                    "bare geometry has no district name; expected features".into(),
                ))
            }
        };

        let mut districts = Vec::with_capacity(features.len());
        for (index, mut feature) in features.into_iter().enumerate() {
            let name = feature
                .property(NAME_PROPERTY)
                .and_then(|v| v.as_str())
                .map(str::to_owned)
                .ok_or(DataError::MissingProperty {
                    index,
                    property: NAME_PROPERTY,
                })?;

            let shape = match feature.geometry.take().map(Geometry::<f64>::try_from).transpose()? {
                Some(Geometry::Polygon(polygon)) => MultiPolygon::new(vec![polygon]),
                Some(Geometry::MultiPolygon(shape)) => shape,
                _ => {
                    tracing::warn!(district = %name, "skipping feature without polygon geometry");
                    continue;
                }
            };
            match District::new(name, shape) {
                Some(district) => districts.push(district),
                None => tracing::warn!(index, "skipping feature with empty polygon"),
            }
        }

        tracing::debug!(districts = districts.len(), "parsed GeoJSON districts");
        Ok(Self::new(districts))
    }

    /// Read the first feature table of a GeoPackage file
    pub fn from_geopackage(path: &Path) -> DataResult<Self> {
        gpkg::read_districts(path).map(Self::new)
    }

    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.districts.iter().map(|d| d.name.as_str())
    }

    /// Extent of every district; `None` for an empty layer
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.districts.iter().map(District::bounds).reduce(merge)
    }
}
