use crate::data::DistrictLayer;
use ratatui::style::Color;
use std::collections::BTreeMap;

/// ColorBrewer YlOrRd, 9 classes
const YL_OR_RD: [(u8, u8, u8); 9] = [
    (0xff, 0xff, 0xcc),
    (0xff, 0xed, 0xa0),
    (0xfe, 0xd9, 0x76),
    (0xfe, 0xb2, 0x4c),
    (0xfd, 0x8d, 0x3c),
    (0xfc, 0x4e, 0x2a),
    (0xe3, 0x1a, 0x1c),
    (0xbd, 0x00, 0x26),
    (0x80, 0x00, 0x26),
];

/// Linear colour scale over [min, max]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position of `value` in [0, 1]; a degenerate range maps to 0
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 || !span.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> Color {
        let t = self.normalize(value) * (YL_OR_RD.len() - 1) as f64;
        let lo = t.floor() as usize;
        let hi = (lo + 1).min(YL_OR_RD.len() - 1);
        let frac = t - lo as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (r0, g0, b0) = YL_OR_RD[lo];
        let (r1, g1, b1) = YL_OR_RD[hi];
        Color::Rgb(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }

    /// `steps` evenly spaced (value, colour) pairs from min to max
    pub fn legend(&self, steps: usize) -> Vec<(f64, Color)> {
        let steps = steps.max(2);
        (0..steps)
            .map(|i| {
                let value = self.min + (self.max - self.min) * i as f64 / (steps - 1) as f64;
                (value, self.color(value))
            })
            .collect()
    }
}

/// A district polygon joined with its event count
#[derive(Clone, Debug, PartialEq)]
pub struct ChoroplethRegion {
    /// Index into the district layer
    pub index: usize,
    pub name: String,
    pub count: u64,
}

/// Joined regions plus the scale spanning their counts
#[derive(Clone, Debug)]
pub struct Choropleth {
    pub regions: Vec<ChoroplethRegion>,
    pub scale: ColorScale,
    /// Event district names that matched no polygon, so their events are
    /// missing from the map
    pub unmatched: Vec<String>,
}

impl Choropleth {
    pub fn color_of(&self, region: &ChoroplethRegion) -> Color {
        self.scale.color(region.count as f64)
    }

    pub fn region(&self, index: usize) -> Option<&ChoroplethRegion> {
        self.regions.iter().find(|r| r.index == index)
    }
}

/// Left join of every district polygon with the counts, on exact name
/// equality. Districts without events get zero.
pub fn join(layer: &DistrictLayer, counts: &BTreeMap<String, u64>) -> Choropleth {
    let regions: Vec<ChoroplethRegion> = layer
        .districts()
        .iter()
        .enumerate()
        .map(|(index, district)| ChoroplethRegion {
            index,
            name: district.name.clone(),
            count: counts.get(&district.name).copied().unwrap_or(0),
        })
        .collect();

    let unmatched: Vec<String> = counts
        .keys()
        .filter(|name| !layer.names().any(|n| n == name.as_str()))
        .cloned()
        .collect();
    if !unmatched.is_empty() {
        tracing::warn!(
            districts = ?unmatched,
            "event districts without a matching polygon; their counts are not mapped"
        );
    }

    let min = regions.iter().map(|r| r.count).min().unwrap_or(0);
    let max = regions.iter().map(|r| r.count).max().unwrap_or(0);

    Choropleth {
        regions,
        scale: ColorScale::new(min as f64, max as f64),
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{run, Outcome};
    use crate::data::districts::tests::sample_layer;
    use crate::data::events::tests::sample_table;
    use crate::data::EventKind;

    #[test]
    fn test_scale_endpoints() {
        let scale = ColorScale::new(0.0, 4.0);
        assert_eq!(scale.color(0.0), Color::Rgb(0xff, 0xff, 0xcc));
        assert_eq!(scale.color(4.0), Color::Rgb(0x80, 0x00, 0x26));
        assert_eq!(scale.color(2.0), Color::Rgb(0xfd, 0x8d, 0x3c));
        // Out of range values clamp
        assert_eq!(scale.color(10.0), scale.color(4.0));
    }

    #[test]
    fn test_scale_interpolates_between_stops() {
        let scale = ColorScale::new(0.0, 16.0);
        // Halfway between the first two stops
        assert_eq!(scale.color(1.0), Color::Rgb(0xff, 0xf6, 0xb6));
    }

    #[test]
    fn test_degenerate_scale_uses_first_stop() {
        let scale = ColorScale::new(3.0, 3.0);
        assert_eq!(scale.normalize(3.0), 0.0);
        assert_eq!(scale.color(3.0), Color::Rgb(0xff, 0xff, 0xcc));
    }

    #[test]
    fn test_legend_spans_range() {
        let legend = ColorScale::new(0.0, 2.0).legend(3);
        let values: Vec<f64> = legend.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_join_defaults_missing_to_zero() {
        let layer = sample_layer();
        let counts = BTreeMap::from([("Rivas".to_string(), 2)]);
        let map = join(&layer, &counts);
        assert_eq!(map.regions.len(), 4);
        let counts: Vec<u64> = map.regions.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![0, 0, 2, 0]);
        assert_eq!(map.scale, ColorScale::new(0.0, 2.0));
        assert!(map.unmatched.is_empty());
    }

    #[test]
    fn test_join_is_exact_match_only() {
        let layer = sample_layer();
        let counts = BTreeMap::from([("RIVAS".to_string(), 1), ("Rivas ".to_string(), 1)]);
        let map = join(&layer, &counts);
        assert!(map.regions.iter().all(|r| r.count == 0));
        assert_eq!(map.unmatched, vec!["RIVAS".to_string(), "Rivas ".to_string()]);
    }

    #[test]
    fn test_flood_2010_map_has_two_shaded_districts() {
        let table = sample_table();
        let layer = sample_layer();
        let Outcome::Ready(summary) = run(&table, EventKind::Flood, 2010) else {
            panic!("expected rows");
        };
        let map = join(&layer, &summary.by_district);
        let floor = map.scale.color(map.scale.min);
        let shaded: Vec<&str> = map
            .regions
            .iter()
            .filter(|r| map.color_of(r) != floor)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(shaded, vec!["San Isidro de El General", "Daniel Flores"]);
        assert!(map.regions.iter().all(|r| r.count <= 2));
    }
}
