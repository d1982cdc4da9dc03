use crate::braille::BrailleCanvas;
use crate::choropleth::Choropleth;
use crate::data::{District, DistrictLayer};
use crate::map::geometry::{draw_line, fill_rings};
use crate::map::projection::Viewport;
use crate::map::spatial::FeatureGrid;
use geo::{coord, LineString, Polygon, Rect};
use ratatui::style::Color;

/// Grid cell size in degrees; districts are a few km across
const GRID_CELL_DEGREES: f64 = 0.05;

/// Outline colour for district borders
const OUTLINE: Color = Color::Black;

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_outlines: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outlines: true,
            show_labels: true,
        }
    }
}

/// Rendered map: coloured braille canvas plus text labels in char coords
pub struct MapLayers {
    pub canvas: BrailleCanvas,
    pub labels: Vec<(u16, u16, String)>,
}

/// Draws the district choropleth onto a braille canvas
pub struct ChoroplethRenderer {
    grid: FeatureGrid,
    pub settings: DisplaySettings,
}

impl ChoroplethRenderer {
    pub fn new(layer: &DistrictLayer) -> Self {
        Self {
            grid: FeatureGrid::build(layer.districts().iter().map(District::bounds), GRID_CELL_DEGREES),
            settings: DisplaySettings::default(),
        }
    }

    /// Index of the district under the geographic point, if any
    pub fn district_at(&self, layer: &DistrictLayer, lon: f64, lat: f64) -> Option<usize> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .copied()
            .find(|&idx| layer.districts().get(idx).is_some_and(|d| d.contains(lon, lat)))
    }

    /// Districts whose bbox overlaps the visible area, in layer order
    fn visible_districts(&self, viewport: &Viewport) -> Vec<usize> {
        let (lon_a, lat_a) = viewport.unproject(0, 0);
        let (lon_b, lat_b) = viewport.unproject(viewport.width as i32, viewport.height as i32);
        let view = Rect::new(coord! { x: lon_a, y: lat_a }, coord! { x: lon_b, y: lat_b });
        let mut visible = Vec::new();
        self.grid.query_into(&view, &mut visible);
        visible.sort_unstable();
        visible.dedup();
        visible
    }

    /// Render fills, outlines and labels for a `width` x `height` char area
    pub fn render(
        &self,
        layer: &DistrictLayer,
        choropleth: &Choropleth,
        width: usize,
        height: usize,
        viewport: &Viewport,
    ) -> MapLayers {
        let mut canvas = BrailleCanvas::new(width, height);
        let mut labels = Vec::new();
        let visible = self.visible_districts(viewport);

        // Fills first so borders stay on top
        for &idx in &visible {
            let (Some(district), Some(region)) = (layer.districts().get(idx), choropleth.region(idx)) else {
                continue;
            };
            canvas.set_pen(choropleth.color_of(region));
            for polygon in &district.shape.0 {
                let rings: Vec<Vec<(f64, f64)>> = rings(polygon)
                    .map(|ring| ring.coords().map(|c| viewport.project_f64(c.x, c.y)).collect())
                    .collect();
                fill_rings(&mut canvas, &rings);
            }
        }

        if self.settings.show_outlines {
            canvas.set_pen(OUTLINE);
            for &idx in &visible {
                if let Some(district) = layer.districts().get(idx) {
                    for polygon in &district.shape.0 {
                        for ring in rings(polygon) {
                            self.draw_ring(&mut canvas, ring, viewport);
                        }
                    }
                }
            }
        }

        if self.settings.show_labels {
            for &idx in &visible {
                let Some(district) = layer.districts().get(idx) else {
                    continue;
                };
                let (lon, lat) = district.label_point();
                let (px, py) = viewport.project(lon, lat);
                if !viewport.is_visible(px, py) {
                    continue;
                }
                // Centre the name on the anchor (braille coords → char coords)
                let half = (district.name.chars().count() / 2) as i32;
                let char_x = (px / 2 - half).max(0) as u16;
                let char_y = (py / 4) as u16;
                labels.push((char_x, char_y, district.name.clone()));
            }
        }

        MapLayers { canvas, labels }
    }

    /// Draw a ring with viewport culling
    fn draw_ring(&self, canvas: &mut BrailleCanvas, ring: &LineString<f64>, viewport: &Viewport) {
        if ring.0.len() < 2 {
            return;
        }

        let mut prev: Option<(i32, i32)> = None;

        for c in ring.coords() {
            let (px, py) = viewport.project(c.x, c.y);

            if let Some((prev_x, prev_y)) = prev {
                if viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }

            prev = Some((px, py));
        }
    }

    /// Toggle district name labels
    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Toggle district outlines
    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }
}

/// Exterior ring followed by the holes
fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choropleth::join;
    use crate::data::districts::tests::sample_layer;
    use std::collections::BTreeMap;
    use std::time::{Duration, Instant};

    fn fitted(layer: &DistrictLayer, width: usize, height: usize) -> Viewport {
        Viewport::fit_bounds(layer.bounds(), width * 2, height * 4)
    }

    #[test]
    fn test_district_at() {
        let layer = sample_layer();
        let renderer = ChoroplethRenderer::new(&layer);
        assert_eq!(renderer.district_at(&layer, -83.75, 9.05), Some(0));
        assert_eq!(renderer.district_at(&layer, -83.45, 9.05), Some(3));
        assert_eq!(renderer.district_at(&layer, -83.45, 10.0), None);
    }

    #[test]
    fn test_render_shades_districts_by_count() {
        let layer = sample_layer();
        let mut renderer = ChoroplethRenderer::new(&layer);
        renderer.settings.show_outlines = false;
        let counts = BTreeMap::from([("Rivas".to_string(), 4)]);
        let map = join(&layer, &counts);

        let (w, h) = (40, 10);
        let layers = renderer.render(&layer, &map, w, h, &fitted(&layer, w, h));

        let hot = map.scale.color(4.0);
        let cold = map.scale.color(0.0);
        let mut hot_cells = 0;
        let mut cold_cells = 0;
        for row in 0..h {
            for col in 0..w {
                match layers.canvas.color_at(col, row) {
                    Some(c) if c == hot => hot_cells += 1,
                    Some(c) if c == cold => cold_cells += 1,
                    _ => {}
                }
            }
        }
        assert!(hot_cells > 0);
        // Three cold districts against one hot one
        assert!(cold_cells > hot_cells);
    }

    #[test]
    fn test_labels_follow_setting() {
        let layer = sample_layer();
        let mut renderer = ChoroplethRenderer::new(&layer);
        let map = join(&layer, &BTreeMap::new());
        let viewport = fitted(&layer, 80, 20);

        let layers = renderer.render(&layer, &map, 80, 20, &viewport);
        let names: Vec<&str> = layers.labels.iter().map(|(_, _, n)| n.as_str()).collect();
        assert_eq!(names, vec!["San Isidro de El General", "Daniel Flores", "Rivas", "Cajón"]);

        renderer.toggle_labels();
        assert!(renderer.render(&layer, &map, 80, 20, &viewport).labels.is_empty());
    }

    #[test]
    fn test_zoomed_out_render_stays_cheap() {
        let layer = sample_layer();
        let renderer = ChoroplethRenderer::new(&layer);
        let map = join(&layer, &BTreeMap::new());
        let mut viewport = fitted(&layer, 100, 30);
        for _ in 0..40 {
            viewport.zoom_out();
        }

        let start = Instant::now();
        renderer.render(&layer, &map, 100, 30, &viewport);
        assert!(start.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn test_outlines_use_outline_pen() {
        let layer = sample_layer();
        let renderer = ChoroplethRenderer::new(&layer);
        let map = join(&layer, &BTreeMap::new());
        let layers = renderer.render(&layer, &map, 40, 10, &fitted(&layer, 40, 10));
        let outlined = (0..10)
            .flat_map(|row| (0..40).map(move |col| (col, row)))
            .filter(|&(col, row)| layers.canvas.color_at(col, row) == Some(OUTLINE))
            .count();
        assert!(outlined > 0);
    }
}
