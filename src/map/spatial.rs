use geo::Rect;
use std::collections::HashMap;

/// Spatial index for district polygons using conservative approximation.
/// Each polygon's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the point-in-polygon test of the caller).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
    /// Inclusive cell range holding any feature; queries never walk past it
    extent: Option<((i32, i32), (i32, i32))>,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
            extent: None,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from feature bounding boxes (each feature inserted into every
    /// cell its bbox overlaps)
    pub fn build(bounds: impl Iterator<Item = Rect<f64>>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, b) in bounds.enumerate() {
            let min_cell = grid.to_cell(b.min().x, b.min().y);
            let max_cell = grid.to_cell(b.max().x, b.max().y);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
            grid.extent = Some(match grid.extent {
                None => (min_cell, max_cell),
                Some((lo, hi)) => (
                    (lo.0.min(min_cell.0), lo.1.min(min_cell.1)),
                    (hi.0.max(max_cell.0), hi.1.max(max_cell.1)),
                ),
            });
        }
        grid
    }

    /// Feature indices whose bbox cell covers the point
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append feature indices for the given bounds into results vec.
    /// May contain duplicates; caller should dedup after all queries.
    pub fn query_into(&self, bounds: &Rect<f64>, results: &mut Vec<usize>) {
        let Some((lo, hi)) = self.extent else {
            return;
        };
        let min_cell = self.to_cell(bounds.min().x, bounds.min().y);
        let max_cell = self.to_cell(bounds.max().x, bounds.max().y);
        for y in min_cell.1.max(lo.1)..=max_cell.1.min(hi.1) {
            for x in min_cell.0.max(lo.0)..=max_cell.0.min(hi.0) {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
    }
}
