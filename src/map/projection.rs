use geo::Rect;
use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 200_000.0;
const ZOOM_STEP: f64 = 1.5;

/// Web Mercator x in [0, 1]
fn merc_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Web Mercator y in [0, 1], north up
fn merc_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.0, 85.0) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

fn inv_merc_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

fn inv_merc_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Centre on `bounds` and zoom so they fill ~90% of the canvas
    pub fn fit_bounds(bounds: Option<Rect<f64>>, width: usize, height: usize) -> Self {
        let Some(bounds) = bounds.filter(|_| width > 0 && height > 0) else {
            return Self::new(0.0, 0.0, 1.0, width, height);
        };
        let (min, max) = (bounds.min(), bounds.max());
        let center_lon = bounds.center().x;
        let x_span = (merc_x(max.x) - merc_x(min.x)).abs();
        let y_span = (merc_y(min.y) - merc_y(max.y)).abs();
        let center_lat = inv_merc_y((merc_y(min.y) + merc_y(max.y)) / 2.0);

        // scale = zoom * width pixels per Mercator unit
        let zoom_x = if x_span > 0.0 { 1.0 / x_span } else { MAX_ZOOM };
        let zoom_y = if y_span > 0.0 {
            height as f64 / (width as f64 * y_span)
        } else {
            MAX_ZOOM
        };
        Self::new(center_lon, center_lat, zoom_x.min(zoom_y) * 0.9, width, height)
    }

    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.scale();
        let x = merc_x(self.center_lon) + dx as f64 / scale;
        let y = merc_y(self.center_lat) + dy as f64 / scale;

        self.center_lon = inv_merc_x(x);
        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = inv_merc_y(y).clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    /// Zoom by factor keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.scale();
        let x = (px as f64 - self.width as f64 / 2.0) / scale + merc_x(self.center_lon);
        let y = (py as f64 - self.height as f64 / 2.0) / scale + merc_y(self.center_lat);
        (inv_merc_x(x), inv_merc_y(y))
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = self.project_f64(lon, lat);
        (x.floor() as i32, y.floor() as i32)
    }

    /// Sub-pixel projection, used by the polygon filler
    pub fn project_f64(&self, lon: f64, lat: f64) -> (f64, f64) {
        let scale = self.scale();
        let px = (merc_x(lon) - merc_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (merc_y(lat) - merc_y(self.center_lat)) * scale + self.height as f64 / 2.0;
        (px, py)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
