use crate::analysis::{self, Outcome};
use crate::choropleth::{self, Choropleth};
use crate::config::MapConfig;
use crate::data::{Datasets, EventKind};
use crate::map::{ChoroplethRenderer, Viewport};
use anyhow::{bail, Result};
use ratatui::layout::Rect;
use std::cell::Cell;

/// Initial control values and map view
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub kind: EventKind,
    pub year: Option<i32>,
    pub map: MapConfig,
}

/// Application state
pub struct App {
    pub data: Datasets,
    /// Distinct years in the event table, ascending (never empty)
    pub years: Vec<i32>,
    pub kind: EventKind,
    pub year_index: usize,
    /// Result of the last pipeline run
    pub outcome: Outcome,
    /// Joined map data; `None` when the selection is empty
    pub choropleth: Option<Choropleth>,
    pub viewport: Viewport,
    pub map_renderer: ChoroplethRenderer,
    pub should_quit: bool,
    /// First visible table row
    pub table_offset: usize,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// District under the mouse cursor
    pub hovered: Option<usize>,
    /// Inner map area of the last frame, written by the UI
    pub map_area: Cell<Rect>,
    /// Refit the map to the districts on resize until the user moves it
    auto_fit: bool,
    map_options: MapConfig,
}

impl App {
    pub fn new(data: Datasets, options: AppOptions) -> Result<Self> {
        if data.events.is_empty() {
            bail!("the event table has no rows");
        }
        let years = data.events.years();
        let year_index = match options.year {
            Some(year) => years.iter().position(|&y| y == year).unwrap_or_else(|| {
                tracing::warn!(year, "requested year not in data; using the first year");
                0
            }),
            None => 0,
        };

        let mut map_renderer = ChoroplethRenderer::new(&data.districts);
        map_renderer.settings.show_labels = options.map.show_labels;

        let mut app = Self {
            viewport: Viewport::new(0.0, 0.0, 1.0, 0, 0),
            map_renderer,
            years,
            kind: options.kind,
            year_index,
            outcome: Outcome::Empty {
                kind: options.kind,
                year: 0,
            },
            choropleth: None,
            should_quit: false,
            table_offset: 0,
            last_mouse: None,
            mouse_pos: None,
            hovered: None,
            map_area: Cell::new(Rect::default()),
            auto_fit: true,
            map_options: options.map,
            data,
        };
        app.reset_view();
        app.refresh();
        Ok(app)
    }

    pub fn year(&self) -> i32 {
        self.years[self.year_index]
    }

    /// Re-run filter → aggregate → join for the current controls
    pub fn refresh(&mut self) {
        self.outcome = analysis::run(&self.data.events, self.kind, self.year());
        self.choropleth = self
            .outcome
            .summary()
            .map(|summary| choropleth::join(&self.data.districts, &summary.by_district));
        self.table_offset = 0;
        tracing::debug!(kind = %self.kind, year = self.year(), "pipeline re-run");
    }

    pub fn next_kind(&mut self) {
        self.kind = self.kind.next();
        self.refresh();
    }

    pub fn prev_kind(&mut self) {
        self.kind = self.kind.prev();
        self.refresh();
    }

    pub fn next_year(&mut self) {
        if self.year_index + 1 < self.years.len() {
            self.year_index += 1;
            self.refresh();
        }
    }

    pub fn prev_year(&mut self) {
        if self.year_index > 0 {
            self.year_index -= 1;
            self.refresh();
        }
    }

    /// Scroll the table by `delta` rows, clamped to the selection
    pub fn scroll_table(&mut self, delta: i32) {
        let rows = self.outcome.summary().map_or(0, |s| s.rows.len());
        let max = rows.saturating_sub(1) as i64;
        self.table_offset = (self.table_offset as i64 + delta as i64).clamp(0, max) as usize;
    }

    /// Pixel size of the map canvas for the last drawn frame
    fn map_pixels(&self) -> (usize, usize) {
        let area = self.map_area.get();
        (area.width as usize * 2, area.height as usize * 4)
    }

    /// Apply the map area of the last frame to the viewport
    pub fn sync_map_area(&mut self) {
        let (width, height) = self.map_pixels();
        if width == self.viewport.width && height == self.viewport.height {
            return;
        }
        if self.auto_fit {
            self.reset_view();
        } else {
            self.viewport.width = width;
            self.viewport.height = height;
        }
    }

    /// Configured centre/zoom, else fit to the districts
    fn initial_view(&self, width: usize, height: usize) -> Viewport {
        let mut viewport = Viewport::fit_bounds(self.data.districts.bounds(), width, height);
        if let (Some(lon), Some(lat)) = (self.map_options.center_lon, self.map_options.center_lat) {
            viewport.center_lon = lon;
            viewport.center_lat = lat;
        }
        if let Some(zoom) = self.map_options.zoom {
            viewport = Viewport::new(viewport.center_lon, viewport.center_lat, zoom, width, height);
        }
        viewport
    }

    /// Restore the initial view for the current map area
    pub fn reset_view(&mut self) {
        let (width, height) = self.map_pixels();
        self.viewport = self.initial_view(width, height);
        self.auto_fit = true;
    }

    /// Viewport to draw into `area` (character cells) this frame. Until the
    /// user moves the map it is fitted to `area`, so the first frame after
    /// a resize is already framed on the districts.
    pub fn viewport_for(&self, area: Rect) -> Viewport {
        let (width, height) = (area.width as usize * 2, area.height as usize * 4);
        if self.auto_fit && (width, height) != (self.viewport.width, self.viewport.height) {
            return self.initial_view(width, height);
        }
        let mut viewport = self.viewport.clone();
        viewport.width = width;
        viewport.height = height;
        viewport
    }

    /// Convert terminal coords to braille pixel coords inside the map
    fn to_map_pixels(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area.get();
        let inside = col >= area.x
            && col < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        inside.then(|| (((col - area.x) as i32) * 2, ((row - area.y) as i32) * 4))
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.auto_fit = false;
        self.viewport.pan(dx, dy);
        self.update_hover();
    }

    /// Zoom in
    pub fn zoom_in(&mut self) {
        self.auto_fit = false;
        self.viewport.zoom_in();
        self.update_hover();
    }

    /// Zoom out
    pub fn zoom_out(&mut self) {
        self.auto_fit = false;
        self.viewport.zoom_out();
        self.update_hover();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_map_pixels(col, row) {
            self.auto_fit = false;
            self.viewport.zoom_in_at(px, py);
            self.update_hover();
        }
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.to_map_pixels(col, row) {
            self.auto_fit = false;
            self.viewport.zoom_out_at(px, py);
            self.update_hover();
        }
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Handle mouse drag on the map
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    /// Start a drag only when pressing inside the map
    pub fn start_drag(&mut self, x: u16, y: u16) {
        if self.to_map_pixels(x, y).is_some() {
            self.last_mouse = Some((x, y));
        }
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Update mouse cursor position and the hovered district
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.update_hover();
    }

    fn update_hover(&mut self) {
        self.hovered = self
            .mouse_pos
            .and_then(|(col, row)| self.to_map_pixels(col, row))
            .and_then(|(px, py)| {
                let (lon, lat) = self.viewport.unproject(px, py);
                self.map_renderer.district_at(&self.data.districts, lon, lat)
            });
    }

    /// Cursor position relative to the map area, in character cells
    pub fn map_cursor(&self) -> Option<(u16, u16)> {
        let area = self.map_area.get();
        self.mouse_pos
            .and_then(|(col, row)| self.to_map_pixels(col, row).map(|_| (col - area.x, row - area.y)))
    }

    /// "Eventos registrados: INUNDACION en 2010"
    pub fn subtitle(&self) -> String {
        format!("Eventos registrados: {} en {}", self.kind, self.year())
    }

    pub fn map_title(&self) -> String {
        format!(
            "Mapa de cantidad de {kind} por distrito ({kind} en {year})",
            kind = self.kind,
            year = self.year()
        )
    }

    /// Hover text for the district under the cursor
    pub fn tooltip(&self) -> Option<String> {
        let choropleth = self.choropleth.as_ref()?;
        let region = choropleth.region(self.hovered?)?;
        Some(format!(
            "Distrito: {} | Cantidad de {}: {}",
            region.name, self.kind, region.count
        ))
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.0}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.3}°{}, {:.3}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}
