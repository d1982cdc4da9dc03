use crate::analysis::{Outcome, Summary, EMPTY_NOTICE};
use crate::app::App;
use crate::choropleth::Choropleth;
use crate::data::EventKind;
use crate::map::MapLayers;
use crate::report::{format_usd, group_thousands, record_cells, TABLE_COLUMNS, TITLE};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 30;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Min(8),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_title(frame, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(chunks[1]);

    render_sidebar(frame, app, body[0]);
    match &app.outcome {
        Outcome::Empty { .. } => render_empty(frame, app, body[1]),
        Outcome::Ready(summary) => render_selection(frame, app, summary, body[1]),
    }
    render_status_bar(frame, app, chunks[2]);
}

fn render_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(Span::styled(
        TITLE,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

fn panel(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(Span::styled("Tipo de evento [Tab]", label))];
    for kind in EventKind::ALL {
        let selected = kind == app.kind;
        let marker = if selected { "● " } else { "○ " };
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(format!(" {marker}{}", kind.label()), style)));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Año [← →]", label)));
    let first = app.year_index == 0;
    let last = app.year_index + 1 == app.years.len();
    lines.push(Line::from(vec![
        Span::styled(if first { "   " } else { " ◀ " }, Style::default().fg(Color::Cyan)),
        Span::styled(
            app.year().to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(if last { "   " } else { " ▶ " }, Style::default().fg(Color::Cyan)),
    ]));

    if let Some(summary) = app.outcome.summary() {
        let value = Style::default().fg(Color::White);
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("Registros: ", label),
            Span::styled(summary.rows.len().to_string(), value),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Afectados: ", label),
            Span::styled(group_thousands(summary.total_affected), value),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Pérdidas:  ", label),
            Span::styled(format!("${}", format_usd(summary.total_loss_usd)), value),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Distritos: ", label),
            Span::styled(summary.by_district.len().to_string(), value),
        ]));
    }

    if let Some(choropleth) = &app.choropleth {
        if !choropleth.unmatched.is_empty() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("Sin polígono:", Style::default().fg(Color::Red))));
            for name in &choropleth.unmatched {
                lines.push(Line::from(Span::styled(format!(" {name}"), Style::default().fg(Color::Red))));
            }
        }
    }

    let sidebar = Paragraph::new(lines)
        .block(panel("Controles".to_string()))
        .wrap(Wrap { trim: false });
    frame.render_widget(sidebar, area);
}

fn render_empty(frame: &mut Frame, app: &App, area: Rect) {
    // No map this frame: mouse input must not reach it
    app.map_area.set(Rect::default());

    let notice = Paragraph::new(Span::styled(
        EMPTY_NOTICE,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
    .block(panel(app.subtitle()))
    .wrap(Wrap { trim: true });
    frame.render_widget(notice, area);
}

fn render_selection(frame: &mut Frame, app: &App, summary: &Summary, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    render_table(frame, app, summary, chunks[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_chart(frame, summary, bottom[0]);
    render_map(frame, app, bottom[1]);
}

fn render_table(frame: &mut Frame, app: &App, summary: &Summary, area: Rect) {
    let header = Row::new(TABLE_COLUMNS.iter().map(|c| Cell::from(*c)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = summary
        .rows
        .iter()
        .skip(app.table_offset)
        .map(|record| Row::new(record_cells(record)))
        .collect();

    let footer = Row::new([
        Cell::from(format!("{} registros", summary.rows.len())),
        Cell::from(""),
        Cell::from(""),
        Cell::from(""),
        Cell::from(""),
        Cell::from(group_thousands(summary.total_affected)),
        Cell::from(format_usd(summary.total_loss_usd)),
    ])
    .style(Style::default().fg(Color::Cyan));

    // First column also holds the "N registros" footer
    let widths = [
        Constraint::Length(14),
        Constraint::Min(10),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(24),
        Constraint::Length(15),
        Constraint::Length(15),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .footer(footer)
        .column_spacing(1)
        .block(panel(format!(
            "Eventos registrados: {} en {}",
            summary.kind, summary.year
        )));
    frame.render_widget(table, area);
}

fn render_chart(frame: &mut Frame, summary: &Summary, area: Rect) {
    let selected = summary.year;
    let bars: Vec<Bar> = summary
        .by_year
        .iter()
        .map(|(&year, &count)| {
            let color = if year == selected { Color::Yellow } else { Color::Cyan };
            Bar::default()
                .value(count)
                .label(Line::from(year.to_string()))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    // Spread the bars over the inner width, gaps included
    let slots = summary.by_year.len().max(1) as u16;
    let bar_width = (area.width.saturating_sub(2) / slots).saturating_sub(1).clamp(1, 6);

    let chart = BarChart::default()
        .block(panel(format!("Cantidad de {} por año", summary.kind)))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1);
    frame.render_widget(chart, area);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel(app.map_title());
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.map_area.set(inner);

    let Some(choropleth) = &app.choropleth else {
        return;
    };

    // Braille gives 2x4 resolution per character
    let viewport = app.viewport_for(inner);

    let layers = app.map_renderer.render(
        &app.data.districts,
        choropleth,
        inner.width as usize,
        inner.height as usize,
        &viewport,
    );

    let map_widget = MapWidget {
        layers,
        choropleth,
        kind: app.kind,
        tooltip: app.tooltip(),
        cursor_pos: app.map_cursor(),
    };
    frame.render_widget(map_widget, inner);
}

/// Custom widget that renders the coloured braille map with text overlays
struct MapWidget<'a> {
    layers: MapLayers,
    choropleth: &'a Choropleth,
    kind: EventKind,
    tooltip: Option<String>,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget<'_> {
    fn render_canvas(&self, area: Rect, buf: &mut Buffer) {
        let canvas = &self.layers.canvas;
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                let color = canvas.color_at(col_idx, row_idx).unwrap_or(Color::White);
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }

    /// Write text on one row, clipped to the area
    fn put_str(area: Rect, buf: &mut Buffer, x: u16, y: u16, text: &str, style: Style) {
        if y >= area.height {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let col = x + i as u16;
            if col >= area.width {
                break;
            }
            buf[(area.x + col, area.y + y)].set_char(ch).set_style(style);
        }
    }

    fn render_legend(&self, area: Rect, buf: &mut Buffer) {
        let Some(bottom) = area.height.checked_sub(1) else {
            return;
        };
        let scale = &self.choropleth.scale;
        let label_style = Style::default().fg(Color::White).bg(Color::Black);

        let prefix = format!("Cantidad de {}: {} ", self.kind, scale.min);
        Self::put_str(area, buf, 0, bottom, &prefix, label_style);
        let mut x = prefix.chars().count() as u16;
        for (_, color) in scale.legend(9) {
            Self::put_str(area, buf, x, bottom, "█", Style::default().fg(color));
            x += 1;
        }
        Self::put_str(area, buf, x, bottom, &format!(" {}", scale.max), label_style);

        if !self.choropleth.unmatched.is_empty() && bottom > 0 {
            let text = format!("Sin polígono: {}", self.choropleth.unmatched.join(", "));
            Self::put_str(area, buf, 0, bottom - 1, &text, Style::default().fg(Color::Red).bg(Color::Black));
        }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.render_canvas(area, buf);

        let label_style = Style::default()
            .fg(Color::White)
            .bg(Color::Black)
            .add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            Self::put_str(area, buf, *lx, *ly, text, label_style);
        }

        self.render_legend(area, buf);

        if let Some(tooltip) = &self.tooltip {
            let style = Style::default().fg(Color::Black).bg(Color::Yellow);
            Self::put_str(area, buf, 0, 0, &format!(" {tooltip} "), style);
        }

        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" ", Style::default()),
        Span::styled(
            if settings.show_labels { "[L]abels " } else { "[l]abels " },
            Style::default().fg(if settings.show_labels { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            if settings.show_outlines { "[O]utlines " } else { "[o]utlines " },
            Style::default().fg(if settings.show_outlines { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | Tab:evento ←/→:año PgUp/PgDn:tabla hjkl:pan +/-:zoom r:reset q:salir",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(status);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppOptions;
    use crate::config::MapConfig;
    use crate::data::districts::tests::sample_layer;
    use crate::data::events::tests::sample_table;
    use crate::data::Datasets;
    use ratatui::{backend::TestBackend, Terminal};

    fn app_with(kind: EventKind, year: i32) -> App {
        let data = Datasets {
            events: sample_table(),
            districts: sample_layer(),
        };
        let options = AppOptions {
            kind,
            year: Some(year),
            map: MapConfig::default(),
        };
        App::new(data, options).unwrap()
    }

    fn draw(app: &App) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(160, 48)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn screen_text(buffer: &Buffer) -> String {
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_ready_layout_titles() {
        let app = app_with(EventKind::Flood, 2010);
        let screen = screen_text(&draw(&app));
        assert!(screen.contains(TITLE));
        assert!(screen.contains("Eventos registrados: INUNDACION en 2010"));
        assert!(screen.contains("Cantidad de INUNDACION por año"));
        assert!(screen.contains("Mapa de cantidad de INUNDACION por distrito (INUNDACION en 2010)"));
        assert!(screen.contains("TOTAL_AFECTADOS"));
        assert!(screen.contains("3 registros"));
        assert!(!app.map_area.get().is_empty());
    }

    #[test]
    fn test_first_frame_shades_districts() {
        let app = app_with(EventKind::Flood, 2010);
        let buffer = draw(&app);
        let area = app.map_area.get();
        let scale = app.choropleth.as_ref().unwrap().scale;
        let (hot, cold) = (scale.color(scale.max), scale.color(scale.min));

        let mut hot_cells = 0;
        let mut cold_cells = 0;
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                let cell = &buffer[(x, y)];
                let braille = cell
                    .symbol()
                    .chars()
                    .next()
                    .is_some_and(|c| ('\u{2801}'..='\u{28FF}').contains(&c));
                if braille && cell.fg == hot {
                    hot_cells += 1;
                }
                if braille && cell.fg == cold {
                    cold_cells += 1;
                }
            }
        }
        assert!(hot_cells > 0);
        assert!(cold_cells > 0);

        // Labels sit on their own districts, not stacked on one spot
        let screen = screen_text(&buffer);
        assert!(screen.contains("Rivas"));
        assert!(screen.contains("Cajón"));
    }

    #[test]
    fn test_empty_selection_hides_chart_and_map() {
        let app = app_with(EventKind::Landslide, 2016);
        let screen = screen_text(&draw(&app));
        assert!(screen.contains(EMPTY_NOTICE));
        assert!(!screen.contains("por año"));
        assert!(!screen.contains("Mapa de cantidad"));
        assert!(app.map_area.get().is_empty());
    }
}
