use std::collections::HashMap;
use std::io::{Stdout, stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use laneview_core::{
    EngineConfig, Hit, InteractionController, LaneSet, TimeScale, VirtualizationEngine, Viewport,
};
use laneview_protocol::{
    Item, ItemId, LaneState, Sample, TimeRange, TimelineDocument, VirtualizationState,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Paragraph},
};

use crate::input::{self, Action, CHROME_ROWS, GUTTER, TOP};

const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const FRAME: Duration = Duration::from_millis(16);

const BLOCK_FILL: Color = Color::Rgb(100, 150, 200);
const MARKER: Color = Color::Rgb(200, 100, 100);
const CURVE: Color = Color::Rgb(80, 160, 240);
const HOVER: Color = Color::LightYellow;

struct App<'a> {
    items: HashMap<ItemId, &'a Item>,
    labels: HashMap<&'a str, &'a str>,
    lanes: LaneSet,
    engine: VirtualizationEngine,
    controller: InteractionController,
    state: Option<VirtualizationState>,
    pointer: Option<(f64, f64)>,
}

pub fn run(doc: &TimelineDocument, config: EngineConfig) -> Result<()> {
    let bounds =
        viewer_bounds(doc).context("timeline has no bounds and no item with a finite span")?;
    let (cols, rows) = terminal::size()?;
    let (width, height) = input::surface_size(cols, rows);
    let viewport = Viewport::new(bounds, width, height)?;

    let mut app = App {
        items: doc.items.iter().map(|i| (i.id(), i)).collect(),
        labels: doc
            .lanes
            .iter()
            .map(|l| {
                let label = l.label.as_deref().unwrap_or(l.id.as_str());
                (l.id.as_str(), label)
            })
            .collect(),
        lanes: LaneSet::build(&doc.lanes, &doc.items),
        engine: VirtualizationEngine::new(config.clone()),
        controller: InteractionController::new(viewport, config),
        state: None,
        pointer: None,
    };

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App<'_>) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| app.draw(frame))?;

        if !event::poll(FRAME)? {
            continue;
        }
        // Drain everything queued so it lands in a single tick.
        loop {
            match input::map_event(&event::read()?) {
                Action::Quit => return Ok(()),
                Action::Input(e) => {
                    if let Err(err) = app.controller.handle(e) {
                        tracing::debug!(error = %err, event = ?e, "input rejected");
                    }
                }
                Action::Hover(pointer) => app.pointer = pointer,
                Action::None => {}
            }
            if !event::poll(Duration::ZERO)? {
                break;
            }
        }
    }
}

impl App<'_> {
    fn tick(&mut self) {
        match self.controller.tick(&self.engine, &self.lanes) {
            Ok(Some(state)) if self.controller.is_current(&state) => self.state = Some(state),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "viewport update rejected"),
        }
    }

    fn hovered(&self, state: &VirtualizationState) -> Option<Hit> {
        let (x, y) = self.pointer?;
        self.engine
            .hit_test(self.controller.viewport(), &self.lanes, state, x, y)
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        let header = Block::default()
            .title(format!(
                " laneview | {} lanes, {} items | ←→ pan | +/- zoom | 0 reset | q quit ",
                self.lanes.len(),
                self.items.len()
            ))
            .style(Style::default().fg(Color::White).bg(Color::DarkGray));
        frame.render_widget(header, Rect::new(0, 0, area.width, 1));

        let content = Rect::new(
            0,
            TOP,
            area.width,
            area.height.saturating_sub(CHROME_ROWS),
        );
        frame.render_widget(
            Block::default().style(Style::default().bg(Color::Black)),
            content,
        );

        let Some(state) = &self.state else {
            return;
        };
        let hit = self.hovered(state);

        let status = Paragraph::new(self.status_line(state, hit.as_ref()))
            .style(Style::default().fg(Color::Gray).bg(Color::DarkGray));
        frame.render_widget(
            status,
            Rect::new(0, area.height.saturating_sub(1), area.width, 1),
        );

        let buf = frame.buffer_mut();
        for lane in &state.lanes {
            self.draw_lane(buf, content, state, lane, hit.as_ref().map(|h| h.item));
        }
    }

    fn draw_lane(
        &self,
        buf: &mut Buffer,
        content: Rect,
        state: &VirtualizationState,
        lane: &LaneState,
        hovered: Option<ItemId>,
    ) {
        let viewport = self.controller.viewport();
        let scale = viewport.scale();
        let config = self.engine.config();
        let surface = Surface {
            area: content,
            width: viewport.width_px(),
        };
        let top = lane.y_offset - viewport.scroll_y();

        let label = self
            .labels
            .get(lane.lane_id.as_str())
            .copied()
            .unwrap_or(lane.lane_id.as_str());
        let header_row = top.floor() as i64;
        for (i, ch) in label.chars().take(usize::from(GUTTER) - 1).enumerate() {
            surface.gutter(buf, i as u16, header_row, ch, Color::White);
        }
        if config.lane_header_px > 0.0 {
            for col in 0..surface.width as i64 {
                surface.put(buf, col, header_row, '─', Color::DarkGray, Color::Black);
            }
        }

        for placement in &lane.items {
            let Some(item) = self.items.get(&placement.item) else {
                continue;
            };
            let row = (top + config.lane_header_px + f64::from(placement.row) * config.row_height_px)
                .floor() as i64;
            let is_hovered = hovered == Some(placement.item);

            match item {
                Item::TimeRange(block) => {
                    let Some((x0, x1)) = columns(scale, block.span, surface.width) else {
                        continue;
                    };
                    let bg = if is_hovered { HOVER } else { BLOCK_FILL };
                    let mut text = block.label.chars();
                    for col in x0..x1 {
                        let ch = if col == x0 { ' ' } else { text.next().unwrap_or(' ') };
                        surface.put(buf, col, row, ch, Color::Black, bg);
                    }
                }
                Item::Event(event) => {
                    let col = scale.to_pixel(event.at).floor();
                    if col >= 0.0 && col < surface.width {
                        let fg = if is_hovered { HOVER } else { MARKER };
                        surface.put(buf, col as i64, row, '◆', fg, Color::Black);
                    }
                }
                Item::Curve(curve) => {
                    let Some((x0, x1)) = columns(scale, curve.span, surface.width) else {
                        continue;
                    };
                    let samples = curve.visible_samples(&state.query_window);
                    let (lo, hi) = value_range(&curve.samples);
                    let fg = if is_hovered { HOVER } else { CURVE };
                    for col in x0..x1 {
                        let t = scale.to_time(col as f64 + 0.5);
                        if let Some(v) = sample_at(samples, t) {
                            surface.put(buf, col, row, level(v, lo, hi), fg, Color::Black);
                        }
                    }
                }
            }
        }
    }

    fn status_line(&self, state: &VirtualizationState, hit: Option<&Hit>) -> String {
        let viewport = self.controller.viewport();
        let snapshot = viewport.current();
        let mut line = format!(
            " [{:.3} .. {:.3}] zoom {:.2}x | {:?} | rev {} | {} visible",
            snapshot.domain.start,
            snapshot.domain.end,
            snapshot.zoom,
            viewport.mode(),
            state.revision,
            state.visible_item_count(),
        );
        if !state.diagnostics.is_empty() {
            line.push_str(&format!(" | {} dropped", state.diagnostics.len()));
        }
        if let Some(item) = hit.and_then(|h| self.items.get(&h.item)) {
            let span = item.span();
            let label = item.label().map_or("", |l| l.as_str());
            line.push_str(&format!(
                " | {} {label} [{:.3} .. {:.3}]",
                item.id(),
                span.start,
                span.end
            ));
        }
        line
    }
}

/// The timeline surface: the content area right of the label gutter.
struct Surface {
    area: Rect,
    width: f64,
}

impl Surface {
    fn put(&self, buf: &mut Buffer, col: i64, row: i64, ch: char, fg: Color, bg: Color) {
        if col < 0 || row < 0 || col as f64 >= self.width || row >= i64::from(self.area.height) {
            return;
        }
        let x = self.area.x + GUTTER + col as u16;
        let y = self.area.y + row as u16;
        if x < self.area.x + self.area.width {
            buf[(x, y)].set_char(ch).set_fg(fg).set_bg(bg);
        }
    }

    fn gutter(&self, buf: &mut Buffer, col: u16, row: i64, ch: char, fg: Color) {
        if row < 0 || row >= i64::from(self.area.height) || col >= self.area.width {
            return;
        }
        buf[(self.area.x + col, self.area.y + row as u16)]
            .set_char(ch)
            .set_fg(fg);
    }
}

/// Envelope to open the viewer on. A hull derived from instants only has
/// no width, so it is widened by one unit each side.
fn viewer_bounds(doc: &TimelineDocument) -> Option<TimeRange> {
    let bounds = doc.effective_bounds()?;
    if doc.bounds.is_none() && bounds.span() == 0.0 {
        return Some(TimeRange::new(bounds.start - 1.0, bounds.end + 1.0));
    }
    Some(bounds)
}

/// Columns `[x0, x1)` covered by `span`, clipped to the surface.
fn columns(scale: &TimeScale, span: TimeRange, width: f64) -> Option<(i64, i64)> {
    let start = scale.to_pixel(span.start);
    let end = scale.to_pixel(span.end);
    if end < 0.0 || start >= width {
        return None;
    }
    let x0 = start.floor().max(0.0);
    let x1 = end.ceil().min(width).max(x0 + 1.0);
    Some((x0 as i64, x1 as i64))
}

/// Linear interpolation between the samples around `t`.
fn sample_at(samples: &[Sample], t: f64) -> Option<f64> {
    let i = samples.partition_point(|s| s.t <= t);
    let before = i.checked_sub(1).and_then(|j| samples.get(j));
    match (before, samples.get(i)) {
        (Some(a), Some(b)) if b.t > a.t => Some(a.value + (b.value - a.value) * (t - a.t) / (b.t - a.t)),
        (Some(a), _) => Some(a.value),
        (None, Some(b)) => Some(b.value),
        (None, None) => None,
    }
}

fn value_range(samples: &[Sample]) -> (f64, f64) {
    samples.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        (lo.min(s.value), hi.max(s.value))
    })
}

fn level(v: f64, lo: f64, hi: f64) -> char {
    let frac = if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };
    let i = (frac.clamp(0.0, 1.0) * (LEVELS.len() - 1) as f64).round() as usize;
    LEVELS[i.min(LEVELS.len() - 1)]
}
