//! Ratatui-based terminal dashboard.
//!
//! The dashboard provides country/year selectors and a forecast trigger, then
//! renders the reconciled SPI timeline. The forecast request runs in the
//! background; the event loop polls the orchestrator between key events so the
//! UI stays responsive while a request is in flight.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use tracing::debug;

use crate::cli::RunArgs;
use crate::data::presets::{PRESETS, next_country, prev_country};
use crate::domain::{ForecastConfig, RequestState, TimelineSeries, YEAR_OPTIONS};
use crate::error::{AppError, ForecastError};
use crate::forecast::{Dispatch, ForecastClient, ForecastOrchestrator, HttpForecastClient};

mod plotters_chart;

use plotters_chart::{ACTUAL_RGB, FORECAST_RGB, SpiPlottersChart};

const FIELD_COUNT: usize = 2;
const SPI_AXIS: [f64; 2] = [0.0, 100.0];

/// Start the TUI.
pub fn run(args: &RunArgs, config: &ForecastConfig) -> Result<(), AppError> {
    let client = HttpForecastClient::new(config)?;
    let endpoint = client.endpoint().to_string();
    let orchestrator = ForecastOrchestrator::new(client).with_debt_policy(config.debt_policy);
    let mut app = App::new(args, orchestrator, endpoint)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App<C> {
    country: &'static str,
    year: u16,
    selected_field: usize,
    status: String,
    endpoint: String,
    orchestrator: ForecastOrchestrator<C>,
}

impl<C: ForecastClient + 'static> App<C> {
    fn new(args: &RunArgs, orchestrator: ForecastOrchestrator<C>, endpoint: String) -> Result<Self, AppError> {
        let country = PRESETS
            .iter()
            .find(|p| p.country == args.country)
            .map(|p| p.country)
            .ok_or_else(|| ForecastError::UnknownCountry(args.country.clone()))?;

        Ok(Self {
            country,
            year: args.year,
            selected_field: 0,
            status: "Press Enter to run the ML forecast.".to_string(),
            endpoint,
            orchestrator,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.orchestrator.poll() {
                self.on_settled();
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter | KeyCode::Char('f') => self.request_forecast(),
            KeyCode::Char('c') => {
                if self.orchestrator.cancel() {
                    self.status = "Forecast cancelled.".to_string();
                }
            }
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            0 => {
                self.country = if delta >= 0 {
                    next_country(self.country)
                } else {
                    prev_country(self.country)
                };
                // A response for the old selection must not land on the new one.
                if self.orchestrator.cancel() {
                    self.status = format!("country: {} (pending forecast discarded)", self.country);
                } else {
                    self.status = format!("country: {}", self.country);
                }
            }
            1 => {
                self.year = step_year(self.year, delta);
                self.status = format!("year: {}", self.year);
            }
            _ => {}
        }
    }

    fn request_forecast(&mut self) {
        match self.orchestrator.request_forecast(self.country) {
            Ok(Dispatch::Started(token)) => {
                debug!(token = token.value(), "forecast started from dashboard");
                self.status = "Forecasting...".to_string();
            }
            Ok(Dispatch::Rejected { .. }) => {
                self.status = "A forecast is already running.".to_string();
            }
            Err(err) => {
                self.status = err.to_string();
            }
        }
    }

    fn on_settled(&mut self) {
        self.status = match self.orchestrator.state() {
            RequestState::Succeeded(_) => format!("Forecast ready for {} ({}).", self.country, self.year),
            RequestState::Failed(err) => err.to_string(),
            RequestState::Idle | RequestState::InFlight => return,
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("SPI Dashboard", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(": Societal Pressure Index"),
        ]));
        lines.push(Line::from(Span::styled(
            "Estimates stress from living cost, debt, and income. Lower = better.",
            Style::default().fg(Color::Gray),
        )));

        if self.orchestrator.state().forecast().is_some() {
            lines.push(Line::from(vec![
                Span::raw("Forecasting SPI for "),
                Span::styled(self.country, Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" in "),
                Span::styled(self.year.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            ]));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(6)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title("Societal Pressure Index Over Time")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let timeline = self.orchestrator.timeline();
        let actual = timeline.actual_points();
        let forecast = timeline.forecast_points();
        let (x_bounds, y_bounds) = chart_bounds(&timeline);

        let legend_rect = Rect { height: inner.height.min(1), ..inner };
        frame.render_widget(Paragraph::new(legend(&timeline)), legend_rect);

        let plot_area = Rect {
            y: inner.y + legend_rect.height,
            height: inner.height.saturating_sub(legend_rect.height),
            ..inner
        };
        let (chart_rect, insets) = chart_layout(plot_area);
        let widget = SpiPlottersChart {
            actual: &actual,
            forecast: &forecast,
            x_bounds,
            y_bounds,
            x_label: "Time Step (Month)",
            y_label: "SPI Score",
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, plot_area, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let state = self.orchestrator.state();
        let forecast_label = if state.is_in_flight() {
            "Forecasting...".to_string()
        } else {
            state.label().to_string()
        };

        let items = vec![
            ListItem::new(format!("Country: {}", self.country)),
            ListItem::new(format!("Year: {}", self.year)),
            ListItem::new(format!("Forecast: {forecast_label}")),
            ListItem::new(format!("Service: {}", self.endpoint)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut list_state = ratatui::widgets::ListState::default();
        list_state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter run ML forecast  c cancel  q quit";
        let status_color = if self.orchestrator.state().error().is_some() {
            Color::Red
        } else {
            Color::Yellow
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(status_color)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn legend(timeline: &TimelineSeries) -> Line<'static> {
    let (ar, ag, ab) = ACTUAL_RGB;
    let mut spans = vec![Span::styled("── Actual SPI", Style::default().fg(Color::Rgb(ar, ag, ab)))];
    if timeline.forecast.is_some() {
        let (fr, fg, fb) = FORECAST_RGB;
        spans.push(Span::raw("   "));
        spans.push(Span::styled("── Forecast SPI", Style::default().fg(Color::Rgb(fr, fg, fb))));
    }
    Line::from(spans).alignment(Alignment::Center)
}

/// Next/previous selectable year (wraps around).
fn step_year(year: u16, delta: i32) -> u16 {
    let n = YEAR_OPTIONS.len();
    let idx = YEAR_OPTIONS.iter().position(|&y| y == year).unwrap_or(0);
    let next = if delta >= 0 { (idx + 1) % n } else { (idx + n - 1) % n };
    YEAR_OPTIONS[next]
}

/// X spans the labelled steps; Y is the suggested SPI axis, widened to fit the data.
fn chart_bounds(timeline: &TimelineSeries) -> ([f64; 2], [f64; 2]) {
    let x_bounds = [1.0, (timeline.last_step().max(2)) as f64];

    let [mut y_min, mut y_max] = SPI_AXIS;
    let values = timeline.actual.iter().chain(timeline.forecast.iter().flatten());
    for &y in values.filter(|y| y.is_finite()) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    (x_bounds, [y_min, y_max])
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 6,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let style = Style::default().fg(Color::Gray);

    // One tick per time step.
    let steps = (x_bounds[1] - x_bounds[0]).round() as usize;
    for i in 0..=steps {
        let u = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{}", x_bounds[0] as usize + i);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let y_ticks = 5usize;
    for i in 0..y_ticks {
        let u = i as f64 / (y_ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{:.0}", y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("Time Step (Month)")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("SPI")
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc;

    use super::*;
    use crate::domain::{DebtPolicy, ForecastResult, SnapshotBatch};
    use crate::report::reconcile;

    /// Holds every call until the test releases it.
    struct GatedClient {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl ForecastClient for GatedClient {
        fn predict(&self, _batch: &SnapshotBatch) -> Result<ForecastResult, ForecastError> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(ForecastResult::new(vec![60.0; 6]))
        }
    }

    fn app() -> (App<GatedClient>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let client = GatedClient { gate: Mutex::new(rx) };
        let args = RunArgs {
            country: "Finland".to_string(),
            year: 2024,
            api_url: None,
            timeout_secs: None,
            debt_policy: DebtPolicy::PassThrough,
        };
        let app = App::new(&args, ForecastOrchestrator::new(client), "http://test/predict".to_string()).unwrap();
        (app, tx)
    }

    #[test]
    fn enter_starts_forecast_and_repeat_is_rejected() {
        let (mut app, gate) = app();
        assert!(!app.handle_key(KeyCode::Enter));
        assert_eq!(app.status, "Forecasting...");
        assert!(app.orchestrator.is_in_flight());

        app.handle_key(KeyCode::Char('f'));
        assert_eq!(app.status, "A forecast is already running.");

        gate.send(()).unwrap();
        assert!(matches!(app.orchestrator.wait(), RequestState::Succeeded(_)));
        app.on_settled();
        assert_eq!(app.status, "Forecast ready for Finland (2024).");
    }

    #[test]
    fn changing_country_mid_flight_discards_pending_forecast() {
        let (mut app, gate) = app();
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Right);

        assert_eq!(app.country, "Germany");
        assert!(!app.orchestrator.is_in_flight());
        assert!(app.status.contains("discarded"));

        gate.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!app.orchestrator.poll());
        assert_eq!(app.orchestrator.state(), &RequestState::Idle);
    }

    #[test]
    fn year_selector_does_not_cancel() {
        let (mut app, gate) = app();
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Right);

        assert_eq!(app.year, 2025);
        assert!(app.orchestrator.is_in_flight());
        gate.send(()).unwrap();
        app.orchestrator.wait();
    }

    #[test]
    fn quit_keys() {
        let (mut app, _gate) = app();
        assert!(app.handle_key(KeyCode::Char('q')));
        assert!(app.handle_key(KeyCode::Esc));
    }

    #[test]
    fn year_stepping_wraps() {
        assert_eq!(step_year(2025, 1), 2020);
        assert_eq!(step_year(2020, -1), 2025);
        assert_eq!(step_year(2022, 1), 2023);
    }

    #[test]
    fn chart_bounds_follow_timeline() {
        let idle = reconcile(&crate::domain::ACTUAL_SPI, &RequestState::Idle);
        assert_eq!(chart_bounds(&idle), ([1.0, 6.0], [0.0, 100.0]));

        let state = RequestState::Succeeded(ForecastResult::new(vec![50.0, 80.0, 110.0, 90.0, 70.0, 60.0]));
        let forecast = reconcile(&crate::domain::ACTUAL_SPI, &state);
        assert_eq!(chart_bounds(&forecast), ([1.0, 12.0], [0.0, 110.0]));
    }
}
