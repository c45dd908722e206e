//! Plotters-powered SPI timeline chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Actual series color (blue).
pub const ACTUAL_RGB: (u8, u8, u8) = (59, 130, 246);
/// Forecast series color (violet).
pub const FORECAST_RGB: (u8, u8, u8) = (139, 92, 246);

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call so `render()`
/// only draws.
pub struct SpiPlottersChart<'a> {
    /// Actual SPI as `(step, value)`.
    pub actual: &'a [(f64, f64)],
    /// Forecast SPI as `(step, value)`; empty when no forecast is available.
    pub forecast: &'a [(f64, f64)],
    /// X bounds (time step).
    pub x_bounds: [f64; 2],
    /// Y bounds (SPI score).
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
}

impl<'a> Widget for SpiPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(((x1 - x0) as usize + 1).min(12))
                .y_labels(5)
                .x_label_formatter(&|v| format!("{v:.0}"))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let actual_color = RGBColor(ACTUAL_RGB.0, ACTUAL_RGB.1, ACTUAL_RGB.2);
            let forecast_color = RGBColor(FORECAST_RGB.0, FORECAST_RGB.1, FORECAST_RGB.2);

            chart.draw_series(LineSeries::new(self.actual.iter().copied(), &actual_color))?;
            chart.draw_series(
                self.actual
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), WHITE)),
            )?;

            if !self.forecast.is_empty() {
                chart.draw_series(LineSeries::new(self.forecast.iter().copied(), &forecast_color))?;
                // Single-cell markers: the ratatui backend scales `Circle` radii badly.
                chart.draw_series(
                    self.forecast
                        .iter()
                        .map(|&(x, y)| Pixel::new((x, y), WHITE)),
                )?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
