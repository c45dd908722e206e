//! ASCII plotting of an SPI timeline for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - actual SPI: `o` points joined by `-`
//! - forecast SPI: `x` points joined by `.`

use crate::domain::TimelineSeries;

/// Suggested SPI axis range; widened when data falls outside it.
const SPI_AXIS: (f64, f64) = (0.0, 100.0);

/// Render the timeline into a `width` x `height` character grid.
pub fn render_ascii_plot(series: &TimelineSeries, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let actual = series.actual_points();
    let forecast = series.forecast_points();

    let t_min = 1.0;
    let t_max = (series.last_step().max(2)) as f64;
    let (y_min, y_max) = y_range(actual.iter().chain(forecast.iter()).map(|&(_, y)| y));

    let mut grid = vec![vec![' '; width]; height];
    let frame = Frame {
        t_min,
        t_max,
        y_min,
        y_max,
        width,
        height,
    };

    // Lines first so the markers overlay them.
    draw_series_line(&mut grid, &actual, &frame, '-');
    draw_series_line(&mut grid, &forecast, &frame, '.');
    draw_markers(&mut grid, &actual, &frame, 'o');
    draw_markers(&mut grid, &forecast, &frame, 'x');

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: step=[{}, {}] | SPI=[{y_min:.2}, {y_max:.2}]\n",
        t_min as usize, t_max as usize
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    if forecast.is_empty() {
        out.push_str("o actual\n");
    } else {
        out.push_str("o actual  x forecast\n");
    }
    out
}

struct Frame {
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn map(&self, t: f64, y: f64) -> (usize, usize) {
        (
            map_x(t, self.t_min, self.t_max, self.width),
            map_y(y, self.y_min, self.y_max, self.height),
        )
    }
}

fn y_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut min_y, mut max_y) = SPI_AXIS;
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    (min_y, max_y)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series_line(grid: &mut [Vec<char>], points: &[(f64, f64)], frame: &Frame, ch: char) {
    let mut prev = None;
    for &(t, y) in points {
        let (x, yy) = frame.map(t, y);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, ch);
        }
        prev = Some((x, yy));
    }
}

fn draw_markers(grid: &mut [Vec<char>], points: &[(f64, f64)], frame: &Frame, ch: char) {
    for &(t, y) in points {
        let (x, yy) = frame.map(t, y);
        grid[yy][x] = ch;
    }
}

/// Integer line drawing (Bresenham-ish). Only paints empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
