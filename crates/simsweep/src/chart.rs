//! PNG chart rendering with plotters.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use simsweep_core::chart::{ChartRenderer, ChartSpec};
use simsweep_core::error::ChartError;

const COLORS: [&RGBColor; 6] = [&RED, &BLUE, &GREEN, &MAGENTA, &CYAN, &BLACK];

/// Draws charts as bitmap images
#[derive(Debug, Clone, Copy)]
pub struct PlottersRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

fn backend_error(e: impl std::fmt::Display) -> ChartError {
    ChartError::Backend(e.to_string())
}

/// Axis bounds with some room around the data; a degenerate range is widened
fn padded(lo: f64, hi: f64, log: bool) -> (f64, f64) {
    if log {
        if lo == hi { (lo / 2.0, hi * 2.0) } else { (lo / 1.2, hi * 1.2) }
    } else if lo == hi {
        (lo - 1.0, hi + 1.0)
    } else {
        let margin = (hi - lo) * 0.05;
        (lo - margin, hi + margin)
    }
}

// The log and linear x axes are different coordinate types, so the drawing
// code is shared through a macro rather than a generic function.
macro_rules! draw_chart {
    ($root:expr, $spec:expr, $x_range:expr, $y_range:expr) => {{
        let mut chart = ChartBuilder::on(&$root)
            .caption(&$spec.title, ("sans-serif", 22))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d($x_range, $y_range)
            .map_err(backend_error)?;

        chart
            .configure_mesh()
            .x_desc($spec.x_label.as_str())
            .y_desc($spec.y_label.as_str())
            .draw()
            .map_err(backend_error)?;

        for (idx, series) in $spec.series.iter().enumerate() {
            let color = COLORS[idx % COLORS.len()];
            chart
                .draw_series(LineSeries::new(series.points.iter().copied(), color))
                .map_err(backend_error)?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            chart
                .draw_series(
                    series
                        .points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                )
                .map_err(backend_error)?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(backend_error)?;
    }};
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, spec: &ChartSpec, out_dir: &Path) -> Result<PathBuf, ChartError> {
        let (Some((x_lo, x_hi)), Some((y_lo, y_hi))) = (spec.x_range(), spec.y_range()) else {
            return Err(ChartError::Backend(format!("{} has no points", spec.file_name)));
        };
        let path = out_dir.join(&spec.file_name);

        let root = BitMapBackend::new(&path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(backend_error)?;

        let (x_lo, x_hi) = padded(x_lo, x_hi, spec.log_x);
        let (y_lo, y_hi) = padded(y_lo.min(0.0), y_hi, false);

        if spec.log_x {
            draw_chart!(root, spec, (x_lo..x_hi).log_scale(), y_lo..y_hi);
        } else {
            draw_chart!(root, spec, x_lo..x_hi, y_lo..y_hi);
        }

        root.present().map_err(backend_error)?;
        drop(root);
        Ok(path)
    }
}
