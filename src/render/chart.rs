//! Line / error-bar charts over node count (log2 x axis, linear y axis).

use crate::Result;
use crate::model::Series;
use crate::render::Chart;
use anyhow::bail;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::ops::Range;
use std::path::Path;

const RASTER_SIZE: (u32, u32) = (1200, 900);
const VECTOR_SIZE: (u32, u32) = (800, 600);

const TITLE_FONT_SIZE: u32 = 28;
const AXIS_LABEL_FONT_SIZE: u32 = 20;
const TICK_LABEL_FONT_SIZE: u32 = 16;
const LEGEND_FONT_SIZE: u32 = 16;
const STROKE_WIDTH: u32 = 2;

pub fn draw_png(chart: &Chart<'_>, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let root = BitMapBackend::new(path, RASTER_SIZE).into_drawing_area();
    draw(chart, &root, "sans-serif")?;
    root.present()?;
    Ok(())
}

/// `typeset` switches to serif fonts.
pub fn draw_svg(chart: &Chart<'_>, path: &Path, typeset: bool) -> Result<()> {
    ensure_parent(path)?;
    let root = SVGBackend::new(path, VECTOR_SIZE).into_drawing_area();
    let font = if typeset { "serif" } else { "sans-serif" };
    draw(chart, &root, font)?;
    root.present()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Axis extents: x padded by a quarter octave-ish on both sides so the end
/// points are not on the frame, y from zero to the tallest point (or error
/// bar) plus 10%.
fn bounds(series: &[Series], show_error: bool) -> Option<(Range<f64>, f64)> {
    let xs = series.iter().flat_map(|s| s.x.iter().copied());
    let x_min = xs.clone().min()?;
    let x_max = xs.max()?;

    let y_max = series
        .iter()
        .flat_map(|s| s.points())
        .map(|(_, y, e)| if show_error && e.is_finite() { y + e } else { y })
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    Some(((x_min as f64 / 1.25)..(x_max as f64 * 1.25), y_max))
}

fn draw<DB: DrawingBackend>(
    chart: &Chart<'_>,
    root: &DrawingArea<DB, Shift>,
    font: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let Some((x_range, y_max)) = bounds(chart.series, chart.show_error) else {
        bail!("nothing to plot: no series has a finite point");
    };

    root.fill(&WHITE)?;
    let mut cc = ChartBuilder::on(root)
        .caption(chart.title, (font, TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range.log_scale().base(2.0), 0f64..y_max)?;

    cc.configure_mesh()
        .disable_x_mesh()
        .x_desc("Nodes")
        .y_desc(chart.y_desc)
        .x_label_formatter(&|x| format!("{:.0}", x))
        .label_style((font, TICK_LABEL_FONT_SIZE))
        .axis_desc_style((font, AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for (i, s) in chart.series.iter().enumerate() {
        let color = Palette99::pick(i).mix(1.0);
        let points: Vec<(f64, f64)> = s.points().map(|(x, y, _)| (x as f64, y)).collect();

        cc.draw_series(LineSeries::new(points.clone(), color.stroke_width(STROKE_WIDTH)))?
            .label(s.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(STROKE_WIDTH))
            });
        cc.draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;

        if chart.show_error {
            cc.draw_series(
                s.points()
                    .filter(|(_, _, e)| e.is_finite() && *e > 0.0)
                    .map(|(x, y, e)| {
                        ErrorBar::new_vertical(x as f64, y - e, y, y + e, color.filled(), 8)
                    }),
            )?;
        }
    }

    cc.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((font, LEGEND_FONT_SIZE))
        .draw()?;

    Ok(())
}
