//! Output: charts (plotters), text tables, and JSON export.

pub mod chart;
pub mod json;
pub mod table;

pub use json::render_json_export;

use crate::Result;
use crate::model::Series;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A chart ready to draw.
#[derive(Debug, Clone)]
pub struct Chart<'a> {
    pub title: &'a str,
    pub y_desc: &'a str,
    pub series: &'a [Series],
    /// Draw error bars from each series' `yerr`.
    pub show_error: bool,
}

/// Where a chart goes, decided by the output path's extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// No output file: print the series on stdout.
    Display,
    /// `.png`
    Raster(PathBuf),
    /// Anything else, written as SVG. `typeset` asks for serif fonts, as for
    /// a `.pdf` destined for a paper.
    Vector { path: PathBuf, typeset: bool },
}

impl Destination {
    pub fn from_output(out: Option<&Path>) -> Self {
        let Some(path) = out else {
            return Destination::Display;
        };
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Destination::Raster(path.to_path_buf()),
            "svg" => Destination::Vector {
                path: path.to_path_buf(),
                typeset: false,
            },
            other => Destination::Vector {
                path: path.with_extension("svg"),
                typeset: other == "pdf",
            },
        }
    }
}

/// Draw `chart` to the destination picked by `out`.
pub fn render(chart: &Chart<'_>, out: Option<&Path>) -> Result<()> {
    let dest = Destination::from_output(out);
    match &dest {
        Destination::Display => {
            let stdout = io::stdout();
            let mut w = stdout.lock();
            table::write_series(&mut w, chart)?;
            w.flush()?;
            return Ok(());
        }
        Destination::Raster(path) => chart::draw_png(chart, path)?,
        Destination::Vector { path, typeset } => {
            if let Some(requested) = out
                && requested != path.as_path()
            {
                warn!(
                    "vector output is written as SVG: {} -> {}",
                    requested.display(),
                    path.display()
                );
            }
            chart::draw_svg(chart, path, *typeset)?
        }
    }
    if let Destination::Raster(path) | Destination::Vector { path, .. } = &dest {
        info!("saved to {}", path.display());
    }
    Ok(())
}
