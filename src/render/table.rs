//! Plain-text output on stdout: chart data when no output file is given, and
//! the ingest summary.

use crate::log::IngestReport;
use crate::model::{Compositor, RunStore};
use crate::render::Chart;
use itertools::Itertools;
use std::io::{self, Write};

fn cell(v: f64) -> String {
    if v.is_finite() {
        format!("{:.3}", v)
    } else {
        "-".to_string()
    }
}

/// One block per series: a `# label` header, then `nodes value [error]` rows.
pub fn write_series<W: Write>(w: &mut W, chart: &Chart<'_>) -> io::Result<()> {
    writeln!(w, "{} ({})", chart.title, chart.y_desc)?;
    for s in chart.series {
        writeln!(w)?;
        writeln!(w, "# {}", s.label)?;
        for (x, y, e) in s.points() {
            if chart.show_error {
                writeln!(w, "{:>8} {:>12} {:>12}", x, cell(y), cell(e))?;
            } else {
                writeln!(w, "{:>8} {:>12}", x, cell(y))?;
            }
        }
    }
    Ok(())
}

/// Runs per (resolution, compositor) with the node counts seen, then the
/// unresolved runs, then the ingest counters.
pub fn write_summary<W: Write>(
    w: &mut W,
    store: &RunStore,
    report: &IngestReport,
) -> io::Result<()> {
    writeln!(w, "{:<12} {:<6} {:>5}  nodes", "resolution", "comp", "runs")?;
    for s in store.iter() {
        for c in Compositor::ALL {
            let runs = s.runs(c);
            if runs.is_empty() {
                continue;
            }
            let nodes = runs
                .iter()
                .chunk_by(|r| r.identity.node_count)
                .into_iter()
                .map(|(n, group)| match group.count() {
                    1 => n.to_string(),
                    k => format!("{}x{}", n, k),
                })
                .join(" ");
            writeln!(
                w,
                "{:<12} {:<6} {:>5}  {}",
                s.resolution.to_string(),
                c.label(),
                runs.len(),
                nodes
            )?;
        }
    }

    if !store.unresolved().is_empty() {
        writeln!(w)?;
        writeln!(w, "without resolution:")?;
        for run in store.unresolved() {
            writeln!(
                w,
                "  {} {}n {}",
                run.identity.compositor.label(),
                run.identity.node_count,
                run.source().display()
            )?;
        }
    }

    writeln!(w)?;
    writeln!(
        w,
        "files {}, runs {}, rank logs {}, unmatched {}, orphaned rank logs {}, missing config {}, no matches {}",
        report.files,
        report.runs,
        report.rank_files,
        report.unmatched,
        report.orphaned_ranks,
        report.missing_config,
        report.empty_runs
    )?;
    Ok(())
}
