use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

mod error;
mod log;
mod logging;
mod model;
mod render;
mod spec;

use model::{PlotRequest, PlotVar, RankMetric, RunStore, Stat};
use render::Chart;
use spec::{BuiltinVariant, RankSet, UnmatchedPolicy};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "scaling-plot")]
#[command(about = "Compare IceT and DFB compositing scaling from benchmark logs", long_about = None)]
struct Cli {
    /// Debug-level diagnostics (when RUST_LOG is unset).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Log files, or directories scanned for *.txt.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Built-in log variant.
    #[arg(long, value_enum, default_value_t = BuiltinVariant::Frames)]
    variant: BuiltinVariant,

    /// JSON variant spec to use instead of the built-in one.
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Override the variant's handling of unrecognized file names.
    #[arg(long, value_enum)]
    on_unmatched: Option<UnmatchedPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chart one variable against node count.
    Plot {
        var: PlotVar,

        title: String,

        #[command(flatten)]
        input: InputArgs,

        /// Output image (.png, .svg; .pdf is written as serif SVG).
        /// Without it the chart data is printed.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Draw error bars.
        #[arg(long)]
        yerr: bool,

        /// Statistic over per-frame distributions.
        #[arg(long, value_enum, default_value_t = Stat::Mean)]
        stat: Stat,

        /// Ignore runs on fewer nodes.
        #[arg(long)]
        min_nodes: Option<u32>,

        /// Rank subset for `rank`, e.g. "0-3 7". All ranks when omitted.
        #[arg(long)]
        ranks: Option<String>,

        /// Per-rank metric for `rank`.
        #[arg(long, value_enum, default_value_t = RankMetric::Total)]
        rank_var: RankMetric,

        /// Hide the selected variable (useful with --breakdown).
        #[arg(long)]
        no_overall: bool,

        /// Overlay the compositing overhead.
        #[arg(long)]
        breakdown: bool,
    },
    /// Print what was extracted from the logs.
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Write every extracted run as JSON.
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file; stdout when omitted.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },
}

fn load(input: &InputArgs) -> Result<(RunStore, log::IngestReport)> {
    let variant = spec::load_variant(input.variant, input.patterns.as_deref())?;
    let policy = input.on_unmatched.unwrap_or(variant.on_unmatched);
    let (store, report) = log::ingest_paths(&variant, &input.inputs, policy)?;
    if store.is_empty() {
        warn!("no runs were ingested");
    } else {
        debug!("{} runs in store", store.run_count());
    }
    Ok((store, report))
}

fn y_desc(var: PlotVar, rank_var: RankMetric) -> &'static str {
    match var {
        PlotVar::Rank => match rank_var {
            RankMetric::Cpu => "CPU (%)",
            RankMetric::Rss | RankMetric::Vsz => "Memory (MB)",
            _ => "Time (ms)",
        },
        PlotVar::Total => "Frame time (ms)",
        PlotVar::Compositing => "Compositing overhead (ms)",
        _ => "Time (ms)",
    }
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text)?;
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.cmd {
        Commands::Plot {
            var,
            title,
            input,
            out,
            yerr,
            stat,
            min_nodes,
            ranks,
            rank_var,
            no_overall,
            breakdown,
        } => {
            let ranks: RankSet = match ranks {
                Some(s) => s.parse()?,
                None => RankSet::all(),
            };
            let (mut store, _report) = load(&input)?;
            if let Some(n) = min_nodes {
                store.retain_min_nodes(n);
            }

            let req = PlotRequest {
                var,
                stat,
                overall: !no_overall,
                breakdown,
                rank_metric: rank_var,
                ranks,
            };
            let series = model::plot_series(&store, &req);
            if series.is_empty() {
                anyhow::bail!("nothing to plot: no run has a finite value for the selected variable");
            }

            let chart = Chart {
                title: &title,
                y_desc: y_desc(var, rank_var),
                series: &series,
                show_error: yerr,
            };
            render::render(&chart, out.as_deref())?;
        }
        Commands::Summary { input } => {
            let (store, report) = load(&input)?;
            let mut stdout = std::io::stdout().lock();
            render::table::write_summary(&mut stdout, &store, &report)?;
        }
        Commands::Export { input, out } => {
            let (store, _report) = load(&input)?;
            let json = render::render_json_export(&store)?;
            write_output(out.as_deref(), &json)?;
        }
    }

    Ok(())
}
