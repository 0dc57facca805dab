//! Built-in variants, one per benchmark log layout we have seen.

use crate::model::{RankMetric, RunMetric};
use crate::spec::variant::{
    ProbeSpec, ProbeTarget, ResolutionSource, UnmatchedPolicy, VariantSpec,
};

/// A number as printed by the benchmark drivers.
const NUM: &str = r"([0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?)";

/// `[<prefix>-|_]bench-<compositor>-<N>n-<tag>-<k>.txt`
const DASHED_NAME: &str = r"^(?:.*[-_])?bench-(?P<compositor>\w+)-(?P<nodes>\d+)n-(?P<tag>[^0-9]+)-(?P<trial>\d+)\.txt$";

/// `bench_<compositor>_<N>n_<W>x<H>-...txt`
const UNDERSCORED_NAME: &str = r"^bench_(?P<compositor>[A-Za-z]+)_(?P<nodes>\d+)n_(?P<width>\d+)x(?P<height>\d+)(?:-.*)?\.txt$";

/// `rank<N>` anywhere not inside a word. `token` is what gets stripped to
/// name the parent log: the token plus a `-`, `_` or `.` in front of it.
const RANK_TOKEN: &str = r"(?:^|[^A-Za-z])(?P<token>[-_.]?rank(?P<rank>\d+))";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BuiltinVariant {
    /// Dashed names; resolution from the `Rendering Config:` line.
    Config,
    /// pico_bench statistics blocks.
    Stats,
    /// Per-frame timings.
    #[default]
    Frames,
    /// Per-frame timings plus per-rank sub-logs.
    Ranks,
}

impl BuiltinVariant {
    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Stats => "stats",
            Self::Frames => "frames",
            Self::Ranks => "ranks",
        }
    }

    pub fn spec(self) -> VariantSpec {
        let (filename, resolution, on_unmatched, probes) = match self {
            Self::Config => (
                DASHED_NAME,
                ResolutionSource::ConfigLine,
                UnmatchedPolicy::Fatal,
                [config_probes(), overhead_probes(), frame_probes()].concat(),
            ),
            Self::Stats => (
                UNDERSCORED_NAME,
                ResolutionSource::Filename,
                UnmatchedPolicy::Fatal,
                [stats_probes(), overhead_probes(), local_render_probes()].concat(),
            ),
            Self::Frames => (
                UNDERSCORED_NAME,
                ResolutionSource::Filename,
                UnmatchedPolicy::Skip,
                frames_probes(),
            ),
            Self::Ranks => (
                UNDERSCORED_NAME,
                ResolutionSource::Filename,
                UnmatchedPolicy::Skip,
                [frames_probes(), rank_probes()].concat(),
            ),
        };
        VariantSpec {
            name: self.name().to_string(),
            filename: filename.to_string(),
            rank_pattern: Some(RANK_TOKEN.to_string()),
            resolution,
            on_unmatched,
            probes,
        }
    }
}

fn probe(target: ProbeTarget, pattern: String, group: usize) -> ProbeSpec {
    ProbeSpec {
        target,
        pattern,
        group: Some(group),
        rank_group: None,
        scale: None,
    }
}

fn run(metric: RunMetric, pattern: String, group: usize) -> ProbeSpec {
    probe(ProbeTarget::Run(metric), pattern, group)
}

fn rank(metric: RankMetric, pattern: String) -> ProbeSpec {
    probe(ProbeTarget::Rank(metric), pattern, 1)
}

fn config_probes() -> Vec<ProbeSpec> {
    vec![probe(
        ProbeTarget::RenderConfig,
        r"^Rendering Config: (.*)$".to_string(),
        1,
    )]
}

fn overhead_probes() -> Vec<ProbeSpec> {
    vec![run(
        RunMetric::CompositingOverhead,
        format!(r"(\w+) Compositing Overhead: {}\s*ms", NUM),
        2,
    )]
}

fn frame_probes() -> Vec<ProbeSpec> {
    vec![run(
        RunMetric::FrameTime,
        format!(r"Frame (\d+) took {}\s*ms", NUM),
        2,
    )]
}

fn local_render_probes() -> Vec<ProbeSpec> {
    vec![
        run(
            RunMetric::LocalMaxRender,
            format!(r"Max (?:OSPRay )?render time: {}\s*ms", NUM),
            1,
        ),
        run(
            RunMetric::LocalMinRender,
            format!(r"Min (?:OSPRay )?render time: {}\s*ms", NUM),
            1,
        ),
    ]
}

fn composite_probes() -> Vec<ProbeSpec> {
    vec![run(
        RunMetric::CompositeTime,
        format!(r"(IceT|DFB|OSPRay) [Cc]omposite time: {}\s*ms", NUM),
        2,
    )]
}

/// The statistics block printed after a timed loop:
///
/// ```text
/// Statistics:
///     max: 120ms
///     min: 80ms
///     median: 95ms
///     median abs dev: 3ms
///     mean: 97ms
///     std dev: 5ms
/// ```
fn stats_probes() -> Vec<ProbeSpec> {
    [
        (RunMetric::Max, "max"),
        (RunMetric::Min, "min"),
        (RunMetric::Median, "median"),
        (RunMetric::MedianAbsDev, "median abs dev"),
        (RunMetric::Mean, "mean"),
        (RunMetric::StdDev, "std dev"),
    ]
    .into_iter()
    .map(|(metric, label)| run(metric, format!(r"^\s*{}:\s*{}", label, NUM), 1))
    .collect()
}

fn frames_probes() -> Vec<ProbeSpec> {
    [
        frame_probes(),
        overhead_probes(),
        composite_probes(),
        local_render_probes(),
    ]
    .concat()
}

fn rank_probes() -> Vec<ProbeSpec> {
    let mut probes: Vec<ProbeSpec> = [
        (RankMetric::Rendering, "Rendering"),
        (RankMetric::Compositing, "Compositing"),
        (RankMetric::Total, "Total"),
        (RankMetric::Gather, "Gather"),
        (RankMetric::Waiting, "Waiting"),
    ]
    .into_iter()
    .map(|(metric, label)| rank(metric, format!(r"^\s*{} time: {}\s*ms", label, NUM)))
    .collect();

    probes.push(rank(RankMetric::Cpu, format!(r"^\s*CPU: {}\s*%", NUM)));
    // The main log reports CPU use of every rank as `rank 3, CPU: 97.5%`.
    probes.push(ProbeSpec {
        rank_group: Some(1),
        ..probe(
            ProbeTarget::Rank(RankMetric::Cpu),
            format!(r"rank (\d+), CPU: {}\s*%", NUM),
            2,
        )
    });

    // /proc/self/status reports kB.
    for (metric, kb_label, mb_label) in [
        (RankMetric::Rss, "VmRSS", "RSS"),
        (RankMetric::Vsz, "VmSize", "VSZ"),
    ] {
        probes.push(ProbeSpec {
            scale: Some(0.001),
            ..rank(metric, format!(r"^\s*{}:\s*{}\s*kB", kb_label, NUM))
        });
        probes.push(rank(metric, format!(r"^\s*{}:\s*{}\s*MB", mb_label, NUM)));
    }
    probes
}
