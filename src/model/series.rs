//! Series builder: sorted runs -> x/y/error-bar coordinates.

use crate::model::{Compositor, RankMetric, RunMetric, RunRecord, RunStore, Stat};
use crate::spec::RankSet;
use itertools::Itertools;
use std::collections::BTreeSet;

/// What to read from a run to produce one y value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Run {
        metric: RunMetric,
        stat: Stat,
    },
    Rank {
        metric: RankMetric,
        stat: Stat,
        rank: u32,
    },
}

impl Quantity {
    pub fn run(metric: RunMetric, stat: Stat) -> Self {
        Quantity::Run { metric, stat }
    }

    /// (value, spread) of this quantity for `run`; NaN where absent.
    pub fn measure(&self, run: &RunRecord) -> (f64, f64) {
        match *self {
            Quantity::Run { metric, stat } => (run.value(metric, stat), run.spread(metric)),
            Quantity::Rank { metric, stat, rank } => match run.rank(rank) {
                Some(r) => (
                    r.value(metric, stat),
                    r.value(metric, Stat::StdDev),
                ),
                None => (f64::NAN, f64::NAN),
            },
        }
    }
}

/// Plottable variable selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotVar {
    /// Per-frame render time.
    Total,
    /// Compositing overhead.
    Compositing,
    /// Compositor-reported composite time.
    Composite,
    /// Slowest local render per frame.
    RenderMax,
    /// Fastest local render per frame.
    RenderMin,
    Max,
    Min,
    Median,
    /// Median absolute deviation.
    Mad,
    Mean,
    Stddev,
    /// A per-rank metric, see `--rank-var`.
    Rank,
}

impl PlotVar {
    /// The run-level metric behind this variable; `None` for [`PlotVar::Rank`].
    pub fn run_metric(self) -> Option<RunMetric> {
        Some(match self {
            PlotVar::Total => RunMetric::FrameTime,
            PlotVar::Compositing => RunMetric::CompositingOverhead,
            PlotVar::Composite => RunMetric::CompositeTime,
            PlotVar::RenderMax => RunMetric::LocalMaxRender,
            PlotVar::RenderMin => RunMetric::LocalMinRender,
            PlotVar::Max => RunMetric::Max,
            PlotVar::Min => RunMetric::Min,
            PlotVar::Median => RunMetric::Median,
            PlotVar::Mad => RunMetric::MedianAbsDev,
            PlotVar::Mean => RunMetric::Mean,
            PlotVar::Stddev => RunMetric::StdDev,
            PlotVar::Rank => return None,
        })
    }
}

/// One labelled line of a chart. `x`, `y` and `yerr` always have equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub label: String,
    pub x: Vec<u32>,
    pub y: Vec<f64>,
    pub yerr: Vec<f64>,
}

impl Series {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn push(&mut self, x: u32, y: f64, yerr: f64) {
        self.x.push(x);
        self.y.push(y);
        self.yerr.push(yerr);
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (u32, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.yerr)
            .map(|((x, y), e)| (*x, *y, *e))
    }

    /// Drop every point whose y is not finite, keeping x/y/yerr aligned.
    pub fn retain_finite(&mut self) {
        let keep: Vec<bool> = self.y.iter().map(|y| y.is_finite()).collect();
        let mut flags = keep.iter();
        self.x.retain(|_| *flags.next().unwrap_or(&false));
        let mut flags = keep.iter();
        self.y.retain(|_| *flags.next().unwrap_or(&false));
        let mut flags = keep.iter();
        self.yerr.retain(|_| *flags.next().unwrap_or(&false));
    }
}

/// Build the series of `quantity` over `runs`, which must be sorted by node
/// count.
///
/// Runs sharing a node count collapse into one point holding the minimum
/// finite value among them (best case over repeated trials); the spread of
/// the winning run comes along. Points with no finite value are dropped.
pub fn build_series(runs: &[RunRecord], quantity: &Quantity) -> Series {
    let mut out = Series::default();
    for (node_count, group) in &runs.iter().chunk_by(|r| r.identity.node_count) {
        let (y, err) = group
            .map(|r| quantity.measure(r))
            .filter(|(y, _)| y.is_finite())
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .unwrap_or((f64::NAN, f64::NAN));
        out.push(node_count, y, err);
    }
    out.retain_finite();
    out
}

/// Everything needed to pick the chart lines out of a store.
#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub var: PlotVar,
    pub stat: Stat,
    /// Draw the selected variable itself.
    pub overall: bool,
    /// Overlay the compositing overhead of each group.
    pub breakdown: bool,
    pub rank_metric: RankMetric,
    pub ranks: RankSet,
}

/// Collect the labelled, non-empty series for `req`, resolution by
/// resolution, DFB before IceT.
pub fn plot_series(store: &RunStore, req: &PlotRequest) -> Vec<Series> {
    let mut out = Vec::new();
    for res in store.resolutions() {
        for compositor in Compositor::ALL {
            let group = format!("{} {}", compositor.label(), res);

            if req.overall {
                match req.var.run_metric() {
                    Some(metric) => {
                        let q = Quantity::run(metric, req.stat);
                        out.push(store.get_series(res, compositor, &q).with_label(group.clone()));
                    }
                    None => {
                        for rank in rank_numbers(store, res, compositor, &req.ranks) {
                            let q = Quantity::Rank {
                                metric: req.rank_metric,
                                stat: req.stat,
                                rank,
                            };
                            out.push(
                                store
                                    .get_series(res, compositor, &q)
                                    .with_label(format!("{} rank {}", group, rank)),
                            );
                        }
                    }
                }
            }

            if req.breakdown {
                let q = Quantity::run(RunMetric::CompositingOverhead, req.stat);
                out.push(
                    store
                        .get_series(res, compositor, &q)
                        .with_label(format!("{} overhead", group)),
                );
            }
        }
    }
    out.retain(|s| !s.is_empty());
    out
}

/// Rank numbers present in a group, restricted to `ranks`.
fn rank_numbers(
    store: &RunStore,
    res: crate::model::Resolution,
    compositor: Compositor,
    ranks: &RankSet,
) -> BTreeSet<u32> {
    store
        .get(res)
        .map(|s| s.runs(compositor))
        .unwrap_or_default()
        .iter()
        .flat_map(|run| run.ranks().map(|r| r.rank))
        .filter(|r| ranks.contains(*r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resolution, RunIdentity};
    use pretty_assertions::assert_eq;

    const RES: Resolution = Resolution {
        width: 512,
        height: 512,
    };

    fn run(c: Compositor, n: u32, metric: RunMetric, values: &[f64]) -> RunRecord {
        let mut r = RunRecord::new(
            RunIdentity {
                compositor: c,
                node_count: n,
                resolution: Some(RES),
            },
            format!("bench_{}_{}n_512x512.txt", c, n),
        );
        for v in values {
            r.record(metric, *v);
        }
        r
    }

    fn request(var: PlotVar) -> PlotRequest {
        PlotRequest {
            var,
            stat: Stat::Mean,
            overall: true,
            breakdown: false,
            rank_metric: RankMetric::Cpu,
            ranks: RankSet::all(),
        }
    }

    #[test]
    fn retain_finite_keeps_alignment() {
        let mut s = Series::default();
        s.push(1, 5.0, 0.1);
        s.push(2, f64::NAN, 0.2);
        s.push(3, 9.0, 0.3);
        s.retain_finite();
        assert_eq!(s.x, vec![1, 3]);
        assert_eq!(s.y, vec![5.0, 9.0]);
        assert_eq!(s.yerr, vec![0.1, 0.3]);
    }

    #[test]
    fn duplicates_collapse_to_minimum() {
        let runs = vec![
            run(Compositor::IceT, 16, RunMetric::Mean, &[120.0]),
            run(Compositor::IceT, 16, RunMetric::Mean, &[95.0]),
        ];
        let s = build_series(&runs, &Quantity::run(RunMetric::Mean, Stat::Mean));
        assert_eq!(s.x, vec![16]);
        assert_eq!(s.y, vec![95.0]);
    }

    #[test]
    fn minimum_ignores_missing_duplicates() {
        let runs = vec![
            run(Compositor::IceT, 4, RunMetric::Mean, &[]),
            run(Compositor::IceT, 4, RunMetric::Mean, &[40.0]),
            run(Compositor::IceT, 8, RunMetric::Mean, &[]),
        ];
        let s = build_series(&runs, &Quantity::run(RunMetric::Mean, Stat::Mean));
        assert_eq!(s.x, vec![4]);
        assert_eq!(s.y, vec![40.0]);
    }

    #[test]
    fn spread_follows_the_winning_run() {
        let runs = vec![
            run(Compositor::Dfb, 2, RunMetric::FrameTime, &[10.0, 30.0]),
            run(Compositor::Dfb, 2, RunMetric::FrameTime, &[8.0, 8.0]),
        ];
        let s = build_series(&runs, &Quantity::run(RunMetric::FrameTime, Stat::Mean));
        assert_eq!(s.y, vec![8.0]);
        assert_eq!(s.yerr, vec![0.0]);
    }

    #[test]
    fn store_series_end_to_end() {
        let mut store = RunStore::new();
        store.insert(run(Compositor::IceT, 8, RunMetric::Mean, &[80.0]));
        store.insert(run(Compositor::IceT, 4, RunMetric::Mean, &[50.0]));
        store.insert(run(Compositor::IceT, 8, RunMetric::Mean, &[60.0]));
        store.finalize();
        let s = store.get_series(
            RES,
            Compositor::IceT,
            &Quantity::run(RunMetric::Mean, Stat::Mean),
        );
        assert_eq!(s.x, vec![4, 8]);
        assert_eq!(s.y, vec![50.0, 60.0]);
    }

    #[test]
    fn plot_series_labels_and_breakdown() {
        let mut store = RunStore::new();
        let mut a = run(Compositor::IceT, 4, RunMetric::FrameTime, &[100.0]);
        a.record(RunMetric::CompositingOverhead, 30.0);
        let mut b = run(Compositor::IceT, 4, RunMetric::FrameTime, &[90.0]);
        b.record(RunMetric::CompositingOverhead, 35.0);
        store.insert(a);
        store.insert(b);
        store.insert(run(Compositor::Dfb, 4, RunMetric::FrameTime, &[70.0]));
        store.finalize();

        let req = PlotRequest {
            breakdown: true,
            ..request(PlotVar::Total)
        };
        let series = plot_series(&store, &req);
        let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["DFB 512x512", "IceT 512x512", "IceT 512x512 overhead"]
        );
        assert_eq!(series[1].y, vec![90.0]);
        // overhead deduplicates independently of the total
        assert_eq!(series[2].y, vec![30.0]);
    }

    #[test]
    fn rank_series_honour_subset() {
        let mut store = RunStore::new();
        let mut r = run(Compositor::Dfb, 8, RunMetric::FrameTime, &[1.0]);
        for rank in 0..4 {
            r.rank_mut(rank).record(RankMetric::Cpu, 90.0 + rank as f64);
        }
        store.insert(r);
        store.finalize();

        let req = PlotRequest {
            ranks: "1 3".parse().unwrap(),
            ..request(PlotVar::Rank)
        };
        let series = plot_series(&store, &req);
        let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["DFB 512x512 rank 1", "DFB 512x512 rank 3"]);
        assert_eq!(series[1].x, vec![8]);
        assert_eq!(series[1].y, vec![93.0]);
    }

    #[test]
    fn nothing_selected_gives_no_series() {
        let mut store = RunStore::new();
        store.insert(run(Compositor::Dfb, 8, RunMetric::Mean, &[1.0]));
        let req = PlotRequest {
            overall: false,
            ..request(PlotVar::Mean)
        };
        assert!(plot_series(&store, &req).is_empty());
    }
}
