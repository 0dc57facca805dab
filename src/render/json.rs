use crate::Result;
use crate::model::{Compositor, Distribution, RankMetric, RankRecord, RunMetric, RunRecord, RunStore};
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary statistics of one distribution. Non-finite values serialize as
/// `null`.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionView {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub samples: Vec<f64>,
}

impl From<&Distribution> for DistributionView {
    fn from(d: &Distribution) -> Self {
        Self {
            count: d.len(),
            min: d.min(),
            max: d.max(),
            mean: d.mean(),
            median: d.median(),
            std_dev: d.std_dev(),
            samples: d.samples().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankView {
    pub rank: u32,
    pub source: Option<String>,
    pub metrics: BTreeMap<RankMetric, DistributionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    pub compositor: Compositor,
    pub nodes: u32,
    /// `WxH`, or `None` for runs whose resolution was never found.
    pub resolution: Option<String>,
    pub source: String,
    pub scalars: BTreeMap<RunMetric, f64>,
    pub distributions: BTreeMap<RunMetric, DistributionView>,
    pub ranks: Vec<RankView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportData {
    pub resolutions: Vec<String>,
    pub runs: Vec<RunView>,
    pub unresolved: Vec<RunView>,
}

fn rank_view(r: &RankRecord) -> RankView {
    RankView {
        rank: r.rank,
        source: r.source.as_ref().map(|p| p.display().to_string()),
        metrics: r.metrics().map(|(m, d)| (m, d.into())).collect(),
    }
}

fn run_view(run: &RunRecord) -> RunView {
    RunView {
        compositor: run.identity.compositor,
        nodes: run.identity.node_count,
        resolution: run.identity.resolution.map(|r| r.to_string()),
        source: run.source().display().to_string(),
        scalars: run.scalars().collect(),
        distributions: run.distributions().map(|(m, d)| (m, d.into())).collect(),
        ranks: run.ranks().map(rank_view).collect(),
    }
}

/// Every ingested run as pretty-printed JSON, resolved runs in store order
/// (resolution, then compositor, then node count) followed by the unresolved
/// ones.
pub fn render_json_export(store: &RunStore) -> Result<String> {
    let data = ExportData {
        resolutions: store.resolutions().map(|r| r.to_string()).collect(),
        runs: store
            .iter()
            .flat_map(|s| Compositor::ALL.into_iter().flat_map(move |c| s.runs(c)))
            .map(run_view)
            .collect(),
        unresolved: store.unresolved().iter().map(run_view).collect(),
    };
    Ok(serde_json::to_string_pretty(&data)?)
}
