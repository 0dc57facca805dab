//! Run store: resolution -> per-compositor collections of runs.

use crate::model::series::{self, Quantity, Series};
use crate::model::{Compositor, Resolution, RunRecord};
use std::collections::BTreeMap;

/// All runs recorded at one resolution, split by compositor.
///
/// Runs are appended in ingest order; [`ScalingSeries::sort`] orders them by
/// node count once every file has been read. Repeated node counts are kept.
#[derive(Debug, Clone)]
pub struct ScalingSeries {
    pub resolution: Resolution,
    pub icet: Vec<RunRecord>,
    pub dfb: Vec<RunRecord>,
}

impl ScalingSeries {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            icet: Vec::new(),
            dfb: Vec::new(),
        }
    }

    pub fn add_run(&mut self, run: RunRecord) {
        self.runs_mut(run.identity.compositor).push(run);
    }

    pub fn runs(&self, compositor: Compositor) -> &[RunRecord] {
        match compositor {
            Compositor::IceT => &self.icet,
            Compositor::Dfb => &self.dfb,
        }
    }

    pub fn runs_mut(&mut self, compositor: Compositor) -> &mut Vec<RunRecord> {
        match compositor {
            Compositor::IceT => &mut self.icet,
            Compositor::Dfb => &mut self.dfb,
        }
    }

    /// Stable sort by node count, so repeated runs keep their ingest order.
    pub fn sort(&mut self) {
        self.icet.sort_by_key(|r| r.identity.node_count);
        self.dfb.sort_by_key(|r| r.identity.node_count);
    }

    pub fn len(&self) -> usize {
        self.icet.len() + self.dfb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identifies the run a per-rank sub-log belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ParentKey<'a> {
    pub compositor: Compositor,
    pub node_count: u32,
    pub resolution: Option<Resolution>,
    /// Stem of the rank file with its rank token removed.
    pub stem: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct RunStore {
    series: BTreeMap<Resolution, ScalingSeries>,
    /// Runs kept without a resolution (their config line was missing).
    unresolved: Vec<RunRecord>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, run: RunRecord) {
        match run.identity.resolution {
            Some(res) => self
                .series
                .entry(res)
                .or_insert_with(|| ScalingSeries::new(res))
                .add_run(run),
            None => self.unresolved.push(run),
        }
    }

    pub fn get(&self, resolution: Resolution) -> Option<&ScalingSeries> {
        self.series.get(&resolution)
    }

    /// Resolutions in ascending order.
    pub fn resolutions(&self) -> impl Iterator<Item = Resolution> + '_ {
        self.series.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScalingSeries> {
        self.series.values()
    }

    pub fn unresolved(&self) -> &[RunRecord] {
        &self.unresolved
    }

    pub fn run_count(&self) -> usize {
        self.series.values().map(ScalingSeries::len).sum::<usize>() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.run_count() == 0
    }

    pub fn finalize(&mut self) {
        for s in self.series.values_mut() {
            s.sort();
        }
        self.unresolved.sort_by_key(|r| r.identity.node_count);
    }

    /// Drop runs on fewer than `min_nodes` nodes, and any resolution left empty.
    pub fn retain_min_nodes(&mut self, min_nodes: u32) {
        for s in self.series.values_mut() {
            s.icet.retain(|r| r.identity.node_count >= min_nodes);
            s.dfb.retain(|r| r.identity.node_count >= min_nodes);
        }
        self.series.retain(|_, s| !s.is_empty());
        self.unresolved
            .retain(|r| r.identity.node_count >= min_nodes);
    }

    /// Find the run a rank sub-log belongs to.
    ///
    /// Among runs with the same compositor and node count (and resolution,
    /// when the rank file encodes one) the run whose own file stem equals
    /// `key.stem` wins; otherwise the first candidate is used.
    pub fn find_parent_mut(&mut self, key: &ParentKey<'_>) -> Option<&mut RunRecord> {
        let mut candidates: Vec<&mut RunRecord> = Vec::new();
        for (res, s) in self.series.iter_mut() {
            if key.resolution.is_some_and(|r| r != *res) {
                continue;
            }
            candidates.extend(
                s.runs_mut(key.compositor)
                    .iter_mut()
                    .filter(|r| r.identity.node_count == key.node_count),
            );
        }
        if key.resolution.is_none() {
            candidates.extend(self.unresolved.iter_mut().filter(|r| {
                r.identity.compositor == key.compositor && r.identity.node_count == key.node_count
            }));
        }

        let idx = candidates
            .iter()
            .position(|r| r.stem() == Some(key.stem))
            .unwrap_or(0);
        candidates.into_iter().nth(idx)
    }

    /// Coordinates of `quantity` for one (resolution, compositor) group.
    /// Unknown resolutions yield an empty series.
    pub fn get_series(
        &self,
        resolution: Resolution,
        compositor: Compositor,
        quantity: &Quantity,
    ) -> Series {
        match self.series.get(&resolution) {
            Some(s) => series::build_series(s.runs(compositor), quantity),
            None => Series::default(),
        }
    }
}
