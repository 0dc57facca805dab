use crate::model::{MetricKind, RankMetric, RunIdentity, RunMetric, Stat};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Ordered observations of one metric from a single execution.
///
/// Every statistic of an empty distribution is NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    samples: Vec<f64>,
}

impl Distribution {
    pub fn push(&mut self, value: f64) {
        self.samples.push(value);
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.samples.iter().copied().fold(f64::NAN, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(f64::NAN, f64::max)
    }

    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Middle value; the average of the two middle values for even counts.
    pub fn median(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        let mean = self.mean();
        if mean.is_nan() {
            return f64::NAN;
        }
        let var = self
            .samples
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / self.samples.len() as f64;
        var.sqrt()
    }

    pub fn stat(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Min => self.min(),
            Stat::Max => self.max(),
            Stat::Mean => self.mean(),
            Stat::Median => self.median(),
            Stat::StdDev => self.std_dev(),
        }
    }
}

impl FromIterator<f64> for Distribution {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

/// Per-rank measurements attached to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RankRecord {
    pub rank: u32,
    /// The rank sub-log this record was read from, when it had its own file.
    pub source: Option<PathBuf>,
    metrics: BTreeMap<RankMetric, Distribution>,
}

impl RankRecord {
    pub fn new(rank: u32) -> Self {
        Self {
            rank,
            source: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, metric: RankMetric, value: f64) {
        self.metrics.entry(metric).or_default().push(value);
    }

    pub fn distribution(&self, metric: RankMetric) -> Option<&Distribution> {
        self.metrics.get(&metric)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (RankMetric, &Distribution)> {
        self.metrics.iter().map(|(m, d)| (*m, d))
    }

    pub fn value(&self, metric: RankMetric, stat: Stat) -> f64 {
        self.distribution(metric)
            .map(|d| d.stat(stat))
            .unwrap_or(f64::NAN)
    }
}

/// Everything extracted for one benchmark execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub identity: RunIdentity,
    pub source: PathBuf,
    scalars: BTreeMap<RunMetric, f64>,
    distributions: BTreeMap<RunMetric, Distribution>,
    ranks: BTreeMap<u32, RankRecord>,
}

impl RunRecord {
    pub fn new(identity: RunIdentity, source: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            source: source.into(),
            scalars: BTreeMap::new(),
            distributions: BTreeMap::new(),
            ranks: BTreeMap::new(),
        }
    }

    /// Record one observation. Scalars keep their first value.
    pub fn record(&mut self, metric: RunMetric, value: f64) {
        match metric.kind() {
            MetricKind::Scalar => {
                self.scalars.entry(metric).or_insert(value);
            }
            MetricKind::Distribution => {
                self.distributions.entry(metric).or_default().push(value);
            }
        }
    }

    pub fn scalar(&self, metric: RunMetric) -> Option<f64> {
        self.scalars.get(&metric).copied()
    }

    pub fn distribution(&self, metric: RunMetric) -> Option<&Distribution> {
        self.distributions.get(&metric)
    }

    pub fn scalars(&self) -> impl Iterator<Item = (RunMetric, f64)> + '_ {
        self.scalars.iter().map(|(m, v)| (*m, *v))
    }

    pub fn distributions(&self) -> impl Iterator<Item = (RunMetric, &Distribution)> {
        self.distributions.iter().map(|(m, d)| (*m, d))
    }

    /// Value of `metric` for this run: the scalar itself, or `stat` over the
    /// distribution. NaN when nothing was observed.
    pub fn value(&self, metric: RunMetric, stat: Stat) -> f64 {
        match metric.kind() {
            MetricKind::Scalar => self.scalar(metric).unwrap_or(f64::NAN),
            MetricKind::Distribution => self
                .distribution(metric)
                .map(|d| d.stat(stat))
                .unwrap_or(f64::NAN),
        }
    }

    /// Spread of `metric`: the std-dev of a distribution, or the paired
    /// spread scalar (std dev for mean, MAD for median). NaN otherwise.
    pub fn spread(&self, metric: RunMetric) -> f64 {
        match metric.kind() {
            MetricKind::Scalar => metric
                .spread()
                .and_then(|s| self.scalar(s))
                .unwrap_or(f64::NAN),
            MetricKind::Distribution => self
                .distribution(metric)
                .map(Distribution::std_dev)
                .unwrap_or(f64::NAN),
        }
    }

    pub fn rank(&self, rank: u32) -> Option<&RankRecord> {
        self.ranks.get(&rank)
    }

    pub fn rank_mut(&mut self, rank: u32) -> &mut RankRecord {
        self.ranks
            .entry(rank)
            .or_insert_with(|| RankRecord::new(rank))
    }

    pub fn ranks(&self) -> impl Iterator<Item = &RankRecord> {
        self.ranks.values()
    }

    /// Total number of observations, ranks included.
    pub fn observation_count(&self) -> usize {
        self.scalars.len()
            + self.distributions.values().map(Distribution::len).sum::<usize>()
            + self
                .ranks
                .values()
                .flat_map(|r| r.metrics.values())
                .map(Distribution::len)
                .sum::<usize>()
    }

    /// File stem of the log this run was read from.
    pub fn stem(&self) -> Option<&str> {
        self.source.file_stem().and_then(|s| s.to_str())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}
