//! Aggregation model: run identities, metric vocabularies, and the records
//! extracted from benchmark logs.

pub mod record;
pub mod series;
pub mod store;

pub use record::{Distribution, RankRecord, RunRecord};
pub use series::{PlotRequest, PlotVar, Series, plot_series};
pub use store::RunStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two compositing strategies being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compositor {
    /// OSPRay's distributed framebuffer.
    Dfb,
    IceT,
}

impl Compositor {
    pub const ALL: [Compositor; 2] = [Compositor::Dfb, Compositor::IceT];

    /// Resolve the compositor token used in log file names.
    ///
    /// The older benchmark driver called the DFB path `ospray`, so both
    /// spellings map to [`Compositor::Dfb`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "icet" => Some(Compositor::IceT),
            "dfb" | "ospray" => Some(Compositor::Dfb),
            _ => None,
        }
    }

    /// Human-facing label used in chart legends.
    pub fn label(self) -> &'static str {
        match self {
            Compositor::Dfb => "DFB",
            Compositor::IceT => "IceT",
        }
    }
}

impl fmt::Display for Compositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compositor::Dfb => f.write_str("dfb"),
            Compositor::IceT => f.write_str("icet"),
        }
    }
}

/// Frame resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow::anyhow!("resolution must look like WxH: {}", s))?;
        Ok(Self::new(w.trim().parse()?, h.trim().parse()?))
    }
}

/// Who ran, on how many nodes, at which resolution.
///
/// `resolution` is `None` only for logs whose naming convention does not
/// encode it and whose config line was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunIdentity {
    pub compositor: Compositor,
    pub node_count: u32,
    pub resolution: Option<Resolution>,
}

/// How a metric accumulates observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Reported once per run; the first observation wins.
    Scalar,
    /// Every observation is kept.
    Distribution,
}

/// Metrics recorded on a whole run (one benchmark execution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMetric {
    Max,
    Min,
    Median,
    MedianAbsDev,
    Mean,
    StdDev,
    CompositingOverhead,
    LocalMaxRender,
    LocalMinRender,
    FrameTime,
    CompositeTime,
}

impl RunMetric {
    pub fn kind(self) -> MetricKind {
        match self {
            RunMetric::Max
            | RunMetric::Min
            | RunMetric::Median
            | RunMetric::MedianAbsDev
            | RunMetric::Mean
            | RunMetric::StdDev => MetricKind::Scalar,
            RunMetric::CompositingOverhead
            | RunMetric::LocalMaxRender
            | RunMetric::LocalMinRender
            | RunMetric::FrameTime
            | RunMetric::CompositeTime => MetricKind::Distribution,
        }
    }

    /// The scalar reported alongside this one as its spread, if any.
    pub fn spread(self) -> Option<RunMetric> {
        match self {
            RunMetric::Mean => Some(RunMetric::StdDev),
            RunMetric::Median => Some(RunMetric::MedianAbsDev),
            _ => None,
        }
    }
}

/// Metrics recorded per MPI rank.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    Rendering,
    Compositing,
    Total,
    Gather,
    Waiting,
    Cpu,
    /// Resident set size, MB.
    Rss,
    /// Virtual memory size, MB.
    Vsz,
}

/// Statistic derived from a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Stat {
    Min,
    Max,
    #[default]
    Mean,
    Median,
    #[value(name = "stddev")]
    StdDev,
}
