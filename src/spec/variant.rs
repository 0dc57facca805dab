//! Variant spec: which file names and log lines one benchmark sweep produces.
//!
//! JSON shape (for `--patterns`):
//! {
//!   "name": "frames",
//!   "filename": "^bench_(?P<compositor>[A-Za-z]+)_(?P<nodes>\\d+)n_(?P<width>\\d+)x(?P<height>\\d+)(?:-.*)?\\.txt$",
//!   "rank_pattern": "[-_.]rank(\\d+)",          // optional
//!   "resolution": "filename",                     // or "config_line"
//!   "on_unmatched": "skip",                       // or "fatal"
//!   "probes": [
//!     { "target": { "run": "frame_time" }, "pattern": "Frame (\\d+) took (\\d+)ms", "group": 2 },
//!     { "target": { "rank": "cpu" }, "pattern": "rank (\\d+), CPU: (\\d+)%", "group": 2, "rank_group": 1 },
//!     { "target": { "rank": "rss" }, "pattern": "VmRSS:\\s*(\\d+)\\s*kB", "scale": 0.001 },
//!     { "target": "render_config", "pattern": "^Rendering Config: (.*)$" }
//!   ]
//! }
//!
//! We compile every regex up front and check that the capture groups each
//! probe refers to actually exist.

use crate::error::VariantError;
use crate::model::{RankMetric, RunMetric};
use regex::Regex;
use serde::Deserialize;
use std::ops::Range;

/// What a missing filename match does to the whole ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Abort with a non-zero exit.
    Fatal,
    /// Warn and carry on with the next file.
    Skip,
}

/// Where a run's resolution comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// `width`/`height` groups of the filename pattern.
    Filename,
    /// `image_size` of the JSON `Rendering Config:` line; required.
    ConfigLine,
}

/// Destination of a probe's captured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeTarget {
    Run(RunMetric),
    Rank(RankMetric),
    /// The captured text is the JSON rendering config.
    RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSpec {
    pub target: ProbeTarget,
    pub pattern: String,
    /// Capture group holding the value. Defaults to 1.
    #[serde(default)]
    pub group: Option<usize>,
    /// Capture group holding the rank number, for rank metrics reported in
    /// the main log.
    #[serde(default)]
    pub rank_group: Option<usize>,
    /// Multiplier applied to the captured number (e.g. 0.001 for kB -> MB).
    #[serde(default)]
    pub scale: Option<f64>,
}

/// Raw variant shape as it appears in JSON (or is built in).
#[derive(Debug, Clone, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub rank_pattern: Option<String>,
    pub resolution: ResolutionSource,
    pub on_unmatched: UnmatchedPolicy,
    #[serde(default)]
    pub probes: Vec<ProbeSpec>,
}

/// A compiled line probe.
#[derive(Debug, Clone)]
pub struct Probe {
    pub target: ProbeTarget,
    pub regex: Regex,
    pub group: usize,
    pub rank_group: Option<usize>,
    pub scale: f64,
}

/// A validated variant, ready for classification and extraction.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub filename: Regex,
    pub rank_pattern: Option<Regex>,
    pub resolution: ResolutionSource,
    pub on_unmatched: UnmatchedPolicy,
    pub probes: Vec<Probe>,
}

impl VariantSpec {
    /// Compile every pattern and check the capture groups they promise.
    pub fn validate_and_build(&self) -> Result<Variant, VariantError> {
        let compile = |field: &str, pattern: &str| {
            Regex::new(pattern).map_err(|source| VariantError::Regex {
                variant: self.name.clone(),
                field: field.to_string(),
                source,
            })
        };

        let filename = compile("filename", &self.filename)?;
        let mut required = vec!["compositor", "nodes"];
        if self.resolution == ResolutionSource::Filename {
            required.extend(["width", "height"]);
        }
        for group in required {
            if !filename.capture_names().flatten().any(|n| n == group) {
                return Err(VariantError::MissingGroup {
                    variant: self.name.clone(),
                    group,
                });
            }
        }

        let rank_pattern = match &self.rank_pattern {
            Some(p) => {
                let re = compile("rank", p)?;
                if re.captures_len() < 2 {
                    return Err(VariantError::GroupOutOfRange {
                        variant: self.name.clone(),
                        probe: 0,
                        group: 1,
                        available: re.captures_len() - 1,
                    });
                }
                Some(re)
            }
            None => None,
        };

        let mut probes = Vec::with_capacity(self.probes.len());
        for (idx, spec) in self.probes.iter().enumerate() {
            let regex = compile(&format!("probe {}", idx), &spec.pattern)?;
            let available = regex.captures_len() - 1;
            let group = spec.group.unwrap_or(1);
            for g in std::iter::once(group).chain(spec.rank_group) {
                if g == 0 || g > available {
                    return Err(VariantError::GroupOutOfRange {
                        variant: self.name.clone(),
                        probe: idx,
                        group: g,
                        available,
                    });
                }
            }
            if spec.rank_group.is_some() && !matches!(spec.target, ProbeTarget::Rank(_)) {
                return Err(VariantError::StrayRankGroup {
                    variant: self.name.clone(),
                    probe: idx,
                });
            }
            let scale = spec.scale.unwrap_or(1.0);
            if !scale.is_finite() || scale == 0.0 {
                return Err(VariantError::InvalidScale {
                    variant: self.name.clone(),
                    probe: idx,
                    scale,
                });
            }
            probes.push(Probe {
                target: spec.target,
                regex,
                group,
                rank_group: spec.rank_group,
                scale,
            });
        }

        Ok(Variant {
            name: self.name.clone(),
            filename,
            rank_pattern,
            resolution: self.resolution,
            on_unmatched: self.on_unmatched,
            probes,
        })
    }
}

impl Variant {
    /// Rank digits and the span to strip if `name` is a per-rank sub-log.
    ///
    /// The digits come from the `rank` group (else group 1), the span from
    /// the `token` group (else the whole match).
    pub fn rank_token<'n>(&self, name: &'n str) -> Option<(&'n str, Range<usize>)> {
        let caps = self.rank_pattern.as_ref()?.captures(name)?;
        let digits = caps.name("rank").or_else(|| caps.get(1))?;
        let span = caps.name("token").or_else(|| caps.get(0))?;
        Some((digits.as_str(), span.range()))
    }
}
