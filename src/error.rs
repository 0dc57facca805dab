//! Domain errors. Everything else flows through `anyhow`.

use thiserror::Error;

/// A log file name that no known convention accepts.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("unrecognized filename pattern {0}")]
    Unrecognized(String),

    #[error("unknown compositor '{name}' in {file}")]
    UnknownCompositor { name: String, file: String },

    #[error("invalid node count '{value}' in {file}")]
    InvalidNodeCount { value: String, file: String },

    #[error("invalid resolution '{value}' in {file}")]
    InvalidResolution { value: String, file: String },

    #[error("invalid rank '{value}' in {file}")]
    InvalidRank { value: String, file: String },
}

/// A pattern registry entry that cannot be compiled.
#[derive(Debug, Error)]
pub enum VariantError {
    #[error("variant {variant}: bad {field} pattern: {source}")]
    Regex {
        variant: String,
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("variant {variant}: filename pattern lacks the named group '{group}'")]
    MissingGroup { variant: String, group: &'static str },

    #[error("variant {variant}: probe {probe} uses group {group} but its pattern has {available}")]
    GroupOutOfRange {
        variant: String,
        probe: usize,
        group: usize,
        available: usize,
    },

    #[error("variant {variant}: probe {probe} has rank_group but does not target a rank metric")]
    StrayRankGroup { variant: String, probe: usize },

    #[error("variant {variant}: probe {probe} has invalid scale {scale}")]
    InvalidScale {
        variant: String,
        probe: usize,
        scale: f64,
    },
}

/// A malformed rank subset such as `"3-1"` or `"x"`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankSetError {
    #[error("invalid rank '{0}'")]
    Invalid(String),

    #[error("rank range {lo}-{hi} is reversed")]
    Reversed { lo: u32, hi: u32 },
}
