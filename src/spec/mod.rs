//! Spec layer: variant registry (filename conventions + line probes) and
//! the rank subset selector.
//!
//! This module is separate from log scanning and rendering. It owns:
//! - the JSON-loadable variant schema and its validated form
//! - the built-in variants
//! - rank subsets given on the command line

pub mod builtin;
pub mod ranks;
pub mod variant;

pub use builtin::BuiltinVariant;
pub use ranks::RankSet;
pub use variant::{Probe, ProbeTarget, ResolutionSource, UnmatchedPolicy, Variant, VariantSpec};

use crate::Result;
use anyhow::Context;
use std::path::Path;

/// Load the variant to ingest with: a custom JSON spec when `patterns` is
/// given, the built-in otherwise.
pub fn load_variant(builtin: BuiltinVariant, patterns: Option<&Path>) -> Result<Variant> {
    let spec = match patterns {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read pattern file {}", path.display()))?;
            serde_json::from_str::<VariantSpec>(&text)
                .with_context(|| format!("parse pattern file {}", path.display()))?
        }
        None => builtin.spec(),
    };
    Ok(spec.validate_and_build()?)
}
