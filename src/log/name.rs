//! Filename classification: which run does a log file describe?

use crate::error::ClassifyError;
use crate::model::{Compositor, Resolution, RunIdentity};
use crate::spec::{ResolutionSource, Variant};
use std::path::Path;

/// Outcome of classifying one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// A main benchmark log.
    Run(RunIdentity),
    /// A per-rank sub-log of the run named by `parent_stem`.
    Rank {
        identity: RunIdentity,
        rank: u32,
        parent_stem: String,
    },
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// True if `path` is a per-rank sub-log under `variant`. Such files are kept
/// out of the main pass.
pub fn is_rank_file(variant: &Variant, path: &Path) -> bool {
    variant.rank_token(&file_name(path)).is_some()
}

/// Classify `path` by its base name.
///
/// Per-rank sub-logs are recognised by their `rank<N>` token; with the token
/// removed the remaining name must match the main convention, and names the
/// parent log.
pub fn classify(variant: &Variant, path: &Path) -> Result<FileKind, ClassifyError> {
    let name = file_name(path);
    match variant.rank_token(&name) {
        Some((digits, span)) => {
            let rank = digits
                .parse::<u32>()
                .map_err(|_| ClassifyError::InvalidRank {
                    value: digits.to_string(),
                    file: name.clone(),
                })?;
            let mut stripped = name.clone();
            stripped.replace_range(span, "");
            let identity = identify(variant, &stripped, &name)?;
            let parent_stem = Path::new(&stripped)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(FileKind::Rank {
                identity,
                rank,
                parent_stem,
            })
        }
        None => Ok(FileKind::Run(identify(variant, &name, &name)?)),
    }
}

/// Match `name` against the variant's filename pattern. `shown` is what
/// error messages call the file.
fn identify(variant: &Variant, name: &str, shown: &str) -> Result<RunIdentity, ClassifyError> {
    let caps = variant
        .filename
        .captures(name)
        .ok_or_else(|| ClassifyError::Unrecognized(shown.to_string()))?;

    let comp = group(&caps, "compositor");
    let compositor =
        Compositor::from_name(comp).ok_or_else(|| ClassifyError::UnknownCompositor {
            name: comp.to_string(),
            file: shown.to_string(),
        })?;

    let nodes = group(&caps, "nodes");
    let node_count = nodes
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ClassifyError::InvalidNodeCount {
            value: nodes.to_string(),
            file: shown.to_string(),
        })?;

    let resolution = match variant.resolution {
        ResolutionSource::ConfigLine => None,
        ResolutionSource::Filename => {
            let (w, h) = (group(&caps, "width"), group(&caps, "height"));
            match (w.parse::<u32>(), h.parse::<u32>()) {
                (Ok(w), Ok(h)) if w > 0 && h > 0 => Some(Resolution::new(w, h)),
                _ => {
                    return Err(ClassifyError::InvalidResolution {
                        value: format!("{}x{}", w, h),
                        file: shown.to_string(),
                    });
                }
            }
        }
    };

    Ok(RunIdentity {
        compositor,
        node_count,
        resolution,
    })
}

fn group<'h>(caps: &regex::Captures<'h>, name: &str) -> &'h str {
    caps.name(name).map(|m| m.as_str()).unwrap_or_default()
}
