//! Two-pass ingest of a benchmark sweep into a [`RunStore`].
//!
//! Pass 1 classifies and scans every main log. Pass 2 attaches per-rank
//! sub-logs to the runs created in pass 1. The store is sorted at the end.

use crate::Result;
use crate::error::ClassifyError;
use crate::log::name::{self, FileKind};
use crate::log::parse;
use crate::model::RunStore;
use crate::model::store::ParentKey;
use crate::spec::{UnmatchedPolicy, Variant};
use anyhow::Context;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Counters describing one ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub runs: usize,
    pub rank_files: usize,
    pub unmatched: usize,
    pub orphaned_ranks: usize,
    pub missing_config: usize,
    pub empty_runs: usize,
}

/// Expand the command-line inputs: files are taken as given, directories are
/// walked for `*.txt` files in path order.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input) {
                let entry = entry.with_context(|| format!("scan directory {}", input.display()))?;
                let path = entry.path();
                if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "txt") {
                    found.push(path.to_path_buf());
                }
            }
            found.sort();
            debug!("found {} log files under {}", found.len(), input.display());
            out.extend(found);
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

/// Handle a classification failure according to `policy`.
fn unmatched(policy: UnmatchedPolicy, err: ClassifyError, report: &mut IngestReport) -> Result<()> {
    match policy {
        UnmatchedPolicy::Fatal => Err(err.into()),
        UnmatchedPolicy::Skip => {
            warn!("skipping file: {}", err);
            report.unmatched += 1;
            Ok(())
        }
    }
}

/// Read every file into a finalized store.
pub fn ingest(
    variant: &Variant,
    files: &[PathBuf],
    policy: UnmatchedPolicy,
) -> Result<(RunStore, IngestReport)> {
    let mut store = RunStore::new();
    let mut report = IngestReport {
        files: files.len(),
        ..Default::default()
    };

    let (rank_files, main_files): (Vec<&PathBuf>, Vec<&PathBuf>) = files
        .iter()
        .partition(|p| name::is_rank_file(variant, p));

    // Pass 1: main logs.
    for path in main_files {
        let identity = match name::classify(variant, path) {
            Ok(FileKind::Run(identity)) => identity,
            Ok(FileKind::Rank { .. }) => continue,
            Err(e) => {
                unmatched(policy, e, &mut report)?;
                continue;
            }
        };

        let (run, stats) = parse::parse_run_file(variant, path, identity)?;
        debug!(
            "{}: {} lines, {} matches, {} observations",
            path.display(),
            stats.lines,
            stats.matches,
            run.observation_count()
        );
        if stats.matches == 0 {
            report.empty_runs += 1;
        }
        if run.identity.resolution.is_none() {
            report.missing_config += 1;
        }
        store.insert(run);
        report.runs += 1;
    }

    // Pass 2: per-rank sub-logs.
    for path in rank_files {
        let (identity, rank, parent_stem) = match name::classify(variant, path) {
            Ok(FileKind::Rank {
                identity,
                rank,
                parent_stem,
            }) => (identity, rank, parent_stem),
            Ok(FileKind::Run(_)) => continue,
            Err(e) => {
                unmatched(policy, e, &mut report)?;
                continue;
            }
        };

        let key = ParentKey {
            compositor: identity.compositor,
            node_count: identity.node_count,
            resolution: identity.resolution,
            stem: &parent_stem,
        };
        let Some(parent) = store.find_parent_mut(&key) else {
            warn!(
                "no parent run for rank file {} ({} on {} nodes); skipping",
                path.display(),
                identity.compositor.label(),
                identity.node_count
            );
            report.orphaned_ranks += 1;
            continue;
        };
        if parent.stem() != Some(parent_stem.as_str()) {
            debug!(
                "rank file {} attached to {}",
                path.display(),
                parent.source().display()
            );
        }
        parse::parse_rank_file(variant, path, parent.rank_mut(rank))?;
        report.rank_files += 1;
    }

    store.finalize();
    info!(
        "ingested {} runs ({} rank logs) from {} files with variant {}",
        report.runs, report.rank_files, report.files, variant.name
    );
    if report.unmatched > 0 {
        warn!("{} files did not match the naming convention", report.unmatched);
    }
    if report.missing_config > 0 {
        warn!(
            "{} runs have no resolution and will not be charted",
            report.missing_config
        );
    }
    Ok((store, report))
}

/// Convenience wrapper: expand inputs, then ingest.
pub fn ingest_paths(
    variant: &Variant,
    inputs: &[PathBuf],
    policy: UnmatchedPolicy,
) -> Result<(RunStore, IngestReport)> {
    let files = collect_inputs(inputs)?;
    if files.is_empty() {
        warn!("no input log files");
    }
    ingest(variant, &files, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::series::Quantity;
    use crate::model::{Compositor, RankMetric, Resolution, RunMetric, Stat};
    use crate::spec::BuiltinVariant;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;

    fn variant(v: BuiltinVariant) -> Variant {
        v.spec().validate_and_build().unwrap()
    }

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn duplicate_node_counts_take_the_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let stats = |mean: u32| format!("Statistics:\n\tmean: {}ms\n\tstd dev: 2ms\n", mean);
        let files = vec![
            write(dir.path(), "bench_icet_4n_512x512-run-1.txt", &stats(50)),
            write(dir.path(), "bench_icet_8n_512x512-run-1.txt", &stats(80)),
            write(dir.path(), "bench_icet_8n_512x512-run-2.txt", &stats(60)),
        ];
        let (store, report) =
            ingest(&variant(BuiltinVariant::Stats), &files, UnmatchedPolicy::Fatal).unwrap();
        assert_eq!(report.runs, 3);

        let s = store.get_series(
            Resolution::new(512, 512),
            Compositor::IceT,
            &Quantity::run(RunMetric::Mean, Stat::Mean),
        );
        assert_eq!(s.x, vec![4, 8]);
        assert_eq!(s.y, vec![50.0, 60.0]);
        assert_eq!(s.yerr, vec![2.0, 2.0]);
    }

    #[test]
    fn fatal_policy_aborts_on_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "bench_icet_4n_512x512.txt", "Frame 0 took 1ms\n"),
            write(dir.path(), "notes.txt", "hello\n"),
        ];
        let err = ingest(&variant(BuiltinVariant::Frames), &files, UnmatchedPolicy::Fatal)
            .unwrap_err();
        assert!(err.to_string().contains("unrecognized filename pattern notes.txt"));
    }

    #[test]
    fn skip_policy_warns_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "bench_icet_4n_512x512.txt", "Frame 0 took 1ms\n"),
            write(dir.path(), "notes.txt", "hello\n"),
        ];
        let (store, report) =
            ingest(&variant(BuiltinVariant::Frames), &files, UnmatchedPolicy::Skip).unwrap();
        assert_eq!(report.unmatched, 1);
        assert_eq!(store.run_count(), 1);
    }

    #[test]
    fn rank_files_attach_to_their_parent() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            // rank file listed first: it must still wait for pass 2
            write(
                dir.path(),
                "bench_dfb_2n_256x256-run-2-rank1.txt",
                "CPU: 80%\nRendering time: 10ms\n",
            ),
            write(dir.path(), "bench_dfb_2n_256x256-run-1.txt", "Frame 0 took 30ms\n"),
            write(dir.path(), "bench_dfb_2n_256x256-run-2.txt", "Frame 0 took 20ms\n"),
            write(dir.path(), "bench_dfb_4n_256x256-rank0.txt", "CPU: 10%\n"),
        ];
        let (store, report) =
            ingest(&variant(BuiltinVariant::Ranks), &files, UnmatchedPolicy::Fatal).unwrap();
        assert_eq!(report.runs, 2);
        assert_eq!(report.rank_files, 1);
        assert_eq!(report.orphaned_ranks, 1);

        let runs = store
            .get(Resolution::new(256, 256))
            .unwrap()
            .runs(Compositor::Dfb);
        assert!(runs[0].rank(1).is_none());
        let rank = runs[1].rank(1).unwrap();
        assert_eq!(rank.value(RankMetric::Cpu, Stat::Mean), 80.0);
        assert_eq!(rank.value(RankMetric::Rendering, Stat::Mean), 10.0);
        assert!(rank.source.is_some());
    }

    #[test]
    fn dotted_rank_files_stay_out_of_the_main_pass() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(dir.path(), "bench_icet_4n_64x64.txt", "Frame 0 took 30ms\n"),
            write(dir.path(), "bench_icet_4n_64x64.rank2.txt", "CPU: 55%\n"),
        ];
        let (store, report) =
            ingest(&variant(BuiltinVariant::Ranks), &files, UnmatchedPolicy::Fatal).unwrap();
        assert_eq!(report.runs, 1);
        assert_eq!(report.rank_files, 1);
        assert_eq!(report.unmatched, 0);

        let runs = store
            .get(Resolution::new(64, 64))
            .unwrap()
            .runs(Compositor::IceT);
        assert_eq!(runs[0].rank(2).unwrap().value(RankMetric::Cpu, Stat::Mean), 55.0);
    }

    #[test]
    fn config_variant_keeps_runs_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write(
                dir.path(),
                "bench-icet-4n-vol-1.txt",
                "Rendering Config: {\"image_size\": [512, 512]}\nFrame 0 took 10ms\n",
            ),
            write(dir.path(), "bench-icet-8n-vol-1.txt", "Frame 0 took 20ms\n"),
        ];
        let (store, report) =
            ingest(&variant(BuiltinVariant::Config), &files, UnmatchedPolicy::Fatal).unwrap();
        assert_eq!(report.missing_config, 1);
        assert_eq!(store.unresolved().len(), 1);
        assert_eq!(store.unresolved()[0].identity.node_count, 8);
        assert_eq!(store.resolutions().collect::<Vec<_>>(), vec![Resolution::new(512, 512)]);
    }

    #[test]
    fn directories_are_walked_for_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        write(dir.path(), "b.txt", "");
        write(&dir.path().join("sub"), "a.txt", "");
        write(dir.path(), "ignore.png", "");
        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["b.txt".to_string(), "sub/a.txt".to_string()]);
    }
}
