use crate::Result;
use crate::model::{RankRecord, Resolution, RunIdentity, RunRecord};
use crate::spec::{Probe, ProbeTarget, ResolutionSource, Variant};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, error, warn};

/// The JSON rendering configuration some drivers echo as
/// `Rendering Config: {...}`. Only the image size matters here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    pub image_size: [u32; 2],
}

impl RenderConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.image_size[0], self.image_size[1])
    }
}

/// What a single pass over one file found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub lines: usize,
    /// Probe hits that produced a value.
    pub matches: usize,
    /// The first parseable config line.
    pub config: Option<RenderConfig>,
}

/// Captured number of `probe`, scaled. `None` if the text is not a number.
fn probe_value(probe: &Probe, caps: &regex::Captures<'_>) -> Option<f64> {
    caps.get(probe.group)?
        .as_str()
        .parse::<f64>()
        .ok()
        .map(|v| v * probe.scale)
}

/// Apply every probe of `variant` to every line, recording into `run`.
///
/// Unmatched lines are ignored. Rank metrics are only taken from probes
/// that capture the rank number themselves.
pub fn scan_run<'a>(
    variant: &Variant,
    lines: impl IntoIterator<Item = &'a str>,
    run: &mut RunRecord,
    shown: &str,
) -> ScanStats {
    let mut stats = ScanStats::default();
    for (lineno, line) in lines.into_iter().enumerate() {
        let lno = lineno + 1;
        stats.lines += 1;
        for probe in &variant.probes {
            let Some(caps) = probe.regex.captures(line) else {
                continue;
            };
            match probe.target {
                ProbeTarget::RenderConfig => {
                    if stats.config.is_some() {
                        continue;
                    }
                    let text = caps.get(probe.group).map(|m| m.as_str()).unwrap_or_default();
                    match serde_json::from_str::<RenderConfig>(text) {
                        Ok(cfg) => {
                            stats.config = Some(cfg);
                            stats.matches += 1;
                        }
                        Err(e) => warn!("bad rendering config at {}:{}: {}", shown, lno, e),
                    }
                }
                ProbeTarget::Run(metric) => match probe_value(probe, &caps) {
                    Some(v) => {
                        run.record(metric, v);
                        stats.matches += 1;
                    }
                    None => debug!("unparseable {:?} value at {}:{}", metric, shown, lno),
                },
                ProbeTarget::Rank(metric) => {
                    let Some(g) = probe.rank_group else {
                        continue;
                    };
                    let rank = caps.get(g).and_then(|m| m.as_str().parse::<u32>().ok());
                    match (rank, probe_value(probe, &caps)) {
                        (Some(rank), Some(v)) => {
                            run.rank_mut(rank).record(metric, v);
                            stats.matches += 1;
                        }
                        _ => debug!("unparseable {:?} rank value at {}:{}", metric, shown, lno),
                    }
                }
            }
        }
    }
    stats
}

/// Apply the rank probes of `variant` to a per-rank sub-log. Every value
/// goes to `rank`, whatever rank the line itself mentions.
pub fn scan_rank<'a>(
    variant: &Variant,
    lines: impl IntoIterator<Item = &'a str>,
    rank: &mut RankRecord,
    shown: &str,
) -> ScanStats {
    let mut stats = ScanStats::default();
    for (lineno, line) in lines.into_iter().enumerate() {
        stats.lines += 1;
        for probe in &variant.probes {
            let ProbeTarget::Rank(metric) = probe.target else {
                continue;
            };
            let Some(caps) = probe.regex.captures(line) else {
                continue;
            };
            match probe_value(probe, &caps) {
                Some(v) => {
                    rank.record(metric, v);
                    stats.matches += 1;
                }
                None => debug!("unparseable {:?} value at {}:{}", metric, shown, lineno + 1),
            }
        }
    }
    stats
}

/// Read and scan one main log into a new [`RunRecord`].
///
/// For variants that take the resolution from the config line, a missing
/// line is reported and the run comes back without a resolution.
pub fn parse_run_file(
    variant: &Variant,
    path: &Path,
    identity: RunIdentity,
) -> Result<(RunRecord, ScanStats)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read log file {}", path.display()))?;
    let shown = path.display().to_string();

    let mut run = RunRecord::new(identity, path);
    let stats = scan_run(variant, text.lines(), &mut run, &shown);

    let from_config = stats.config.as_ref().map(RenderConfig::resolution);
    match variant.resolution {
        ResolutionSource::ConfigLine => {
            if from_config.is_none() {
                error!("did not find config line for run {}", shown);
            }
            run.identity.resolution = from_config;
        }
        ResolutionSource::Filename => {
            if let (Some(cfg), Some(name)) = (from_config, run.identity.resolution)
                && cfg != name
            {
                debug!(
                    "{}: config line says {} but file name says {}; using the file name",
                    shown, cfg, name
                );
            }
        }
    }

    Ok((run, stats))
}

/// Read and scan one per-rank sub-log into `rank`.
pub fn parse_rank_file(variant: &Variant, path: &Path, rank: &mut RankRecord) -> Result<ScanStats> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read rank log file {}", path.display()))?;
    rank.source = Some(path.to_path_buf());
    Ok(scan_rank(
        variant,
        text.lines(),
        rank,
        &path.display().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Compositor, RankMetric, RunMetric, Stat};
    use crate::spec::BuiltinVariant;
    use pretty_assertions::assert_eq;

    const FRAMES_LOG: &str = "\
Using IceT for compositing
Beginning rendering
IceT Max OSPRay render time: 41ms
IceT Min OSPRay render time: 30ms
IceT Compositing Overhead: 12.5ms
IceT composite time: 7ms
Frame 0 took 95ms
IceT Max OSPRay render time: 39ms
IceT Min OSPRay render time: 28ms
IceT Compositing Overhead: 11.5ms
IceT composite time: 9ms
Frame 1 took 85ms
Rendering completed
";

    const STATS_LOG: &str = "\
OSPRay rendering + IceT compositing:
Statistics:
\tmax: 120ms
\tmin: 80ms
\tmedian: 95ms
\tmedian abs dev: 3ms
\tmean: 97.5ms
\tstd dev: 5ms
\t# of samples: 10
Statistics:
\tmean: 1000ms
";

    const RANK_LOG: &str = "\
Rendering time: 40ms
Compositing time: 12ms
Total time: 55ms
Gather time: 1.5ms
Waiting time: 3ms
CPU: 97.5%
VmRSS:\t  123456 kB
VmSize:\t 2345678 kB
Rendering time: 42ms
";

    fn variant(v: BuiltinVariant) -> Variant {
        v.spec().validate_and_build().unwrap()
    }

    fn identity(resolution: Option<Resolution>) -> RunIdentity {
        RunIdentity {
            compositor: Compositor::IceT,
            node_count: 8,
            resolution,
        }
    }

    fn scan(v: &Variant, text: &str) -> (RunRecord, ScanStats) {
        let mut run = RunRecord::new(identity(None), "test.txt");
        let stats = scan_run(v, text.lines(), &mut run, "test.txt");
        (run, stats)
    }

    #[test]
    fn frame_log_distributions() {
        let (run, stats) = scan(&variant(BuiltinVariant::Frames), FRAMES_LOG);
        assert_eq!(stats.lines, 13);
        assert_eq!(stats.matches, 10);
        assert_eq!(
            run.distribution(RunMetric::FrameTime).unwrap().samples(),
            &[95.0, 85.0]
        );
        assert_eq!(
            run.distribution(RunMetric::CompositingOverhead).unwrap().samples(),
            &[12.5, 11.5]
        );
        assert_eq!(run.value(RunMetric::CompositeTime, Stat::Mean), 8.0);
        assert_eq!(run.value(RunMetric::LocalMaxRender, Stat::Max), 41.0);
        assert_eq!(run.value(RunMetric::LocalMinRender, Stat::Min), 28.0);
    }

    #[test]
    fn stats_block_scalars_keep_first() {
        let (run, _) = scan(&variant(BuiltinVariant::Stats), STATS_LOG);
        assert_eq!(run.scalar(RunMetric::Max), Some(120.0));
        assert_eq!(run.scalar(RunMetric::Min), Some(80.0));
        assert_eq!(run.scalar(RunMetric::Median), Some(95.0));
        assert_eq!(run.scalar(RunMetric::MedianAbsDev), Some(3.0));
        assert_eq!(run.scalar(RunMetric::Mean), Some(97.5));
        assert_eq!(run.scalar(RunMetric::StdDev), Some(5.0));
    }

    #[test]
    fn rescanning_is_idempotent() {
        let v = variant(BuiltinVariant::Frames);
        let (a, sa) = scan(&v, FRAMES_LOG);
        let (b, sb) = scan(&v, FRAMES_LOG);
        assert_eq!(a, b);
        assert_eq!(sa, sb);
    }

    #[test]
    fn unrelated_text_matches_nothing() {
        let (run, stats) = scan(
            &variant(BuiltinVariant::Ranks),
            "hello\nnothing to see here\n",
        );
        assert_eq!(stats.matches, 0);
        assert_eq!(run.observation_count(), 0);
        assert!(run.value(RunMetric::FrameTime, Stat::Mean).is_nan());
    }

    #[test]
    fn main_log_cpu_lines_fill_ranks() {
        let (run, _) = scan(
            &variant(BuiltinVariant::Ranks),
            "rank 0, CPU: 97.5%\nrank 1, CPU: 50%\nrank 0, CPU: 98.5%\n",
        );
        assert_eq!(run.rank(0).unwrap().value(RankMetric::Cpu, Stat::Mean), 98.0);
        assert_eq!(run.rank(1).unwrap().value(RankMetric::Cpu, Stat::Mean), 50.0);
    }

    #[test]
    fn rank_log_metrics_and_memory_scaling() {
        let v = variant(BuiltinVariant::Ranks);
        let mut rank = RankRecord::new(3);
        let stats = scan_rank(&v, RANK_LOG.lines(), &mut rank, "rank3.txt");
        assert_eq!(stats.matches, 9);
        assert_eq!(
            rank.distribution(RankMetric::Rendering).unwrap().samples(),
            &[40.0, 42.0]
        );
        assert_eq!(rank.value(RankMetric::Compositing, Stat::Mean), 12.0);
        assert_eq!(rank.value(RankMetric::Total, Stat::Mean), 55.0);
        assert_eq!(rank.value(RankMetric::Gather, Stat::Mean), 1.5);
        assert_eq!(rank.value(RankMetric::Waiting, Stat::Mean), 3.0);
        assert_eq!(rank.value(RankMetric::Cpu, Stat::Mean), 97.5);
        assert!((rank.value(RankMetric::Rss, Stat::Mean) - 123.456).abs() < 1e-9);
        assert!((rank.value(RankMetric::Vsz, Stat::Mean) - 2345.678).abs() < 1e-9);
    }

    #[test]
    fn config_line_supplies_resolution() {
        let v = variant(BuiltinVariant::Config);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench-icet-8n-volume-1.txt");
        fs::write(
            &path,
            "Rendering Config: {\"image_size\": [1920, 1080], \"spp\": 1}\nIceT Compositing Overhead: 4ms\nFrame 0 took 20ms\n",
        )
        .unwrap();
        let (run, stats) = parse_run_file(&v, &path, identity(None)).unwrap();
        assert_eq!(run.identity.resolution, Some(Resolution::new(1920, 1080)));
        assert_eq!(
            stats.config,
            Some(RenderConfig {
                image_size: [1920, 1080]
            })
        );
        assert_eq!(run.value(RunMetric::FrameTime, Stat::Mean), 20.0);
    }

    #[test]
    fn missing_config_line_keeps_the_run() {
        let v = variant(BuiltinVariant::Config);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench-icet-8n-volume-1.txt");
        fs::write(&path, "Frame 0 took 20ms\nRendering Config: not json\n").unwrap();
        let (run, stats) = parse_run_file(&v, &path, identity(None)).unwrap();
        assert_eq!(run.identity.resolution, None);
        assert_eq!(stats.config, None);
        assert_eq!(run.value(RunMetric::FrameTime, Stat::Mean), 20.0);
    }

    #[test]
    fn filename_resolution_wins_over_config() {
        let v = variant(BuiltinVariant::Frames);
        let mut probes = v.probes.clone();
        probes.push(
            BuiltinVariant::Config
                .spec()
                .validate_and_build()
                .unwrap()
                .probes[0]
                .clone(),
        );
        let v = Variant { probes, ..v };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench_icet_8n_512x512.txt");
        fs::write(&path, "Rendering Config: {\"image_size\": [64, 64]}\n").unwrap();
        let res = Some(Resolution::new(512, 512));
        let (run, _) = parse_run_file(&v, &path, identity(res)).unwrap();
        assert_eq!(run.identity.resolution, res);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let v = variant(BuiltinVariant::Frames);
        let err = parse_run_file(&v, Path::new("/nonexistent/bench.txt"), identity(None))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("read log file"));
    }
}
