//! Project build orchestration.
//!
//! Build phases:
//! - **Scan** - Read every file under the source root into an asset
//! - **Execute** - Run each asset's step chain (parallel, see `pipeline`)
//! - **Finalize** - Name artifacts, rewrite markup references
//! - **Write** - Hand artifacts to the sink
//! - **Hooks** - Run `[[plugins]]` in order, write their artifacts
//! - **Commit** - Write the manifest, last

mod report;

pub use report::{BuildFailure, BuildReport};

use crate::{
    artifact::{ArtifactSink, DiskSink, finalize, write_artifacts},
    config::KilnConfig,
    core::{Asset, AssetKind, BuildContext, CancelToken},
    debug,
    hooks::run_hooks,
    log,
    logger::ProgressLine,
    pipeline::{Issue, Outcome, execute},
    transform::Registry,
    utils::path::{asset_id, collect_all_files},
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{fs, path::Path, sync::Arc, time::Instant};

/// Read every file under `source` as an asset, sorted by id.
pub fn scan_sources(source: &Path) -> Result<Vec<Asset>> {
    collect_all_files(source)
        .par_iter()
        .filter_map(|path| {
            let Some(id) = asset_id(source, path) else {
                log!("warning"; "skipping `{}`: path is not valid UTF-8", path.display());
                return None;
            };
            Some(
                fs::read(path)
                    .map(|content| Asset::new(id, content))
                    .with_context(|| format!("Failed to read {}", path.display())),
            )
        })
        .collect()
}

/// Per-kind progress counters for `assets`.
pub fn progress_for(assets: &[Asset]) -> ProgressLine {
    let counts = AssetKind::ALL.map(|kind| {
        let total = assets.iter().filter(|a| a.kind == kind).count();
        (kind.label(), total)
    });
    ProgressLine::new(&counts)
}

/// Fold a transform outcome into `report`. Returns the assets to write, or
/// `None` when the build was cancelled.
pub fn absorb_outcome(report: &mut BuildReport, outcome: Outcome) -> Option<Vec<Asset>> {
    report.transformed += outcome.transformed.len();
    report.warnings.extend(outcome.warnings);
    report
        .failures
        .extend(outcome.failures.into_iter().map(BuildFailure::Transform));

    if !outcome.cancelled.is_empty() {
        report.failures.push(BuildFailure::Cancelled(outcome.cancelled.len()));
        return None;
    }
    Some(outcome.transformed)
}

/// Finalize, write, run hooks, write their output, then commit the manifest.
///
/// The manifest is skipped when any file failed to write, so it never lists
/// a missing file.
pub fn write_outputs(
    cx: &BuildContext,
    transformed: Vec<Asset>,
    sink: &mut dyn ArtifactSink,
    report: &mut BuildReport,
) {
    let mut set = finalize(cx, transformed);
    report.warnings.append(&mut set.warnings);
    report
        .failures
        .extend(set.failures.drain(..).map(BuildFailure::Transform));

    let mut write_failures = write_artifacts(sink, &set.artifacts);

    let hooks = run_hooks(cx, &set);
    report
        .failures
        .extend(hooks.failures.into_iter().map(BuildFailure::Hook));
    write_failures.extend(write_artifacts(sink, &hooks.artifacts));

    report.written += set.artifacts.len() + hooks.artifacts.len() - write_failures.len();

    if write_failures.is_empty() {
        if let Err(e) = sink.commit(&cx.manifest()) {
            let manifest = &cx.config.build.manifest;
            report.failures.push(BuildFailure::Write(Issue::new(
                manifest,
                None,
                format!("failed to write manifest: {e}"),
            )));
        }
    } else {
        debug!("build"; "manifest not written after {} write failures", write_failures.len());
    }
    report
        .failures
        .extend(write_failures.into_iter().map(BuildFailure::Write));
}

/// `kiln build`: everything into the output directory.
pub fn build_project(config: Arc<KilnConfig>, cancel: CancelToken) -> Result<BuildReport> {
    let start = Instant::now();
    let cx = BuildContext::new(Arc::clone(&config), Arc::new(Registry::builtin()))?.with_cancel(cancel);

    let source = config.source_dir();
    if !source.is_dir() {
        log!("warning"; "source root `{}` does not exist", source.display());
    }
    let assets = scan_sources(&source)?;
    debug!("build"; "{} rules, {} assets", cx.rules.len(), assets.len());

    let mut report = BuildReport {
        assets: assets.len(),
        ..Default::default()
    };

    let progress = progress_for(&assets);
    let outcome = execute(&cx, assets, Some(&progress));
    progress.finish();

    if let Some(transformed) = absorb_outcome(&mut report, outcome) {
        let output = config.output_dir();
        let mut sink = DiskSink::new(output, &config.build.manifest, config.build.clean)
            .with_context(|| format!("Failed to prepare output directory {}", output.display()))?;
        write_outputs(&cx, transformed, &mut sink, &mut report);
    }

    report.print();
    if report.is_success() {
        log!("build"; "{} in {:.2?}", report, start.elapsed());
    } else {
        log!("failed"; "{}", report);
    }
    Ok(report)
}
