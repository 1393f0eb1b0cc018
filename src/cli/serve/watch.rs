//! Source watching: notify events → debounced rebuild → store swap.

use arc_swap::ArcSwap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::debouncer::{ChangeKind, Debouncer};
use super::rebuild::Rebuilder;
use crate::{
    artifact::ArtifactStore,
    core::CancelToken,
    debug, log,
    logger::{status_error, status_success, status_warning},
    utils::plural_count,
};

/// Longest wait between cancellation checks.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Started before the initial build so edits made during it are not lost.
pub struct SourceWatcher {
    watcher: RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
}

impl SourceWatcher {
    pub fn new(source: &Path) -> notify::Result<Self> {
        let (tx, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(source, RecursiveMode::Recursive)?;
        debug!("watch"; "watching {}", source.display());
        Ok(Self { watcher, events })
    }

    /// Run the watch loop on its own thread until `cancel` fires.
    pub fn spawn(
        self,
        rebuilder: Rebuilder,
        store: Arc<ArcSwap<ArtifactStore>>,
        cancel: CancelToken,
    ) -> JoinHandle<()> {
        thread::spawn(move || self.run(rebuilder, &store, &cancel))
    }

    fn run(self, mut rebuilder: Rebuilder, store: &ArcSwap<ArtifactStore>, cancel: &CancelToken) {
        let Self { watcher, events } = self;
        let mut debouncer = Debouncer::new();

        while !cancel.is_cancelled() {
            match events.recv_timeout(debouncer.sleep_duration().min(POLL_INTERVAL)) {
                Ok(Ok(event)) => debouncer.add_event(&event),
                Ok(Err(e)) => log!("watch"; "error: {e}"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Some(changes) = debouncer.take_if_ready() {
                let summary = describe_changes(&changes);
                rebuild(&mut rebuilder, store, cancel, &summary);
            }
        }
        drop(watcher);
    }
}

/// One rebuild pass; the store is swapped unless the pass was cancelled.
fn rebuild(rebuilder: &mut Rebuilder, store: &ArcSwap<ArtifactStore>, cancel: &CancelToken, summary: &str) {
    let start = Instant::now();
    match rebuilder.rebuild(cancel) {
        Ok((report, Some(next))) => {
            store.store(Arc::new(next));
            debug!("watch"; "{} cached", plural_count(rebuilder.cached(), "source"));
            if report.is_success() && !report.warnings.is_empty() {
                let detail: Vec<String> = report.warnings.iter().map(|w| format!("  {w}")).collect();
                status_warning(&format!("{summary}: {report}\n{}", detail.join("\n")));
            } else if report.is_success() {
                status_success(&format!("{summary}: {report} in {:.2?}", start.elapsed()));
            } else {
                let detail: Vec<String> = report.failures.iter().map(|f| format!("  {f}")).collect();
                status_error(&format!("{summary}: {report}"), &detail.join("\n"));
            }
        }
        Ok((_, None)) => debug!("watch"; "rebuild cancelled"),
        Err(e) => status_error(&format!("{summary}: rebuild failed"), &format!("{e:#}")),
    }
}

/// `"a.css modified"` for one change, `"3 changes"` otherwise.
fn describe_changes(changes: &rustc_hash::FxHashMap<std::path::PathBuf, ChangeKind>) -> String {
    match changes.iter().next() {
        Some((path, kind)) if changes.len() == 1 => {
            let name = path.file_name().map_or_else(
                || path.display().to_string(),
                |n| n.to_string_lossy().into_owned(),
            );
            format!("{name} {}", kind.label())
        }
        _ => plural_count(changes.len(), "change"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;
    use std::path::PathBuf;

    #[test]
    fn test_describe_changes() {
        let mut changes = FxHashMap::default();
        changes.insert(PathBuf::from("/src/css/a.css"), ChangeKind::Modified);
        assert_eq!(describe_changes(&changes), "a.css modified");

        changes.insert(PathBuf::from("/src/b.js"), ChangeKind::Created);
        assert_eq!(describe_changes(&changes), "2 changes");
    }
}
