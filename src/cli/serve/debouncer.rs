//! Burst collapsing for watch events.
//!
//! A rebuild fires once no event arrived for `DEBOUNCE_MS` and the previous
//! rebuild is at least `REBUILD_COOLDOWN_MS` old.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 300;
pub(super) const REBUILD_COOLDOWN_MS: u64 = 800;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Timing and deduplication only; the caller decides what a change means.
pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
    pub(super) last_rebuild: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing (appeared then vanished)
    /// - otherwise the first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // mtime/atime/chmod noise
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            let path = normalize_path(path);

            match self.changes.get(&path).copied() {
                None => {
                    crate::debug!("watch"; "{}: {}", kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                Some(ChangeKind::Removed) if kind != ChangeKind::Removed => {
                    self.changes.insert(path, kind);
                }
                Some(ChangeKind::Modified) if kind == ChangeKind::Removed => {
                    self.changes.insert(path, ChangeKind::Removed);
                }
                Some(ChangeKind::Created) if kind == ChangeKind::Removed => {
                    self.changes.remove(&path);
                }
                Some(_) => continue,
            }
            self.last_event = Some(Instant::now());
        }
    }

    /// Take pending changes once debounce and cooldown have both elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        if !self.is_ready() {
            return None;
        }
        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;
        self.last_rebuild = Some(Instant::now());
        Some(changes)
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }
        if let Some(last_rebuild) = self.last_rebuild
            && last_rebuild.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }
        !self.changes.is_empty()
    }

    /// Time until the next possible ready point.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining =
            Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown_remaining = self
            .last_rebuild
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Editor swap/backup files and dotfiles.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    fn modify_kind() -> notify::EventKind {
        notify::EventKind::Modify(notify::event::ModifyKind::Data(
            notify::event::DataChange::Any,
        ))
    }

    fn create_kind() -> notify::EventKind {
        notify::EventKind::Create(notify::event::CreateKind::File)
    }

    fn remove_kind() -> notify::EventKind {
        notify::EventKind::Remove(notify::event::RemoveKind::File)
    }

    #[test]
    fn test_debouncer_empty() {
        let debouncer = Debouncer::new();
        assert!(!debouncer.is_ready());
        assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
    }

    #[test]
    fn test_temp_files_ignored() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(
            vec!["/kiln-test/src/.a.css.swp", "/kiln-test/src/a.css~", "/kiln-test/src/x.tmp"],
            modify_kind(),
        ));
        assert!(debouncer.changes.is_empty());
        assert!(debouncer.last_event.is_none());
    }

    #[test]
    fn test_metadata_only_ignored() {
        let mut debouncer = Debouncer::new();
        let kind = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
            notify::event::MetadataKind::WriteTime,
        ));
        debouncer.add_event(&make_event(vec!["/kiln-test/src/a.css"], kind));
        assert!(debouncer.changes.is_empty());
    }

    #[test]
    fn test_dedup_first_event_wins() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], create_kind()));
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], modify_kind()));
        assert_eq!(debouncer.changes.len(), 1);
        assert_eq!(debouncer.changes[&PathBuf::from("/kiln-test/a.css")], ChangeKind::Created);
    }

    #[test]
    fn test_remove_then_create_restores() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], remove_kind()));
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], create_kind()));
        assert_eq!(debouncer.changes[&PathBuf::from("/kiln-test/a.css")], ChangeKind::Created);
    }

    #[test]
    fn test_create_then_remove_discards() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], create_kind()));
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], remove_kind()));
        assert!(debouncer.changes.is_empty());
    }

    #[test]
    fn test_modify_then_remove_upgrades() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], remove_kind()));
        assert_eq!(debouncer.changes[&PathBuf::from("/kiln-test/a.css")], ChangeKind::Removed);
    }

    #[test]
    fn test_sleep_duration_respects_cooldown() {
        let mut debouncer = Debouncer::new();
        debouncer.last_event = Some(Instant::now());
        let dur = debouncer.sleep_duration();
        assert!(dur >= Duration::from_millis(DEBOUNCE_MS - 10));
        assert!(dur <= Duration::from_millis(DEBOUNCE_MS + 10));

        debouncer.last_rebuild = Some(Instant::now());
        let dur = debouncer.sleep_duration();
        assert!(dur >= Duration::from_millis(REBUILD_COOLDOWN_MS - 10));
        assert!(dur <= Duration::from_millis(REBUILD_COOLDOWN_MS + 10));
    }

    #[test]
    fn test_take_if_ready_waits_for_debounce() {
        let mut debouncer = Debouncer::new();
        debouncer.add_event(&make_event(vec!["/kiln-test/a.css"], modify_kind()));
        assert!(debouncer.take_if_ready().is_none());

        debouncer.last_event = Instant::now().checked_sub(Duration::from_millis(DEBOUNCE_MS + 1));
        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(changes.len(), 1);
        assert!(debouncer.changes.is_empty());
        assert!(debouncer.last_rebuild.is_some());
    }
}
