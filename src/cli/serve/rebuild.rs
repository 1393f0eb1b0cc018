//! Incremental in-memory rebuilds for the dev server.
//!
//! Transformed results are cached per scanned source, keyed by its content
//! hash. A rebuild re-executes only new or changed sources, then finalizes,
//! runs hooks and commits into a fresh `MemorySink` like a full build.

use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::{
    artifact::{ArtifactStore, MemorySink},
    cli::build::{BuildReport, absorb_outcome, scan_sources, write_outputs},
    config::KilnConfig,
    core::{Asset, BuildContext, CancelToken},
    debug,
    pipeline::execute,
    transform::Registry,
    utils::hash::ContentHash,
};

/// Transformed assets rooted at one scanned source (side assets included).
struct CachedSource {
    hash: ContentHash,
    outputs: Vec<Asset>,
}

pub struct Rebuilder {
    config: Arc<KilnConfig>,
    registry: Arc<Registry>,
    cache: FxHashMap<String, CachedSource>,
}

impl Rebuilder {
    pub fn new(config: Arc<KilnConfig>) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::builtin()),
            cache: FxHashMap::default(),
        }
    }

    /// Rebuild into memory. The store is `None` when the pass was cancelled.
    pub fn rebuild(&mut self, cancel: &CancelToken) -> Result<(BuildReport, Option<ArtifactStore>)> {
        let cx = BuildContext::new(Arc::clone(&self.config), Arc::clone(&self.registry))?
            .with_cancel(cancel.clone());

        let assets = scan_sources(&self.config.source_dir())?;
        let mut report = BuildReport {
            assets: assets.len(),
            ..Default::default()
        };

        let scanned: FxHashSet<String> = assets.iter().map(|a| a.id.clone()).collect();
        self.cache.retain(|id, _| scanned.contains(id));

        let mut reused = Vec::new();
        let mut fresh = Vec::new();
        let mut hashes = FxHashMap::default();
        for asset in assets {
            let hash = asset.hash();
            match self.cache.get(&asset.id) {
                Some(cached) if cached.hash == hash => reused.extend(cached.outputs.iter().cloned()),
                _ => {
                    hashes.insert(asset.id.clone(), hash);
                    fresh.push(asset);
                }
            }
        }
        debug!("rebuild"; "{} reused, {} to run", reused.len(), fresh.len());

        {
            let mut manifest = cx.manifest();
            for asset in &reused {
                manifest.register(&asset.id, asset.kind, asset.parent.as_deref());
            }
        }

        let outcome = execute(&cx, fresh, None);
        let clean_pass = outcome.failures.is_empty();
        let Some(mut transformed) = absorb_outcome(&mut report, outcome) else {
            return Ok((report, None));
        };

        // A source whose chain failed anywhere reruns next time.
        if clean_pass {
            for id in hashes.keys() {
                self.cache.remove(id);
            }
            for (root, outputs) in group_by_root(&transformed, &scanned) {
                if let Some(hash) = hashes.remove(&root) {
                    self.cache.insert(root, CachedSource { hash, outputs });
                }
            }
        }

        transformed.extend(reused);
        transformed.sort_by(|a, b| a.id.cmp(&b.id));

        let mut sink = MemorySink::new(self.config.build.manifest.as_str());
        write_outputs(&cx, transformed, &mut sink, &mut report);
        Ok((report, Some(sink.into_store())))
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Group assets under the scanned source they descend from.
fn group_by_root(assets: &[Asset], scanned: &FxHashSet<String>) -> FxHashMap<String, Vec<Asset>> {
    let parents: FxHashMap<&str, Option<&str>> = assets
        .iter()
        .map(|a| (a.id.as_str(), a.parent.as_deref()))
        .collect();

    let mut groups: FxHashMap<String, Vec<Asset>> = FxHashMap::default();
    for asset in assets {
        let mut root = asset.id.as_str();
        while !scanned.contains(root) {
            match parents.get(root).copied().flatten() {
                Some(parent) if parent != root => root = parent,
                _ => break,
            }
        }
        if scanned.contains(root) {
            groups.entry(root.to_string()).or_default().push(asset.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use std::fs;
    use tempfile::TempDir;

    const RULES: &str = r#"
[[plugins]]
kind = "css"

[[rules]]
test = '\.css$'
use = ["style", "extract"]

[[rules]]
test = '\.js$'
use = ["script"]

[[rules]]
test = '\.html$'
use = [{ engine = "markup", options = { extract_styles = true } }]
"#;

    fn rebuilder(dir: &TempDir) -> Rebuilder {
        let mut config = test_parse_config(RULES);
        config.build.source = dir.path().to_path_buf();
        config.build.output = dir.path().join("out");
        Rebuilder::new(Arc::new(config))
    }

    #[test]
    fn test_rebuild_reuses_unchanged_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "let a = 1;").unwrap();
        fs::write(dir.path().join("b.css"), "b {\n  color: red;\n}\n").unwrap();
        let mut rebuilder = rebuilder(&dir);
        let cancel = CancelToken::new();

        let (report, store) = rebuilder.rebuild(&cancel).unwrap();
        assert!(report.is_success(), "{report}");
        assert_eq!(report.transformed, 2);
        assert_eq!(rebuilder.cached(), 2);
        let first = store.unwrap();
        assert!(first.contains("main.css"));

        fs::write(dir.path().join("a.js"), "let a = 2;").unwrap();
        let (report, store) = rebuilder.rebuild(&cancel).unwrap();
        assert_eq!(report.transformed, 1);
        let second = store.unwrap();
        assert_eq!(first.get("main.css"), second.get("main.css"));
        assert!(second.contains("manifest.json"));
    }

    #[test]
    fn test_rebuild_drops_removed_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "let a = 1;").unwrap();
        fs::write(dir.path().join("b.js"), "let b = 1;").unwrap();
        let mut rebuilder = rebuilder(&dir);
        let cancel = CancelToken::new();
        rebuilder.rebuild(&cancel).unwrap();

        fs::remove_file(dir.path().join("b.js")).unwrap();
        let (report, _) = rebuilder.rebuild(&cancel).unwrap();
        assert_eq!(report.assets, 1);
        assert_eq!(report.transformed, 0);
        assert_eq!(rebuilder.cached(), 1);
    }

    #[test]
    fn test_failed_sources_are_not_cached() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.js"), "let = ;").unwrap();
        let mut rebuilder = rebuilder(&dir);
        let cancel = CancelToken::new();

        let (report, _) = rebuilder.rebuild(&cancel).unwrap();
        assert!(!report.is_success());
        assert_eq!(rebuilder.cached(), 0);

        let (report, _) = rebuilder.rebuild(&cancel).unwrap();
        assert!(!report.is_success());
    }

    #[test]
    fn test_side_assets_cached_with_their_source() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("page.html"),
            "<html><head><style>p {\n  color: red;\n}</style></head><body></body></html>",
        )
        .unwrap();
        let mut rebuilder = rebuilder(&dir);
        let cancel = CancelToken::new();

        let (_, store) = rebuilder.rebuild(&cancel).unwrap();
        assert_eq!(rebuilder.cached(), 1);
        let first = store.unwrap();

        let (report, store) = rebuilder.rebuild(&cancel).unwrap();
        assert_eq!(report.transformed, 0);
        assert_eq!(store.unwrap().get("main.css"), first.get("main.css"));
    }

    #[test]
    fn test_cancelled_rebuild_has_no_store() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "1").unwrap();
        let mut rebuilder = rebuilder(&dir);
        let cancel = CancelToken::new();
        cancel.cancel();

        let (report, store) = rebuilder.rebuild(&cancel).unwrap();
        assert!(store.is_none());
        assert!(!report.is_success());
        assert_eq!(rebuilder.cached(), 0);
    }
}
