//! Offline cache: precache manifest plus service worker installer.

use regex::Regex;
use serde::Serialize;

use super::{Hook, HookError};
use crate::artifact::{Artifact, ArtifactSet, render};
use crate::config::{PluginKind, SwPluginConfig};
use crate::core::{BuildContext, OutputRef};
use crate::embed::sw::{PRECACHE_MANIFEST_JS, PrecacheVars, SERVICE_WORKER_JS, ServiceWorkerVars};
use crate::utils::hash::ContentHash;

#[derive(Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct PrecacheEntry {
    url: String,
    revision: String,
}

pub struct SwHook<'a>(pub &'a SwPluginConfig);

impl SwHook<'_> {
    /// Every written file in the manifest, minus excluded paths.
    fn entries(&self, cx: &BuildContext) -> Result<Vec<PrecacheEntry>, HookError> {
        let excludes = self
            .0
            .exclude
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let manifest = cx.manifest();
        let mut entries: Vec<_> = manifest
            .entries()
            .flat_map(|(_, entry)| &entry.outputs)
            .filter_map(|output| match output {
                OutputRef::File { path, hash, .. } => Some(PrecacheEntry {
                    url: path.clone(),
                    revision: hash.clone(),
                }),
                _ => None,
            })
            .filter(|entry| !excludes.iter().any(|re| re.is_match(&entry.url)))
            .collect();
        entries.sort();
        entries.dedup();
        Ok(entries)
    }
}

impl Hook for SwHook<'_> {
    fn kind(&self) -> PluginKind {
        PluginKind::Sw
    }

    fn run(&self, cx: &BuildContext, _set: &ArtifactSet) -> Result<Vec<Artifact>, HookError> {
        let entries = serde_json::to_string_pretty(&self.entries(cx)?)?;
        let precache = PRECACHE_MANIFEST_JS.render(&PrecacheVars { entries });
        let hash = ContentHash::of(&precache);
        let precache_path = render(&self.0.precache, "precache-manifest.js", "js", hash);

        let worker = SERVICE_WORKER_JS.render(&ServiceWorkerVars {
            precache_manifest: precache_path.clone(),
            cache_id: hash.short(8),
            skip_waiting: self.0.skip_waiting,
            claim_clients: self.0.claim_clients,
        });

        Ok(vec![
            Artifact::new(precache_path, precache, "@sw"),
            Artifact::new(self.0.filename.clone(), worker, "@sw"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetKind;
    use crate::hooks::tests::context;

    fn file(path: &str, hash: &str) -> OutputRef {
        OutputRef::File {
            path: path.into(),
            size: 1,
            hash: hash.into(),
        }
    }

    #[test]
    fn test_precache_lists_files() {
        let cx = context("");
        {
            let mut manifest = cx.manifest();
            manifest.register("index.js", AssetKind::Script, None);
            manifest.add_output("index.js", file("index.aaaa.js", "aaaa"));
            manifest.add_output("index.js", file("index.aaaa.js.map", "bbbb"));
            manifest.register("a.css", AssetKind::Style, None);
            manifest.add_output("a.css", OutputRef::Bundled { path: "main.css".into() });
            manifest.register("@css", AssetKind::Style, None);
            manifest.add_output("@css", file("main.css", "cccc"));
        }

        let config = SwPluginConfig::default();
        let out = SwHook(&config).run(&cx, &ArtifactSet::default()).unwrap();
        assert_eq!(out.len(), 2);

        let precache = std::str::from_utf8(&out[0].content).unwrap();
        assert!(out[0].path.starts_with("precache-manifest."));
        assert!(out[0].path.ends_with(".js"));
        assert!(precache.contains(r#""url": "index.aaaa.js""#));
        assert!(precache.contains(r#""revision": "cccc""#));
        assert!(!precache.contains(".map"));
        assert_eq!(precache.matches("main.css").count(), 1);

        let worker = std::str::from_utf8(&out[1].content).unwrap();
        assert_eq!(out[1].path, "service-worker.js");
        assert!(worker.contains(&format!("importScripts(\"{}\")", out[0].path)));
        assert!(worker.contains("if (true)"));
    }

    #[test]
    fn test_precache_is_deterministic() {
        let cx = context("");
        let config = SwPluginConfig {
            claim_clients: false,
            ..Default::default()
        };
        let first = SwHook(&config).run(&cx, &ArtifactSet::default()).unwrap();
        let second = SwHook(&config).run(&cx, &ArtifactSet::default()).unwrap();
        assert_eq!(first, second);
        assert!(std::str::from_utf8(&first[1].content).unwrap().contains("if (false)"));
    }
}
