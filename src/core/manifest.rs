//! Build manifest: source identifier → final outputs.
//!
//! Keys are sorted (`BTreeMap`) and nothing time-dependent is recorded, so an
//! unchanged build serialises to identical bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AssetKind;

/// Where one piece of an asset ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputRef {
    /// A written file, relative to the output root.
    File { path: String, size: u64, hash: String },
    /// Embedded as a `data:` URI by whoever references it.
    Inline { uri: String, size: u64 },
    /// Merged into a consolidated artifact.
    Bundled { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub kind: AssetKind,
    #[serde(default)]
    pub outputs: Vec<OutputRef>,
    /// Sub-assets embedded or linked by this one (markup).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Asset whose step produced this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ManifestEntry {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            outputs: Vec::new(),
            references: Vec::new(),
            parent: None,
        }
    }

    /// First written file, if any.
    pub fn file(&self) -> Option<&str> {
        self.outputs.iter().find_map(|o| match o {
            OutputRef::File { path, .. } => Some(path.as_str()),
            _ => None,
        })
    }

    pub fn inline(&self) -> Option<&str> {
        self.outputs.iter().find_map(|o| match o {
            OutputRef::Inline { uri, .. } => Some(uri.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl BuildManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` (idempotent; keeps outputs already recorded).
    pub fn register(&mut self, id: &str, kind: AssetKind, parent: Option<&str>) {
        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| ManifestEntry::new(kind));
        entry.kind = kind;
        if let Some(parent) = parent {
            entry.parent = Some(parent.to_string());
        }
    }

    /// Append an output; registers the entry as `Other` if unseen.
    pub fn add_output(&mut self, id: &str, output: OutputRef) {
        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| ManifestEntry::new(AssetKind::Other));
        if !entry.outputs.contains(&output) {
            entry.outputs.push(output);
        }
    }

    pub fn set_references(&mut self, id: &str, references: Vec<String>) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.references = references;
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<ManifestEntry> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Written files of the given kind, in key order.
    pub fn files_of_kind(&self, kind: AssetKind) -> Vec<&str> {
        self.entries
            .values()
            .filter(|e| e.kind == kind)
            .flat_map(|e| e.outputs.iter())
            .filter_map(|o| match o {
                OutputRef::File { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
