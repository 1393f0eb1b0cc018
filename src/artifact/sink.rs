//! Artifact destinations: the output directory or an in-memory store.

use rustc_hash::FxHashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::Artifact;
use crate::core::BuildManifest;
use crate::pipeline::Issue;

pub trait ArtifactSink {
    fn write(&mut self, artifact: &Artifact) -> io::Result<()>;

    /// Called once, after every artifact (hooks included) is written.
    fn commit(&mut self, manifest: &BuildManifest) -> io::Result<()>;
}

/// Write `artifacts`, collecting failures instead of stopping at the first.
pub fn write_artifacts(sink: &mut dyn ArtifactSink, artifacts: &[Artifact]) -> Vec<Issue> {
    artifacts
        .iter()
        .filter_map(|artifact| {
            sink.write(artifact).err().map(|e| {
                Issue::new(&artifact.source, None, format!("failed to write `{}`: {e}", artifact.path))
            })
        })
        .collect()
}

// ============================================================================
// Disk
// ============================================================================

/// Writes under the output directory, each file via tempfile + rename.
pub struct DiskSink {
    root: PathBuf,
    manifest_name: String,
}

/// Replace `path` atomically: readers see the old or the new file, never a
/// partial one.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(content)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl DiskSink {
    /// With `clean`, the output directory is removed first.
    pub fn new(root: impl Into<PathBuf>, manifest_name: impl Into<String>, clean: bool) -> io::Result<Self> {
        let root = root.into();
        if clean && root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            manifest_name: manifest_name.into(),
        })
    }
}

impl ArtifactSink for DiskSink {
    fn write(&mut self, artifact: &Artifact) -> io::Result<()> {
        atomic_write(&self.root.join(&artifact.path), &artifact.content)
    }

    fn commit(&mut self, manifest: &BuildManifest) -> io::Result<()> {
        let json = manifest.to_json().map_err(io::Error::other)?;
        atomic_write(&self.root.join(&self.manifest_name), json.as_bytes())
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Output path → content, served by the dev server.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    files: FxHashMap<String, Vec<u8>>,
}

impl ArtifactStore {
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Never touches disk.
#[derive(Debug)]
pub struct MemorySink {
    store: ArtifactStore,
    manifest_name: String,
}

impl MemorySink {
    pub fn new(manifest_name: impl Into<String>) -> Self {
        Self {
            store: ArtifactStore::default(),
            manifest_name: manifest_name.into(),
        }
    }

    pub fn into_store(self) -> ArtifactStore {
        self.store
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, artifact: &Artifact) -> io::Result<()> {
        self.store
            .files
            .insert(artifact.path.clone(), artifact.content.clone());
        Ok(())
    }

    fn commit(&mut self, manifest: &BuildManifest) -> io::Result<()> {
        let json = manifest.to_json().map_err(io::Error::other)?;
        self.store
            .files
            .insert(self.manifest_name.clone(), json.into_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AssetKind;
    use tempfile::TempDir;

    #[test]
    fn test_disk_sink_writes_nested() {
        let dir = TempDir::new().unwrap();
        let mut sink = DiskSink::new(dir.path().join("build"), "manifest.json", false).unwrap();
        let issues = write_artifacts(
            &mut sink,
            &[
                Artifact::new("css/a.css", "a{}", "a.css"),
                Artifact::new("index.html", "<p>", "index.html"),
            ],
        );
        assert!(issues.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("build/css/a.css")).unwrap(), "a{}");

        let mut manifest = BuildManifest::new();
        manifest.register("a.css", AssetKind::Style, None);
        sink.commit(&manifest).unwrap();
        let json = fs::read_to_string(dir.path().join("build/manifest.json")).unwrap();
        assert!(json.contains("a.css"));
    }

    #[test]
    fn test_disk_sink_clean() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("build");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.js"), "old").unwrap();

        DiskSink::new(&out, "manifest.json", false).unwrap();
        assert!(out.join("stale.js").exists());
        DiskSink::new(&out, "manifest.json", true).unwrap();
        assert!(!out.join("stale.js").exists());
        assert!(out.is_dir());
    }

    #[test]
    fn test_overwrite_is_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        atomic_write(&path, b"a much longer original").unwrap();
        atomic_write(&path, b"short").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new("manifest.json");
        sink.write(&Artifact::new("a.js", "1", "a.js")).unwrap();
        sink.commit(&BuildManifest::new()).unwrap();
        let store = sink.into_store();
        assert_eq!(store.get("a.js"), Some(&b"1"[..]));
        assert_eq!(store.get("manifest.json"), Some(&b"{}"[..]));
        assert_eq!(store.len(), 2);
    }
}
