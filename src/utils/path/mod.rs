//! Path utilities for source scanning and asset identifiers.
//!
//! An asset identifier is the file's path relative to the source root,
//! always `/`-separated, never starting with `/`.

use jwalk::WalkDir;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::log;

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Collect all files under `dir` recursively, sorted.
pub fn collect_all_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(readable)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Walk entry, or `None` after warning that it was skipped.
fn readable<T, E: fmt::Display>(entry: Result<T, E>) -> Option<T> {
    entry
        .inspect_err(|e| log!("warning"; "skipping unreadable entry: {e}"))
        .ok()
}

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first, then falls back to joining with cwd.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Asset identifier of `path` relative to `root`.
pub fn asset_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Resolve a relative reference (`../img/a.png`) against the directory of
/// `base` id. Returns `None` for URLs, `data:` URIs, or references climbing
/// above the source root.
pub fn resolve_reference(base: &str, reference: &str) -> Option<String> {
    let reference = reference.split(['?', '#']).next()?.trim();
    if reference.is_empty() || reference.contains("://") || reference.starts_with("data:") {
        return None;
    }
    if reference.starts_with("//") {
        return None;
    }

    if let Some(abs) = reference.strip_prefix('/') {
        return normalize_segments(Vec::new(), abs);
    }

    let mut stack: Vec<&str> = base.split('/').collect();
    stack.pop(); // file name of base
    normalize_segments(stack, reference)
}

fn normalize_segments<'a>(mut stack: Vec<&'a str>, reference: &'a str) -> Option<String> {
    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            s => stack.push(s),
        }
    }
    (!stack.is_empty()).then(|| stack.join("/"))
}

/// Split an identifier into `(dir/, stem, ext)`.
///
/// `dir` keeps its trailing slash (empty at the root) so it can be used as a
/// `[path]` prefix directly.
pub fn split_id(id: &str) -> (&str, &str, &str) {
    let (dir, file) = match id.rfind('/') {
        Some(i) => (&id[..=i], &id[i + 1..]),
        None => ("", id),
    };
    match file.rfind('.') {
        Some(i) if i > 0 => (dir, &file[..i], &file[i + 1..]),
        _ => (dir, file, ""),
    }
}

/// Relative URL from output file `from` to output file `to`.
///
/// `relative_url("pages/a.html", "img/b.png")` → `"../img/b.png"`
pub fn relative_url(from: &str, to: &str) -> String {
    let from_dirs: Vec<&str> = from.split('/').collect();
    let from_dirs = &from_dirs[..from_dirs.len() - 1];
    let to_parts: Vec<&str> = to.split('/').collect();

    let common = from_dirs
        .iter()
        .zip(&to_parts[..to_parts.len() - 1])
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from_dirs.len() - common];
    parts.extend(&to_parts[common..]);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_collect_and_ids() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/a.css"), "a{}").unwrap();
        fs::write(dir.path().join("index.js"), "1").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();

        let files = collect_all_files(dir.path());
        let ids: Vec<_> = files
            .iter()
            .filter_map(|p| asset_id(dir.path(), p))
            .collect();
        assert_eq!(ids, vec!["css/a.css", "index.js"]);
    }

    #[test]
    fn test_readable_skips_errors() {
        assert_eq!(readable(Ok::<_, std::io::Error>(1)), Some(1));
        assert_eq!(readable(Err::<u8, _>(std::io::Error::other("permission denied"))), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_dir_keeps_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("hidden.css"), "a{}").unwrap();
        fs::write(dir.path().join("index.js"), "1").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let files = collect_all_files(dir.path());
        let still_readable = fs::read_dir(&locked).is_ok();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let ids: Vec<_> = files.iter().filter_map(|p| asset_id(dir.path(), p)).collect();
        if still_readable {
            // privileged users bypass the mode bits
            assert_eq!(ids, vec!["index.js", "locked/hidden.css"]);
        } else {
            assert_eq!(ids, vec!["index.js"]);
        }
    }

    #[test]
    fn test_collect_missing_dir() {
        assert!(collect_all_files(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(
            resolve_reference("pages/about.html", "../img/a.png?v=1").as_deref(),
            Some("img/a.png")
        );
        assert_eq!(
            resolve_reference("index.html", "./logo.png").as_deref(),
            Some("logo.png")
        );
        assert_eq!(
            resolve_reference("pages/x.html", "/img/b.gif").as_deref(),
            Some("img/b.gif")
        );
        assert_eq!(resolve_reference("index.html", "../escape.png"), None);
        assert_eq!(resolve_reference("index.html", "https://cdn/x.png"), None);
        assert_eq!(resolve_reference("index.html", "//cdn/x.png"), None);
        assert_eq!(resolve_reference("index.html", "data:image/png;base64,AA"), None);
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(relative_url("index.html", "img/a.png"), "img/a.png");
        assert_eq!(relative_url("pages/a.html", "img/b.png"), "../img/b.png");
        assert_eq!(relative_url("pages/a.html", "pages/c.css"), "c.css");
        assert_eq!(relative_url("a/b/c.html", "a/x.js"), "../x.js");
        assert_eq!(relative_url("a/b.html", "main.css"), "../main.css");
    }

    #[test]
    fn test_split_id() {
        assert_eq!(split_id("img/logo.png"), ("img/", "logo", "png"));
        assert_eq!(split_id("a.b.css"), ("", "a.b", "css"));
        assert_eq!(split_id("LICENSE"), ("", "LICENSE", ""));
        assert_eq!(split_id("dir/.env"), ("dir/", ".env", ""));
    }
}
