//! Request → artifact lookup and HTTP responses.

use anyhow::Result;
use flate2::{Compression, write::GzEncoder};
use std::io::{self, Write};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::artifact::ArtifactStore;
use crate::utils::mime::{self, types::PLAIN};

/// Map a request URL to a stored artifact path.
///
/// `/` and directory URLs resolve to their `index.html`.
pub fn resolve(store: &ArtifactStore, url: &str) -> Option<String> {
    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }
    if clean.is_empty() {
        return store.contains("index.html").then(|| "index.html".to_string());
    }
    if store.contains(&clean) {
        return Some(clean);
    }
    let index = format!("{clean}/index.html");
    store.contains(&index).then_some(index)
}

/// Decode, strip query and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

/// Serve `path` from `store`, or 404.
pub fn respond(request: Request, store: &ArtifactStore, compress: bool) -> Result<()> {
    let Some(path) = resolve(store, request.url()) else {
        return respond_not_found(request);
    };
    let Some(body) = store.get(&path) else {
        return respond_not_found(request);
    };

    let content_type = mime::from_path(&path);
    let gzip = compress && mime::is_compressible(content_type) && accepts_gzip(&request);

    if is_head_request(&request) {
        let mut response = Response::empty(StatusCode(200)).with_header(make_header("Content-Type", content_type));
        if gzip {
            response.add_header(make_header("Content-Encoding", "gzip"));
        }
        request.respond(response)?;
        return Ok(());
    }

    if gzip {
        let body = gzip_bytes(body)?;
        let response = Response::from_data(body)
            .with_header(make_header("Content-Type", content_type))
            .with_header(make_header("Content-Encoding", "gzip"));
        request.respond(response)?;
        return Ok(());
    }

    send_body(request, 200, content_type, body.to_vec())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        let response = Response::empty(StatusCode(404)).with_header(make_header("Content-Type", PLAIN));
        request.respond(response)?;
        return Ok(());
    }
    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

fn accepts_gzip(request: &Request) -> bool {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Accept-Encoding"))
        .is_some_and(|h| accepts_gzip_value(h.value.as_str()))
}

/// `gzip` (or `*`) listed with a non-zero quality.
fn accepts_gzip_value(value: &str) -> bool {
    value.split(',').any(|coding| {
        let mut parts = coding.split(';').map(str::trim);
        let name = parts.next().unwrap_or("");
        let refused = parts.any(|p| quality(p).is_some_and(|q| q <= 0.0));
        (name.eq_ignore_ascii_case("gzip") || name == "*") && !refused
    })
}

/// Weight of a `q=<value>` parameter; anything else is `None`.
fn quality(param: &str) -> Option<f32> {
    let (key, value) = param.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("q") {
        return None;
    }
    value.trim().parse().ok()
}

fn gzip_bytes(body: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_body(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ArtifactSink, MemorySink};
    use crate::core::BuildManifest;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn store(paths: &[&str]) -> ArtifactStore {
        let mut sink = MemorySink::new("manifest.json");
        for path in paths {
            sink.write(&Artifact::new(*path, b"x".to_vec(), "test")).unwrap();
        }
        sink.commit(&BuildManifest::new()).unwrap();
        sink.into_store()
    }

    #[test]
    fn test_resolve_index_and_directories() {
        let store = store(&["index.html", "docs/index.html", "css/main.css", "a b.txt"]);
        assert_eq!(resolve(&store, "/").as_deref(), Some("index.html"));
        assert_eq!(resolve(&store, "/docs/").as_deref(), Some("docs/index.html"));
        assert_eq!(resolve(&store, "/docs").as_deref(), Some("docs/index.html"));
        assert_eq!(resolve(&store, "/css/main.css?v=2").as_deref(), Some("css/main.css"));
        assert_eq!(resolve(&store, "/a%20b.txt").as_deref(), Some("a b.txt"));
        assert_eq!(resolve(&store, "/manifest.json").as_deref(), Some("manifest.json"));
    }

    #[test]
    fn test_resolve_rejects_missing_and_traversal() {
        let store = store(&["index.html"]);
        assert_eq!(resolve(&store, "/missing.js"), None);
        assert_eq!(resolve(&store, "/../index.html"), None);
        assert_eq!(resolve(&store, "/%2e%2e/index.html"), None);
        assert_eq!(resolve(&ArtifactStore::default(), "/"), None);
    }

    #[test]
    fn test_accepts_gzip_value() {
        assert!(accepts_gzip_value("gzip, deflate, br"));
        assert!(accepts_gzip_value("br;q=1.0, GZIP;q=0.5"));
        assert!(accepts_gzip_value("*"));
        assert!(!accepts_gzip_value("gzip;q=0"));
        assert!(!accepts_gzip_value("gzip;q=0.0"));
        assert!(!accepts_gzip_value("gzip; q = 0.00, br"));
        assert!(!accepts_gzip_value("gzip;Q=0.000"));
        assert!(accepts_gzip_value("gzip;q=0.001"));
        assert!(accepts_gzip_value("gzip;level=0"));
        assert!(!accepts_gzip_value("deflate, br"));
        assert!(!accepts_gzip_value(""));
    }

    #[test]
    fn test_gzip_bytes_decodes() {
        let body = "body { color: red; }\n".repeat(50);
        let compressed = gzip_bytes(body.as_bytes()).unwrap();
        assert!(compressed.len() < body.len());

        let mut decoded = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, body);
    }
}
