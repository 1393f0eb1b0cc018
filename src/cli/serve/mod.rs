//! Development server.
//!
//! Builds into memory, serves the `ArtifactStore` snapshot and, with
//! `watch`, swaps in a fresh store after each debounced rebuild. Nothing is
//! written to the output directory.

mod debouncer;
mod rebuild;
mod response;
mod watch;

pub use rebuild::Rebuilder;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::net::{IpAddr, SocketAddr};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use tiny_http::Server;

use crate::{
    artifact::ArtifactStore,
    config::KilnConfig,
    core::{CancelToken, register_server},
    debug, log,
};
use watch::SourceWatcher;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Request worker threads.
const REQUEST_THREADS: usize = 4;

/// `kiln serve`: initial build, then serve until Ctrl+C.
pub fn serve_project(config: Arc<KilnConfig>, cancel: CancelToken) -> Result<()> {
    let serve = &config.serve;
    let source = config.source_dir();

    // Watcher first: edits made during the initial build still trigger a pass.
    let watcher = if serve.watch {
        match SourceWatcher::new(&source) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log!("warning"; "cannot watch `{}`: {e}", source.display());
                None
            }
        }
    } else {
        None
    };

    let mut rebuilder = Rebuilder::new(Arc::clone(&config));
    let (report, store) = rebuilder.rebuild(&cancel)?;
    report.print();
    let Some(store) = store else {
        log!("serve"; "cancelled before the first build finished");
        return Ok(());
    };
    log!("build"; "{}", report);
    debug!("serve"; "{} files in memory", store.len());
    let store = Arc::new(ArcSwap::from_pointee(store));

    let (server, addr) = bind_with_retry(serve.interface, serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    let url = format!("http://{addr}");
    log!("serve"; "{url}");
    if serve.open {
        open_browser(&url);
    }

    let watch_handle: Option<JoinHandle<()>> =
        watcher.map(|w| w.spawn(rebuilder, Arc::clone(&store), cancel.clone()));

    run_request_loop(&server, &store, serve.compress)?;

    cancel.cancel();
    if let Some(handle) = watch_handle {
        let _ = handle.join();
    }
    Ok(())
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map_or_else(String::new, |e| e.to_string())
    ))
}

fn run_request_loop(server: &Server, store: &Arc<ArcSwap<ArtifactStore>>, compress: bool) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("Failed to create request thread pool")?;

    for request in server.incoming_requests() {
        let snapshot = store.load_full();
        pool.spawn(move || {
            debug!("serve"; "{} {}", request.method(), request.url());
            if let Err(e) = response::respond(request, &snapshot, compress) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

const NO_ARGS: &[&str] = &[];

/// Platform opener and its leading arguments.
fn opener() -> Option<(&'static str, &'static [&'static str])> {
    if cfg!(target_os = "macos") {
        Some(("open", NO_ARGS))
    } else if cfg!(target_os = "windows") {
        Some(("cmd", &["/C", "start", ""]))
    } else if which::which("xdg-open").is_ok() {
        Some(("xdg-open", NO_ARGS))
    } else if which::which("gio").is_ok() {
        Some(("gio", &["open"]))
    } else {
        None
    }
}

fn open_browser(url: &str) {
    let Some((program, args)) = opener() else {
        log!("serve"; "no browser opener found, visit {url}");
        return;
    };
    let spawned = Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = spawned {
        log!("serve"; "failed to open browser with `{program}`: {e}");
    }
}
