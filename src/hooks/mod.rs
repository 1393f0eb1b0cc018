//! Post-build plugin hooks.
//!
//! Hooks run once, after every asset is finalized, strictly in `[[plugins]]`
//! order. Each reads the manifest and artifact set and returns new artifacts
//! only; its outputs are registered under `@<kind>` so later hooks see them.
//!
//! | Hook   | Produces                                        |
//! |--------|-------------------------------------------------|
//! | `css`  | one stylesheet from every extracted chunk       |
//! | `html` | the entry document with style/script injection  |
//! | `sw`   | precache manifest plus service worker installer |

mod css;
mod html;
mod sw;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::artifact::{Artifact, ArtifactSet};
use crate::config::{PluginConfig, PluginKind};
use crate::core::BuildContext;
use crate::debug;
use crate::pipeline::Issue;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("template `{0}` was not built")]
    MissingTemplate(String),

    #[error("consolidated stylesheet failed to compile: {0}")]
    Style(String),

    #[error("invalid exclude pattern")]
    Pattern(#[from] regex::Error),

    #[error("failed to serialize precache entries")]
    Json(#[from] serde_json::Error),
}

pub trait Hook {
    fn kind(&self) -> PluginKind;

    fn run(&self, cx: &BuildContext, set: &ArtifactSet) -> Result<Vec<Artifact>, HookError>;
}

fn hook_for(plugin: &PluginConfig) -> Box<dyn Hook + '_> {
    match plugin {
        PluginConfig::Html(config) => Box::new(html::HtmlHook(config)),
        PluginConfig::Css(config) => Box::new(css::CssHook(config)),
        PluginConfig::Sw(config) => Box::new(sw::SwHook(config)),
    }
}

#[derive(Debug, Default)]
pub struct HookRun {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<Issue>,
}

/// Run every configured hook. A failing hook is reported and skipped; the
/// rest still run.
pub fn run_hooks(cx: &BuildContext, set: &ArtifactSet) -> HookRun {
    let mut run = HookRun::default();
    let mut claimed: FxHashSet<String> = set.artifacts.iter().map(|a| a.path.clone()).collect();

    for plugin in &cx.config.plugins {
        let hook = hook_for(plugin);
        let key = format!("@{}", hook.kind());

        let artifacts = match hook.run(cx, set) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                let message = match std::error::Error::source(&e) {
                    Some(source) => format!("{e}: {source}"),
                    None => e.to_string(),
                };
                run.failures.push(Issue::new(&key, None, message));
                continue;
            }
        };
        if let Some(taken) = artifacts.iter().find(|a| claimed.contains(&a.path)) {
            run.failures.push(Issue::new(
                &key,
                None,
                format!("output path `{}` is already produced by the build", taken.path),
            ));
            continue;
        }

        let mut manifest = cx.manifest();
        manifest.register(&key, hook.kind().asset_kind(), None);
        for artifact in &artifacts {
            debug!("hook"; "{} -> {}", key, artifact.path);
            manifest.add_output(&key, artifact.output_ref());
            claimed.insert(artifact.path.clone());
        }
        drop(manifest);
        run.artifacts.extend(artifacts);
    }
    run
}
