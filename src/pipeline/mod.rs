//! Pipeline executor: runs every asset's step chain.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ generation 0 (rayon, one task per asset)     │
//! │   scanned assets → resolve → steps           │
//! └──────────────────────┬───────────────────────┘
//!                        │ side assets with `reenter`
//! ┌──────────────────────▼───────────────────────┐
//! │ generation 1                                 │
//! │   side assets → resolve → steps              │
//! │   (their own side assets are never re-run)   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A required failure fails only its asset; the rest of the build goes on
//! and every failure is reported at the end.

mod run;

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::fmt;

use crate::core::{Asset, BuildContext, SideAsset};
use crate::logger::ProgressLine;

pub use run::AssetState;
use run::{AssetRun, run_asset};

/// Something reported against one asset (and maybe one step of it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    /// Engine of the step at fault.
    pub step: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn new(id: &str, step: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            step: step.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Some(step) => write!(f, "{} ({step}): {}", self.id, self.message),
            None => write!(f, "{}: {}", self.id, self.message),
        }
    }
}

/// Result of running every pipeline of a build.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Successfully transformed assets, sorted by id.
    pub transformed: Vec<Asset>,
    pub failures: Vec<Issue>,
    pub warnings: Vec<Issue>,
    /// Assets left unfinished because the build was cancelled.
    pub cancelled: Vec<String>,
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }

    fn absorb(&mut self, run: AssetRun) {
        self.warnings.extend(run.warnings);
        match run.state {
            AssetState::Transformed => self.transformed.push(run.asset),
            AssetState::Failed => self.failures.extend(run.failure),
            AssetState::Cancelled => self.cancelled.push(run.asset.id),
            state => unreachable!("pipeline stopped in {state:?}"),
        }
    }
}

/// Run all `assets` to completion (or cancellation).
pub fn execute(cx: &BuildContext, assets: Vec<Asset>, progress: Option<&ProgressLine>) -> Outcome {
    let mut outcome = Outcome::default();

    let mut first: Vec<AssetRun> = assets
        .into_par_iter()
        .map(|asset| run_asset(cx, asset, progress))
        .collect();

    let mut reentering: Vec<Asset> = Vec::new();
    let mut plain: Vec<Asset> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for run in &mut first {
        let parent = run.asset.id.clone();
        for side in std::mem::take(&mut run.side_assets) {
            if !seen.insert(side.id.clone()) {
                continue;
            }
            if side.reenter {
                reentering.push(side.into_asset(&parent, 1));
            } else {
                plain.push(side.into_asset(&parent, 1));
            }
        }
    }
    for run in first {
        outcome.absorb(run);
    }

    let second: Vec<AssetRun> = reentering
        .into_par_iter()
        .map(|asset| run_asset(cx, asset, None))
        .collect();

    for mut run in second {
        let parent = run.asset.id.clone();
        for side in std::mem::take(&mut run.side_assets) {
            if !seen.insert(side.id.clone()) {
                continue;
            }
            outcome.warnings.push(Issue::new(
                &parent,
                None,
                format!("side asset `{}` not re-entered (nested too deep)", side.id),
            ));
            plain.push(SideAsset { reenter: false, ..side }.into_asset(&parent, 2));
        }
        outcome.absorb(run);
    }

    {
        let mut manifest = cx.manifest();
        for asset in &plain {
            manifest.register(&asset.id, asset.kind, asset.parent.as_deref());
        }
    }
    outcome.transformed.extend(plain);

    outcome.transformed.sort_by(|a, b| a.id.cmp(&b.id));
    outcome.failures.sort_by(|a, b| a.id.cmp(&b.id));
    outcome.warnings.sort_by(|a, b| a.id.cmp(&b.id));
    outcome.cancelled.sort();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::core::{AssetKind, CancelToken, Emit};
    use crate::transform::{Options, Registry, StepContext, StepError, StepOutput, Transform};
    use std::sync::Arc;
    use std::time::Duration;

    fn context(toml: &str) -> BuildContext {
        context_with(toml, Registry::builtin())
    }

    fn context_with(toml: &str, registry: Registry) -> BuildContext {
        BuildContext::new(Arc::new(test_parse_config(toml)), Arc::new(registry)).unwrap()
    }

    const RULES: &str = r#"
[[plugins]]
kind = "css"

[[rules]]
test = '\.css$'
use = [{ engine = "style", options = { minify = true } }, "extract"]

[[rules]]
test = '\.js$'
use = ["lint", "script"]

[[rules]]
test = '\.html$'
use = [{ engine = "markup", options = { extract_styles = true } }]
"#;

    #[test]
    fn test_failure_is_isolated() {
        let cx = context(RULES);
        let assets = vec![
            Asset::new("broken.js", "let = ;"),
            Asset::new("ok.js", "let a = 1;"),
            Asset::new("a.css", "a {\n  color: red;\n}\n"),
        ];
        let outcome = execute(&cx, assets, None);

        let ids: Vec<_> = outcome.transformed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a.css", "ok.js"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "broken.js");
        assert_eq!(outcome.failures[0].step.as_deref(), Some("script"));
        // the advisory lint failure on the same asset is only a warning
        assert!(outcome.warnings.iter().any(|w| w.id == "broken.js"));
        assert!(cx.manifest().get("broken.js").is_none());
        assert!(cx.manifest().get("ok.js").is_some());
    }

    #[test]
    fn test_style_runs_before_extract() {
        let cx = context(RULES);
        let outcome = execute(&cx, vec![Asset::new("a.css", "a {\n  color: red;\n}\n")], None);
        let asset = &outcome.transformed[0];
        assert_eq!(asset.text().unwrap(), "a{color:red}");
        assert_eq!(asset.emit, Emit::Extracted);
        assert_eq!(asset.precedence, 0);
    }

    #[test]
    fn test_strict_escalates_advisory() {
        let cx = context(&format!("[build]\nstrict = true\n{RULES}"));
        let outcome = execute(&cx, vec![Asset::new("a.js", "debugger;")], None);
        assert!(outcome.transformed.is_empty());
        assert_eq!(outcome.failures[0].step.as_deref(), Some("lint"));
    }

    #[test]
    fn test_unmatched_asset_copied() {
        let cx = context(RULES);
        let outcome = execute(&cx, vec![Asset::new("fonts/a.woff2", vec![1, 2, 3])], None);
        let asset = &outcome.transformed[0];
        assert_eq!(asset.content, vec![1, 2, 3]);
        assert_eq!(asset.precedence, usize::MAX);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_side_asset_reenters_once() {
        let cx = context(RULES);
        let html = "<html><head><style>p {\n  color: red;\n}</style></head><body></body></html>";
        let outcome = execute(&cx, vec![Asset::new("index.html", html)], None);

        assert_eq!(outcome.transformed.len(), 2);
        let side = outcome
            .transformed
            .iter()
            .find(|a| a.kind == AssetKind::Style)
            .unwrap();
        assert_eq!(side.generation, 1);
        assert_eq!(side.parent.as_deref(), Some("index.html"));
        assert_eq!(side.emit, Emit::Extracted);
        assert_eq!(side.text().unwrap(), "p{color:red}");
        assert_eq!(
            cx.manifest().get(&side.id).unwrap().parent.as_deref(),
            Some("index.html")
        );
    }

    #[test]
    fn test_cancelled_between_steps() {
        let token = CancelToken::new();
        let cx = context(RULES).with_cancel(token.clone());
        token.cancel();
        let outcome = execute(&cx, vec![Asset::new("a.js", "1"), Asset::new("b.js", "2")], None);
        assert!(outcome.transformed.is_empty());
        assert_eq!(outcome.cancelled, vec!["a.js", "b.js"]);
        assert!(outcome.is_cancelled());
    }

    struct Sleepy;

    impl Transform for Sleepy {
        fn apply(
            &self,
            _asset: &mut Asset,
            _options: &Options,
            _cx: &StepContext,
        ) -> Result<StepOutput, StepError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(StepOutput::default())
        }
    }

    #[test]
    fn test_step_timeout() {
        let mut registry = Registry::builtin();
        registry.register("sleepy", Arc::new(Sleepy));
        let cx = context_with(
            r#"
[build]
step_timeout_ms = 50

[[rules]]
test = '\.txt$'
use = ["sleepy"]
"#,
            registry,
        );
        let outcome = execute(&cx, vec![Asset::new("a.txt", "x")], None);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].message.contains("timed out after 50ms"));
    }
}
