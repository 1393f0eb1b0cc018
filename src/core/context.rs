//! Per-build context.
//!
//! A `BuildContext` is created when a build starts and dropped when it ends.
//! Everything a build reads or appends to lives here; there is no ambient
//! global build state.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::BuildManifest;
use crate::config::{ConfigError, KilnConfig};
use crate::rules::RuleSet;
use crate::transform::{Registry, StepContext};

/// Cooperative cancellation flag, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Relaxed: a worker may finish one more step before it sees the flag.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct BuildContext {
    pub config: Arc<KilnConfig>,
    pub registry: Arc<Registry>,
    pub rules: RuleSet,
    manifest: Mutex<BuildManifest>,
    cancel: CancelToken,
}

impl BuildContext {
    /// Compile the rule set against `registry`; rule problems surface here,
    /// before any asset is read.
    pub fn new(config: Arc<KilnConfig>, registry: Arc<Registry>) -> Result<Self, ConfigError> {
        let rules = RuleSet::compile(&config.rules, &config.plugins, &registry)?;
        Ok(Self {
            config,
            registry,
            rules,
            manifest: Mutex::new(BuildManifest::new()),
            cancel: CancelToken::new(),
        })
    }

    /// Share an outer token (Ctrl+C handler, serve loop).
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn manifest(&self) -> MutexGuard<'_, BuildManifest> {
        self.manifest.lock()
    }

    /// Read-only view handed to every step.
    pub fn step_context(&self) -> StepContext {
        let build = &self.config.build;
        StepContext {
            source_root: self.config.source_dir(),
            inline_limit: build.inline_limit,
            timeout: build.step_timeout_ms.map(Duration::from_millis),
            strict: build.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use crate::core::AssetKind;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_context_holds_manifest() {
        let config = test_parse_config(
            r#"
[[rules]]
test = '\.js$'
use = ["script"]
"#,
        );
        let cx = BuildContext::new(Arc::new(config), Arc::new(Registry::builtin())).unwrap();
        cx.manifest().register("a.js", AssetKind::Script, None);
        assert_eq!(cx.step_context().inline_limit, 8192);
        assert_eq!(cx.manifest().len(), 1);
    }

    #[test]
    fn test_context_rejects_bad_rules() {
        let config = test_parse_config(
            r#"
[[rules]]
test = '('
use = ["script"]
"#,
        );
        assert!(BuildContext::new(Arc::new(config), Arc::new(Registry::builtin())).is_err());
    }
}
