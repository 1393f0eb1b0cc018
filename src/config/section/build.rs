//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "src"                          # Scanned recursively for assets
//! output = "build"                        # Artifacts and manifest land here
//! filename = "[path][name].[hash:8].[ext]" # Default artifact name template
//! inline_limit = 8192                     # `url` engine default limit (bytes)
//! strict = false                          # Advisory failures fail the asset
//! clean = false                           # Remove output before writing
//! step_timeout_ms = 30000                 # Per-step deadline (unset = none)
//! manifest = "manifest.json"              # Manifest file name
//! ```

use crate::artifact::validate_template;
use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Source root, relative to the project root.
    pub source: PathBuf,

    /// Output directory, relative to the project root.
    pub output: PathBuf,

    /// Name template for file artifacts without a rule or step override.
    pub filename: String,

    /// Default `url` engine limit in bytes. Assets of at most this size are inlined.
    pub inline_limit: u64,

    /// Escalate advisory step failures to required ones.
    pub strict: bool,

    /// Remove the output directory before writing.
    pub clean: bool,

    /// Deadline for a single transform step.
    pub step_timeout_ms: Option<u64>,

    /// Manifest file name inside the output directory.
    pub manifest: String,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: "src".into(),
            output: "build".into(),
            filename: "[path][name].[hash:8].[ext]".into(),
            inline_limit: 8 * 1024,
            strict: false,
            clean: false,
            step_timeout_ms: None,
            manifest: "manifest.json".into(),
        }
    }
}

impl BuildSectionConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Err(e) = validate_template(&self.filename) {
            diag.error(FieldPath::new("build.filename"), e);
        }
        if self.manifest.is_empty() || self.manifest.contains(['/', '\\']) {
            diag.error_with_hint(
                FieldPath::new("build.manifest"),
                format!("invalid manifest name `{}`", self.manifest),
                "use a plain file name such as `manifest.json`",
            );
        }
        if self.step_timeout_ms == Some(0) {
            diag.error(FieldPath::new("build.step_timeout_ms"), "timeout must be greater than zero");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_build_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.source.to_str(), Some("src"));
        assert_eq!(config.build.output.to_str(), Some("build"));
        assert_eq!(config.build.inline_limit, 8192);
        assert_eq!(config.build.manifest, "manifest.json");
        assert!(config.build.step_timeout_ms.is_none());
        assert!(!config.build.strict);
    }

    #[test]
    fn test_build_overrides() {
        let config = test_parse_config(
            "[build]\nsource = \"assets\"\ninline_limit = 1024\nstep_timeout_ms = 500\nstrict = true",
        );
        assert_eq!(config.build.source.to_str(), Some("assets"));
        assert_eq!(config.build.inline_limit, 1024);
        assert_eq!(config.build.step_timeout_ms, Some(500));
        assert!(config.build.strict);
    }

    #[test]
    fn test_build_validate() {
        let config = test_parse_config(
            "[build]\nfilename = \"[name].[bogus]\"\nmanifest = \"out/m.json\"\nstep_timeout_ms = 0",
        );
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&mut diag);
        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["build.filename", "build.manifest", "build.step_timeout_ms"]);
    }
}
