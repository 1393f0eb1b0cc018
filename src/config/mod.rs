//! Project configuration management for `kiln.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── rules      # [[rules]]
//! │   ├── plugins    # [[plugins]]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # KilnConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[build]`     | Source/output roots, name template, limits       |
//! | `[[rules]]`   | Ordered rules: `test`, `exclude`, `use`          |
//! | `[[plugins]]` | Post-build hooks, run in declaration order       |
//! | `[serve]`     | Development server (interface, port, watch)      |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    BuildSectionConfig, CssPluginConfig, HtmlMinifyConfig, HtmlPluginConfig, PluginConfig,
    PluginKind, RuleConfig, ServeConfig, SwPluginConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{BuildArgs, Cli, Commands},
    log,
};
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KilnConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Ordered matching rules
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Post-build hooks, in execution order
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl KilnConfig {
    /// Load configuration for `cli`, searching upward from cwd.
    ///
    /// The project root is the config file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Self::load_in(&cwd, cli)
    }

    fn load_in(cwd: &Path, cli: &Cli) -> Result<Self> {
        let config_path = find_config_file(cwd, &cli.config)
            .ok_or_else(|| ConfigError::NotFound(cli.config.clone()))?;

        let mut config = Self::from_path(&config_path)?;
        config.config_path = crate::utils::path::normalize_path(&config_path);
        config.finalize(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Resolve paths against the project root and apply CLI overrides.
    fn finalize(&mut self, cli: &Cli) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.root = crate::utils::path::normalize_path(&root);

        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        self.build.source = crate::utils::path::normalize_path(&self.root.join(&self.build.source));
        self.build.output = crate::utils::path::normalize_path(&self.root.join(&self.build.output));

        self.apply_command_options(cli);
    }

    /// Source root that assets are scanned from.
    pub fn source_dir(&self) -> PathBuf {
        self.build.source.clone()
    }

    pub fn output_dir(&self) -> &Path {
        &self.build.output
    }

    pub fn plugin(&self, kind: PluginKind) -> Option<&PluginConfig> {
        self.plugins.iter().find(|p| p.kind() == kind)
    }

    pub fn html_plugin(&self) -> Option<&HtmlPluginConfig> {
        match self.plugin(PluginKind::Html)? {
            PluginConfig::Html(html) => Some(html),
            _ => None,
        }
    }

    /// Output path of the consolidated stylesheet, when the css hook is on.
    pub fn css_filename(&self) -> Option<&str> {
        self.plugin(PluginKind::Css).map(PluginConfig::filename)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Serve {
                build_args,
                interface,
                port,
                open,
                compress,
                watch,
            } => {
                self.apply_build_args(build_args);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.open, open.as_ref());
                Self::update_option(&mut self.serve.compress, compress.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::Rules { .. } => {}
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);
        // Flags only ever switch these on
        self.build.clean |= args.clean;
        self.build.strict |= args.strict;
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Collect every section problem and report them together.
    ///
    /// Rule problems are reported by `RuleSet::compile`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&mut diag);
        self.validate_paths(&mut diag);

        let mut seen = FxHashSet::default();
        for (i, plugin) in self.plugins.iter().enumerate() {
            if !seen.insert(plugin.kind()) {
                diag.error(
                    FieldPath::indexed("plugins", i, "kind"),
                    format!("`{}` plugin declared more than once", plugin.kind()),
                );
            }
            plugin.validate(i, &mut diag);
        }

        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)
    }

    fn validate_paths(&self, diag: &mut ConfigDiagnostics) {
        let (source, output) = (&self.build.source, &self.build.output);
        if output.starts_with(source) {
            diag.error_with_hint(
                FieldPath::new("build.output"),
                format!("output `{}` is inside the source root", output.display()),
                "artifacts would be scanned as sources on the next build",
            );
        } else if source.starts_with(output) {
            diag.error(
                FieldPath::new("build.output"),
                format!("source root `{}` is inside the output directory", source.display()),
            );
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text without path resolution or validation.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> KilnConfig {
    let (parsed, ignored) = KilnConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
