//! `[[plugins]]` array configuration.
//!
//! Hooks run once after every asset is written, in declaration order. Each
//! kind may appear at most once.
//!
//! ```toml
//! [[plugins]]
//! kind = "css"
//! filename = "main.css"
//!
//! [[plugins]]
//! kind = "html"
//! template = "index.html"
//! minify = { collapse_whitespace = true, remove_comments = true }
//!
//! [[plugins]]
//! kind = "sw"
//! claim_clients = true
//! skip_waiting = true
//! ```

use crate::artifact::validate_template;
use crate::config::{ConfigDiagnostics, FieldPath};
use crate::core::AssetKind;
use crate::transform::browser_targets;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Html,
    Css,
    Sw,
}

impl PluginKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Sw => "sw",
        }
    }

    /// Manifest kind of the hook's `@<kind>` entry.
    pub const fn asset_kind(self) -> AssetKind {
        match self {
            Self::Html => AssetKind::Markup,
            Self::Css => AssetKind::Style,
            Self::Sw => AssetKind::Other,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PluginConfig {
    Html(HtmlPluginConfig),
    Css(CssPluginConfig),
    Sw(SwPluginConfig),
}

impl PluginConfig {
    pub const fn kind(&self) -> PluginKind {
        match self {
            Self::Html(_) => PluginKind::Html,
            Self::Css(_) => PluginKind::Css,
            Self::Sw(_) => PluginKind::Sw,
        }
    }

    /// Output file written by the hook.
    pub fn filename(&self) -> &str {
        match self {
            Self::Html(c) => &c.filename,
            Self::Css(c) => &c.filename,
            Self::Sw(c) => &c.filename,
        }
    }

    pub fn validate(&self, index: usize, diag: &mut ConfigDiagnostics) {
        let field = |name: &str| FieldPath::indexed("plugins", index, name);
        match validate_template(self.filename()) {
            Err(e) => diag.error(field("filename"), e),
            // Other artifacts link to this path before its content exists
            Ok(()) if self.filename().contains('[') => {
                diag.error(field("filename"), "hook output names take no `[...]` tokens");
            }
            Ok(()) => {}
        }
        match self {
            Self::Html(c) => {
                if c.template.as_deref().is_some_and(str::is_empty) {
                    diag.error(field("template"), "template id is empty");
                }
            }
            Self::Css(c) => {
                if let Err(e) = browser_targets(&c.targets) {
                    diag.error(field("targets"), e);
                }
            }
            Self::Sw(c) => {
                if let Err(e) = validate_template(&c.precache) {
                    diag.error(field("precache"), e);
                }
                for (i, pattern) in c.exclude.iter().enumerate() {
                    if let Err(e) = Regex::new(pattern) {
                        diag.error(field(&format!("exclude[{i}]")), format!("invalid regex: {e}"));
                    }
                }
            }
        }
    }
}

/// Entry document generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlPluginConfig {
    /// Source id of the template document. Unset uses the embedded default.
    pub template: Option<String>,

    pub filename: String,

    /// `<title>` of the embedded default template.
    pub title: String,

    pub minify: HtmlMinifyConfig,
}

impl Default for HtmlPluginConfig {
    fn default() -> Self {
        Self {
            template: None,
            filename: "index.html".into(),
            title: "kiln".into(),
            minify: HtmlMinifyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlMinifyConfig {
    pub collapse_whitespace: bool,
    #[serde(alias = "strip_comments")]
    pub remove_comments: bool,
}

/// Consolidation of extracted style chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CssPluginConfig {
    pub filename: String,
    pub minify: bool,
    /// Browserslist queries for prefixing and lowering.
    pub targets: Vec<String>,
}

impl Default for CssPluginConfig {
    fn default() -> Self {
        Self {
            filename: "main.css".into(),
            minify: true,
            targets: Vec::new(),
        }
    }
}

/// Offline cache: precache manifest plus installer script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwPluginConfig {
    pub filename: String,

    /// Name template of the precache manifest, hashed over its content.
    pub precache: String,

    pub claim_clients: bool,

    pub skip_waiting: bool,

    /// Output paths matching any of these are left out of the precache.
    pub exclude: Vec<String>,
}

impl Default for SwPluginConfig {
    fn default() -> Self {
        Self {
            filename: "service-worker.js".into(),
            precache: "precache-manifest.[hash:8].js".into(),
            claim_clients: true,
            skip_waiting: true,
            exclude: vec![r"\.map$".into(), r"^manifest.*\.js$".into()],
        }
    }
}
