//! Configuration section definitions.
//!
//! Each module corresponds to a section in `kiln.toml`:
//!
//! | Module    | TOML Section    | Purpose                               |
//! |-----------|-----------------|---------------------------------------|
//! | `build`   | `[build]`       | Source/output paths, naming, limits   |
//! | `rules`   | `[[rules]]`     | Ordered matching rules and step lists |
//! | `plugins` | `[[plugins]]`   | Post-build hooks (html, css, sw)      |
//! | `serve`   | `[serve]`       | Development server                    |

mod build;
mod plugins;
mod rules;
mod serve;

pub use build::BuildSectionConfig;
pub use plugins::{CssPluginConfig, HtmlMinifyConfig, HtmlPluginConfig, PluginConfig, PluginKind, SwPluginConfig};
pub use rules::RuleConfig;
pub use serve::ServeConfig;
