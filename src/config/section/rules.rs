//! `[[rules]]` array configuration.
//!
//! Every rule whose `test` matches (and whose own `exclude` does not) adds
//! its `use` steps to the asset's chain, in declaration order.
//!
//! ```toml
//! [[rules]]
//! test = '\.css$'
//! use = ["extract", { engine = "style", options = { minify = true } }]
//!
//! [[rules]]
//! catch_all = true
//! exclude = '\.(css|js|html)$'
//! use = ["copy"]
//! ```

use crate::transform::{StepDescriptor, one_or_many};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Inclusion regex, matched against the asset identifier.
    pub test: Option<String>,

    /// Exclusion regex. Wins over `test` for this rule only.
    pub exclude: Option<String>,

    /// Match every identifier not excluded.
    pub catch_all: bool,

    /// Artifact name template for assets first matched by this rule.
    pub filename: Option<String>,

    /// Ordered step list.
    #[serde(rename = "use", deserialize_with = "one_or_many")]
    pub steps: Vec<StepDescriptor>,
}
