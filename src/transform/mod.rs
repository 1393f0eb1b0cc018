//! Transform steps: one unit of work applied to an asset.
//!
//! An engine implements [`Transform`]; a rule's `use` list names engines by
//! identifier and the [`Registry`] resolves them. Steps of one asset run in
//! order on the same value, each seeing the previous step's output.

mod descriptor;
mod engines;
mod registry;

pub use descriptor::{OptionError, Options, StepDescriptor, one_or_many};
pub use engines::{Builtin, browser_targets, compile_css, reference_spans};
pub use registry::Registry;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::{Asset, SideAsset};

/// Whether a failing step fails its asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Failure becomes a warning (linters).
    Advisory,
    /// Failure fails the asset.
    Required,
}

/// Read-only inputs shared by every step of a build.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub source_root: PathBuf,
    /// Default `url` threshold in bytes.
    pub inline_limit: u64,
    pub timeout: Option<Duration>,
    /// Escalate advisory failures.
    pub strict: bool,
}

impl Default for StepContext {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            inline_limit: 8192,
            timeout: None,
            strict: false,
        }
    }
}

/// What a successful step hands back besides the mutated asset.
#[derive(Debug, Default)]
pub struct StepOutput {
    pub side_assets: Vec<SideAsset>,
    /// Non-fatal notes, reported as warnings.
    pub diagnostics: Vec<String>,
}

impl StepOutput {
    pub fn with_diagnostic(mut self, message: impl Into<String>) -> Self {
        self.diagnostics.push(message.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum StepError {
    #[error("content is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error("`{program}` {message}")]
    Command { program: String, message: String },

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Transform: Send + Sync {
    /// Failure policy for a step configured with `options`.
    fn policy(&self, _options: &Options) -> FailurePolicy {
        FailurePolicy::Required
    }

    /// Option check run once at load time.
    fn validate(&self, _options: &Options) -> Result<(), OptionError> {
        Ok(())
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        cx: &StepContext,
    ) -> Result<StepOutput, StepError>;
}
