//! Build outcome: what was written, what went wrong.

use std::fmt;

use owo_colors::OwoColorize;
use thiserror::Error;

use crate::log;
use crate::pipeline::Issue;
use crate::utils::plural_count;

/// Anything that makes a build exit non-zero.
#[derive(Debug, Clone, Error)]
pub enum BuildFailure {
    #[error("{0}")]
    Transform(Issue),

    #[error("{0}")]
    Write(Issue),

    #[error("{0}")]
    Hook(Issue),

    #[error("cancelled with {} unfinished", unfinished(.0))]
    Cancelled(usize),
}

fn unfinished(count: &usize) -> String {
    plural_count(*count, "asset")
}

impl BuildFailure {
    const fn group(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Write(_) => "write",
            Self::Hook(_) => "hook",
            Self::Cancelled(_) => "cancel",
        }
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    /// Scanned source assets.
    pub assets: usize,
    /// Assets that went through their pipeline in this build.
    pub transformed: usize,
    /// Files handed to the sink successfully.
    pub written: usize,
    pub failures: Vec<BuildFailure>,
    pub warnings: Vec<Issue>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Grouped warnings then failures, one block per failure group.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            log!("warning"; "{}:", plural_count(self.warnings.len(), "warning"));
            for warning in &self.warnings {
                eprintln!("  {} {warning}", "-".dimmed());
            }
        }

        for group in ["transform", "write", "hook", "cancel"] {
            let failures: Vec<_> = self.failures.iter().filter(|f| f.group() == group).collect();
            if failures.is_empty() {
                continue;
            }
            log!("error"; "{} {}:", group, plural_count(failures.len(), "failure"));
            for failure in failures {
                eprintln!("  {} {failure}", "✗".red());
            }
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} written",
            plural_count(self.assets, "asset"),
            plural_count(self.written, "file")
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {}", plural_count(self.failures.len(), "failure"))?;
        }
        if !self.warnings.is_empty() {
            write!(f, ", {}", plural_count(self.warnings.len(), "warning"))?;
        }
        Ok(())
    }
}
