//! `kiln rules`: show the step chain each identifier resolves to.

use anyhow::Result;
use std::fmt::Write;

use crate::config::KilnConfig;
use crate::rules::{Resolution, RuleSet};
use crate::transform::Registry;

pub fn print_rules(config: &KilnConfig, ids: &[String]) -> Result<()> {
    let rules = RuleSet::compile(&config.rules, &config.plugins, &Registry::builtin())?;
    for id in ids {
        println!("{}", describe(id, &rules.resolve(id)));
    }
    Ok(())
}

fn describe(id: &str, resolution: &Resolution) -> String {
    let mut out = id.to_string();
    if resolution.is_fallback() {
        out.push_str(" (no rule matched)");
    } else {
        let matched: Vec<_> = resolution.matched.iter().map(|i| format!("rules[{i}]")).collect();
        let _ = write!(out, " <- {}", matched.join(", "));
    }
    for (i, step) in resolution.steps.iter().enumerate() {
        let _ = write!(out, "\n  {}. {step}", i + 1);
    }
    if let Some(filename) = &resolution.filename {
        let _ = write!(out, "\n  name: {filename}");
    }
    out
}
