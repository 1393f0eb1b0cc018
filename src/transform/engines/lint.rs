//! Advisory script checks: syntax errors plus a denied-pattern list.

use regex::Regex;

use oxc::allocator::Allocator;
use oxc::parser::Parser;

use super::script::source_type;
use crate::core::Asset;
use crate::transform::{
    FailurePolicy, OptionError, Options, StepContext, StepError, StepOutput, Transform,
};

pub struct Lint;

const DEFAULT_DENY: &[&str] = &["debugger"];

fn deny_list(options: &Options) -> Result<Vec<String>, OptionError> {
    Ok(options
        .str_list("deny")?
        .unwrap_or_else(|| DEFAULT_DENY.iter().map(|s| (*s).to_string()).collect()))
}

/// 1-based line of byte `offset`.
fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Problems found in `source`, in source order.
fn check(id: &str, source: &str, deny: &[String]) -> Vec<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type(id)).parse();
    let mut problems: Vec<String> = ret.errors.iter().map(ToString::to_string).collect();

    let mut hits: Vec<(usize, &str)> = Vec::new();
    for word in deny {
        let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(word))) else {
            continue;
        };
        hits.extend(re.find_iter(source).map(|m| (m.start(), word.as_str())));
    }
    hits.sort_unstable();
    problems.extend(
        hits.into_iter()
            .map(|(offset, word)| format!("line {}: `{word}` is not allowed", line_of(source, offset))),
    );
    problems
}

impl Transform for Lint {
    fn policy(&self, _options: &Options) -> FailurePolicy {
        FailurePolicy::Advisory
    }

    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["deny"])?;
        deny_list(options).map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        _cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        let deny = deny_list(options)?;
        let problems = check(&asset.id, asset.text()?, &deny);
        if problems.is_empty() {
            return Ok(StepOutput::default());
        }
        Err(StepError::Rejected(format!(
            "{} problem{}: {}",
            problems.len(),
            crate::utils::plural_s(problems.len()),
            problems.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lint_clean() {
        let mut asset = Asset::new("a.js", "let debuggerMode = 1;\n");
        let out = Lint.apply(&mut asset, &Options::default(), &StepContext::default());
        assert!(out.is_ok());
    }

    #[test]
    fn test_lint_default_deny() {
        let source = "let a = 1;\ndebugger;\n";
        let mut asset = Asset::new("a.js", source);
        let err = Lint
            .apply(&mut asset, &Options::default(), &StepContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("line 2: `debugger`"));
        assert_eq!(asset.text().unwrap(), source);
        assert_eq!(Lint.policy(&Options::default()), FailurePolicy::Advisory);
    }

    #[test]
    fn test_lint_custom_deny() {
        let mut options = Options::default();
        options.set("deny", serde_json::json!(["eval", "alert"]));
        let problems = check(
            "a.js",
            "alert(1);\neval('2');\n",
            &deny_list(&options).unwrap(),
        );
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("line 1: `alert`"));
    }

    #[test]
    fn test_lint_syntax_error() {
        let problems = check("a.js", "let = ;", &[]);
        assert!(!problems.is_empty());
    }
}
