//! Rule matching: asset identifier → ordered step chain.
//!
//! Every rule whose `test` matches (and whose own `exclude` does not)
//! contributes its `use` list; chains are concatenated in declaration order.
//! Patterns match against the `/`-separated asset identifier.
//!
//! ```toml
//! [[rules]]
//! test = '\.css$'
//! use = ["style", "extract"]
//!
//! [[rules]]
//! test = '\.js$'
//! exclude = '^vendor/'
//! use = ["lint"]
//! ```

use regex::Regex;

use crate::config::{ConfigDiagnostics, ConfigError, FieldPath, PluginConfig, PluginKind, RuleConfig};
use crate::transform::{Builtin, Registry, StepDescriptor};

#[derive(Debug)]
struct CompiledRule {
    test: Option<Regex>,
    exclude: Option<Regex>,
    catch_all: bool,
    filename: Option<String>,
    steps: Vec<StepDescriptor>,
}

impl CompiledRule {
    fn matches(&self, id: &str) -> bool {
        if self.exclude.as_ref().is_some_and(|re| re.is_match(id)) {
            return false;
        }
        self.catch_all || self.test.as_ref().is_some_and(|re| re.is_match(id))
    }
}

/// Resolved chain for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub steps: Vec<StepDescriptor>,
    /// Index of the first matching rule, `usize::MAX` for the fallback.
    pub precedence: usize,
    /// Name template of the first matching rule that sets one.
    pub filename: Option<String>,
    /// Indices of matching rules, in order.
    pub matched: Vec<usize>,
}

impl Resolution {
    fn fallback() -> Self {
        Self {
            steps: vec![StepDescriptor::new(Builtin::Copy.id())],
            precedence: usize::MAX,
            filename: None,
            matched: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.matched.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

fn compile_pattern(
    pattern: Option<&str>,
    field: FieldPath,
    diag: &mut ConfigDiagnostics,
) -> Option<Regex> {
    let pattern = pattern?;
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            diag.error(field, format!("invalid pattern `{pattern}`: {e}"));
            None
        }
    }
}

impl RuleSet {
    /// Compile every rule, collecting all problems into one error.
    pub fn compile(
        rules: &[RuleConfig],
        plugins: &[PluginConfig],
        registry: &Registry,
    ) -> Result<Self, ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        let has_css_plugin = plugins.iter().any(|p| p.kind() == PluginKind::Css);
        let mut compiled = Vec::with_capacity(rules.len());

        for (i, rule) in rules.iter().enumerate() {
            if rule.test.is_none() && !rule.catch_all {
                diag.error_with_hint(
                    FieldPath::indexed("rules", i, ""),
                    "rule has no `test` pattern",
                    "set `test`, or `catch_all = true` to match every asset",
                );
            }
            if rule.steps.is_empty() {
                diag.warn(FieldPath::indexed("rules", i, "use"), "rule has no steps");
            }

            let test = compile_pattern(rule.test.as_deref(), FieldPath::indexed("rules", i, "test"), &mut diag);
            let exclude = compile_pattern(
                rule.exclude.as_deref(),
                FieldPath::indexed("rules", i, "exclude"),
                &mut diag,
            );

            for (j, step) in rule.steps.iter().enumerate() {
                let field = FieldPath::indexed("rules", i, &format!("use[{j}]"));
                let Some(engine) = registry.get(&step.engine) else {
                    diag.error_with_hint(
                        field,
                        format!("unknown engine `{}`", step.engine),
                        format!("available: {}", registry.ids().join(", ")),
                    );
                    continue;
                };
                if let Err(e) = engine.validate(&step.options) {
                    diag.error(field.clone(), format!("`{}`: {e}", step.engine));
                }
                if step.engine == Builtin::Extract.id() && !has_css_plugin {
                    diag.error_with_hint(
                        field,
                        "`extract` needs the style consolidation plugin",
                        "add `[[plugins]] kind = \"css\"`",
                    );
                }
            }

            compiled.push(CompiledRule {
                test,
                exclude,
                catch_all: rule.catch_all,
                filename: rule.filename.clone(),
                steps: rule.steps.clone(),
            });
        }

        diag.print_warnings();
        diag.into_result()?;
        Ok(Self { rules: compiled })
    }

    /// Chain for `id`: all matching rules' steps in declaration order, or a
    /// single `copy` step when nothing matches.
    pub fn resolve(&self, id: &str) -> Resolution {
        let mut resolution = Resolution {
            steps: Vec::new(),
            precedence: usize::MAX,
            filename: None,
            matched: Vec::new(),
        };
        for (i, rule) in self.rules.iter().enumerate().filter(|(_, r)| r.matches(id)) {
            if resolution.matched.is_empty() {
                resolution.precedence = i;
            }
            if resolution.filename.is_none() {
                resolution.filename.clone_from(&rule.filename);
            }
            resolution.matched.push(i);
            resolution.steps.extend(rule.steps.iter().cloned());
        }
        if resolution.matched.is_empty() {
            return Resolution::fallback();
        }
        resolution
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
