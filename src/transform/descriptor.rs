//! Step descriptors as written in `[[rules]] use = [...]`.
//!
//! ```toml
//! use = [
//!     "extract",
//!     { engine = "style", options = { minify = false } },
//!     { engine = "lint", strict = true },
//! ]
//! ```

use serde::de::{self, MapAccess, Visitor, value::MapAccessDeserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Engine identifier plus its opaque options. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StepSpec")]
pub struct StepDescriptor {
    pub engine: String,
    pub options: Options,
    /// Treat advisory failures of this step as required.
    pub strict: bool,
}

impl StepDescriptor {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            options: Options::default(),
            strict: false,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Display for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.engine)?;
        if !self.options.is_empty() {
            write!(f, " {}", Value::Object(self.options.0.clone()))?;
        }
        if self.strict {
            f.write_str(" (strict)")?;
        }
        Ok(())
    }
}

/// A bare engine name or a table. Sequences are refused so a `use` list is
/// never read as one struct in sequence form.
enum StepSpec {
    Short(String),
    Detailed(DetailedStep),
}

impl<'de> Deserialize<'de> for StepSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = StepSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an engine name or a table with `engine`")
            }

            fn visit_str<E: de::Error>(self, engine: &str) -> Result<StepSpec, E> {
                Ok(StepSpec::Short(engine.to_string()))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<StepSpec, A::Error> {
                DetailedStep::deserialize(MapAccessDeserializer::new(map)).map(StepSpec::Detailed)
            }
        }

        deserializer.deserialize_any(SpecVisitor)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DetailedStep {
    engine: String,
    #[serde(default)]
    options: Options,
    #[serde(default)]
    strict: bool,
}

impl From<StepSpec> for StepDescriptor {
    fn from(spec: StepSpec) -> Self {
        match spec {
            StepSpec::Short(engine) => Self::new(engine),
            StepSpec::Detailed(d) => Self {
                engine: d.engine,
                options: d.options,
                strict: d.strict,
            },
        }
    }
}

/// `use = "copy"` is shorthand for `use = ["copy"]`.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<StepDescriptor>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<StepDescriptor>),
        One(StepDescriptor),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(steps) => steps,
        OneOrMany::One(step) => vec![step],
    })
}

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("option `{key}` {message}")]
pub struct OptionError {
    pub key: String,
    pub message: String,
}

impl OptionError {
    pub fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }

    fn expected(key: &str, what: &str) -> Self {
        Self::new(key, format!("must be {what}"))
    }
}

/// Opaque per-step option map; each engine reads what it understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, OptionError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(OptionError::expected(key, "a boolean")),
        }
    }

    pub fn u64(&self, key: &str) -> Result<Option<u64>, OptionError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| OptionError::expected(key, "a non-negative integer")),
        }
    }

    pub fn str(&self, key: &str) -> Result<Option<&str>, OptionError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(OptionError::expected(key, "a string")),
        }
    }

    /// A string or an array of strings.
    pub fn str_list(&self, key: &str) -> Result<Option<Vec<String>>, OptionError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(Some)
                .ok_or_else(|| OptionError::expected(key, "an array of strings")),
            Some(_) => Err(OptionError::expected(key, "a string or an array of strings")),
        }
    }

    /// Reject keys outside `known`.
    pub fn check_known(&self, known: &[&str]) -> Result<(), OptionError> {
        match self.keys().find(|k| !known.contains(k)) {
            Some(key) => Err(OptionError::new(
                key,
                format!("is not recognised (expected one of: {})", known.join(", ")),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Chain {
        #[serde(rename = "use")]
        steps: Vec<StepDescriptor>,
    }

    fn parse(src: &str) -> Vec<StepDescriptor> {
        toml::from_str::<Chain>(src).unwrap().steps
    }

    #[test]
    fn test_short_and_detailed_forms() {
        let steps = parse(
            r#"use = ["extract", { engine = "style", options = { minify = false } }, { engine = "lint", strict = true }]"#,
        );
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], StepDescriptor::new("extract"));
        assert_eq!(steps[1].engine, "style");
        assert_eq!(steps[1].options.bool("minify"), Ok(Some(false)));
        assert!(!steps[1].strict);
        assert!(steps[2].strict);
    }

    #[derive(Deserialize)]
    struct Rule {
        #[serde(rename = "use", deserialize_with = "one_or_many")]
        steps: Vec<StepDescriptor>,
    }

    fn parse_rule(src: &str) -> Vec<StepDescriptor> {
        toml::from_str::<Rule>(src).unwrap().steps
    }

    #[test]
    fn test_one_or_many_mixed_list() {
        let steps = parse_rule(r#"use = ["lint", { engine = "script", options = { minify = true } }]"#);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], StepDescriptor::new("lint"));
        assert_eq!(steps[1].engine, "script");
        assert_eq!(steps[1].options.bool("minify"), Ok(Some(true)));

        let steps = parse_rule(r#"use = ["lint", "script"]"#);
        assert_eq!(steps, vec![StepDescriptor::new("lint"), StepDescriptor::new("script")]);
    }

    #[test]
    fn test_one_or_many_single_forms() {
        assert_eq!(parse_rule(r#"use = "copy""#), vec![StepDescriptor::new("copy")]);
        let steps = parse_rule(r#"use = { engine = "url", options = { limit = 10 } }"#);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].options.u64("limit"), Ok(Some(10)));
        assert!(parse_rule("use = []").is_empty());
    }

    #[test]
    fn test_sequence_is_not_a_step() {
        assert!(toml::from_str::<Chain>(r#"use = [["style", {}]]"#).is_err());
    }

    #[test]
    fn test_detailed_rejects_unknown_fields() {
        let result = toml::from_str::<Chain>(r#"use = [{ engine = "style", minfy = true }]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_typed_getters() {
        let steps = parse(
            r#"use = [{ engine = "url", options = { limit = 8192, name = "[name].[ext]", deny = ["a", "b"], args = "x", bad = -1 } }]"#,
        );
        let options = &steps[0].options;
        assert_eq!(options.u64("limit"), Ok(Some(8192)));
        assert_eq!(options.str("name"), Ok(Some("[name].[ext]")));
        assert_eq!(options.str_list("deny"), Ok(Some(vec!["a".into(), "b".into()])));
        assert_eq!(options.str_list("args"), Ok(Some(vec!["x".into()])));
        assert_eq!(options.u64("missing"), Ok(None));
        assert!(options.u64("bad").is_err());
        assert!(options.bool("name").is_err());
    }

    #[test]
    fn test_check_known() {
        let mut options = Options::default();
        options.set("minify", true);
        assert!(options.check_known(&["minify"]).is_ok());
        let err = options.check_known(&["limit"]).unwrap_err();
        assert_eq!(err.key, "minify");
    }

    #[test]
    fn test_display() {
        let mut options = Options::default();
        options.set("minify", true);
        let step = StepDescriptor::new("style").with_options(options);
        assert_eq!(step.to_string(), r#"style {"minify":true}"#);
    }
}
