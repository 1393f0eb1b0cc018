//! Embedded text templates with `__PLACEHOLDER__` substitution.

use std::marker::PhantomData;

/// Values substituted into one template.
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Template text tied to the variable set it accepts.
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

/// Placeholders still present in `rendered`, for tests.
#[cfg(test)]
pub fn leftover_placeholders(rendered: &str) -> Vec<String> {
    let re = regex::Regex::new(r"__[A-Z_]+__").unwrap();
    re.find_iter(rendered).map(|m| m.as_str().to_string()).collect()
}
