//! Style consolidation: every extracted chunk into one stylesheet.

use super::{Hook, HookError};
use crate::artifact::{Artifact, ArtifactSet};
use crate::config::{CssPluginConfig, PluginKind};
use crate::core::{BuildContext, OutputRef};
use crate::transform::{browser_targets, compile_css};

pub struct CssHook<'a>(pub &'a CssPluginConfig);

impl Hook for CssHook<'_> {
    fn kind(&self) -> PluginKind {
        PluginKind::Css
    }

    /// Chunks arrive in (rule precedence, id) order and are concatenated as is.
    fn run(&self, cx: &BuildContext, set: &ArtifactSet) -> Result<Vec<Artifact>, HookError> {
        if set.extracted.is_empty() {
            return Ok(Vec::new());
        }

        let mut bundle = String::new();
        for chunk in &set.extracted {
            bundle.push_str(&String::from_utf8_lossy(&chunk.content));
            if !bundle.ends_with('\n') {
                bundle.push('\n');
            }
        }
        let targets = browser_targets(&self.0.targets).map_err(HookError::Style)?;
        let css = compile_css(&bundle, &self.0.filename, self.0.minify, targets).map_err(HookError::Style)?;

        let mut manifest = cx.manifest();
        for chunk in &set.extracted {
            manifest.add_output(
                &chunk.id,
                OutputRef::Bundled {
                    path: self.0.filename.clone(),
                },
            );
        }
        Ok(vec![Artifact::new(self.0.filename.clone(), css, "@css")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Asset, Emit};
    use crate::hooks::tests::context;

    fn chunk(id: &str, css: &str, precedence: usize) -> Asset {
        let mut asset = Asset::new(id, css);
        asset.emit = Emit::Extracted;
        asset.precedence = precedence;
        asset
    }

    #[test]
    fn test_chunks_concatenated_in_order() {
        let cx = context("[[plugins]]\nkind = \"css\"\nminify = true\n");
        let set = ArtifactSet {
            extracted: vec![chunk("b.css", "b{color:red}", 0), chunk("a.css", "a{width:1px}", 1)],
            ..Default::default()
        };
        let config = CssPluginConfig::default();
        let out = CssHook(&config).run(&cx, &set).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "main.css");
        assert_eq!(std::str::from_utf8(&out[0].content).unwrap(), "b{color:red}a{width:1px}");
        assert_eq!(cx.manifest().get("a.css").unwrap().outputs.len(), 1);
    }

    #[test]
    fn test_bundle_prefixed_for_targets() {
        let cx = context("[[plugins]]\nkind = \"css\"\n");
        let set = ArtifactSet {
            extracted: vec![chunk("a.css", "a{user-select:none}", 0)],
            ..Default::default()
        };
        let config = CssPluginConfig {
            targets: vec!["safari 8".into()],
            ..CssPluginConfig::default()
        };
        let out = CssHook(&config).run(&cx, &set).unwrap();
        let css = std::str::from_utf8(&out[0].content).unwrap();
        assert!(css.contains("-webkit-user-select:none"), "{css}");
    }

    #[test]
    fn test_no_chunks_no_output() {
        let cx = context("");
        let config = CssPluginConfig::default();
        assert!(CssHook(&config).run(&cx, &ArtifactSet::default()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_bundle_fails() {
        let cx = context("");
        let set = ArtifactSet {
            extracted: vec![chunk("x.css", "a[ { color: red }", 0)],
            ..Default::default()
        };
        let config = CssPluginConfig::default();
        assert!(matches!(CssHook(&config).run(&cx, &set), Err(HookError::Style(_))));
    }
}
