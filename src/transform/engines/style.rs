//! Stylesheet compile via lightningcss.
//!
//! With `targets` (browserslist queries), declarations are prefixed and
//! lowered for those browsers.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::core::{Asset, AssetKind};
use crate::transform::{OptionError, Options, StepContext, StepError, StepOutput, Transform};

pub struct Style;

/// Resolve browserslist queries. No queries means no prefixing or lowering.
pub fn browser_targets(queries: &[String]) -> Result<Targets, String> {
    if queries.is_empty() {
        return Ok(Targets::default());
    }
    let browsers = Browsers::from_browserslist(queries).map_err(|e| e.to_string())?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

/// Parse and re-print `source`; errors carry the parser's location.
pub fn compile_css(source: &str, filename: &str, minify: bool, targets: Targets) -> Result<String, String> {
    let mut stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;
    if targets.browsers.is_some() {
        stylesheet
            .minify(MinifyOptions {
                targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| e.to_string())?;
    }
    let result = stylesheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

fn targets_option(options: &Options) -> Result<Targets, OptionError> {
    let queries = options.str_list("targets")?.unwrap_or_default();
    browser_targets(&queries).map_err(|e| OptionError::new("targets", e))
}

impl Transform for Style {
    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["minify", "targets"])?;
        options.bool("minify")?;
        targets_option(options).map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        _cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        let minify = options.bool("minify")?.unwrap_or(false);
        let targets = targets_option(options)?;
        let css = compile_css(asset.text()?, &asset.id, minify, targets).map_err(StepError::Rejected)?;
        asset.content = css.into_bytes();
        asset.kind = AssetKind::Style;
        asset.extension = "css".into();
        Ok(StepOutput::default())
    }
}
