//! Markup reference collection.
//!
//! Finds local `src`/`href` references so the writer can point them at final
//! output names. With `extract_styles`, inline `<style>` blocks are lifted
//! into side assets that go back through the rule matcher.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::core::{Asset, AssetKind, Reference, SideAsset};
use crate::transform::{OptionError, Options, StepContext, StepError, StepOutput, Transform};
use crate::utils::path::resolve_reference;

pub struct Markup;

/// (tag, attribute) pairs that point at other assets.
const REFERENCE_ATTRS: &[(&str, &str)] = &[
    ("img", "src"),
    ("script", "src"),
    ("link", "href"),
    ("source", "src"),
    ("video", "src"),
    ("video", "poster"),
    ("audio", "src"),
];

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style>").unwrap());

/// Byte ranges of every reference attribute value in `html`, in document
/// order. Values tl had to re-encode are skipped.
pub fn reference_spans(html: &str) -> Result<Vec<Range<usize>>, tl::ParseError> {
    let dom = tl::parse(html, tl::ParserOptions::default())?;
    let base = html.as_ptr() as usize;

    let mut spans = Vec::new();
    for tag in dom.nodes().iter().filter_map(tl::Node::as_tag) {
        let name = tag.name().as_utf8_str().to_ascii_lowercase();
        for (key, value) in tag.attributes().iter() {
            let Some(value) = value else { continue };
            let key = key.to_ascii_lowercase();
            if !REFERENCE_ATTRS.iter().any(|(t, a)| *t == name && *a == key) {
                continue;
            }
            let Some(start) = (value.as_ptr() as usize).checked_sub(base) else {
                continue;
            };
            let span = start..start + value.len();
            if html.get(span.clone()) == Some(&*value) {
                spans.push(span);
            }
        }
    }
    spans.sort_by_key(|s| s.start);
    Ok(spans)
}

/// Local references of `html`, first occurrence of each value only.
fn collect_references(id: &str, html: &str) -> Result<Vec<Reference>, StepError> {
    let spans = reference_spans(html)
        .map_err(|e| StepError::Rejected(format!("unparsable markup: {e:?}")))?;

    let mut references: Vec<Reference> = Vec::new();
    for span in spans {
        let raw = &html[span];
        if references.iter().any(|r| r.raw == raw) {
            continue;
        }
        if let Some(target) = resolve_reference(id, raw) {
            references.push(Reference {
                raw: raw.to_string(),
                target,
            });
        }
    }
    Ok(references)
}

/// Replace `<style>` blocks with links to side assets.
fn extract_styles(asset: &Asset, html: &str) -> (String, Vec<SideAsset>) {
    let mut side_assets = Vec::new();
    let html = STYLE_BLOCK.replace_all(html, |caps: &regex::Captures| {
        let css = caps[1].trim();
        if css.is_empty() {
            return String::new();
        }
        let side = SideAsset::derived(&asset.id, "css", css.as_bytes().to_vec(), true);
        let href = side.id.rsplit('/').next().unwrap_or(&side.id).to_string();
        side_assets.push(side);
        format!(r#"<link rel="stylesheet" href="{href}">"#)
    });
    (html.into_owned(), side_assets)
}

impl Transform for Markup {
    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["extract_styles"])?;
        options.bool("extract_styles").map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        _cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        let mut output = StepOutput::default();
        let mut html = asset.text()?.to_string();

        if options.bool("extract_styles")?.unwrap_or(false) {
            let (rewritten, side_assets) = extract_styles(asset, &html);
            html = rewritten;
            output.side_assets = side_assets;
        }

        asset.references = collect_references(&asset.id, &html)?;
        asset.content = html.into_bytes();
        asset.kind = AssetKind::Markup;
        Ok(output)
    }
}
