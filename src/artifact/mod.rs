//! Artifact writer: final names, reference rewriting, sinks.
//!
//! `finalize` turns transformed assets into named artifacts and records them
//! in the manifest. Non-markup assets are named first so markup can point
//! its references at final paths (or `data:` URIs) afterwards.

mod naming;
mod sink;

pub use naming::{render, validate_template};
pub use sink::{ArtifactSink, ArtifactStore, DiskSink, MemorySink, write_artifacts};

use rustc_hash::FxHashMap;
use std::ops::Range;

use crate::core::{Asset, AssetKind, BuildContext, Emit, OutputRef};
use crate::pipeline::Issue;
use crate::transform::reference_spans;
use crate::utils::hash::ContentHash;
use crate::utils::path::relative_url;

/// A file ready for a sink. `path` is relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub content: Vec<u8>,
    /// Source asset id, or `@<hook>` for hook output.
    pub source: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            source: source.into(),
        }
    }

    pub fn hash(&self) -> ContentHash {
        ContentHash::of(&self.content)
    }

    /// Manifest record for this artifact.
    pub fn output_ref(&self) -> OutputRef {
        OutputRef::File {
            path: self.path.clone(),
            size: self.content.len() as u64,
            hash: self.hash().short(20),
        }
    }
}

#[derive(Debug, Default)]
pub struct ArtifactSet {
    /// Files to write, sorted by path.
    pub artifacts: Vec<Artifact>,
    /// Compiled styles held for consolidation, in (precedence, id) order.
    pub extracted: Vec<Asset>,
    /// Source of the html hook's entry document, held out of normal output.
    pub entry_template: Option<Asset>,
    pub failures: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

/// Where a source id ended up, for reference rewriting.
enum Locator {
    File(String),
    Inline(String),
}

struct Finalizer<'a> {
    cx: &'a BuildContext,
    set: ArtifactSet,
    locators: FxHashMap<String, Locator>,
    claimed: FxHashMap<String, String>,
}

impl<'a> Finalizer<'a> {
    fn template<'t>(&'t self, emit: &'t Emit) -> &'t str {
        match emit {
            Emit::File { template: Some(t) } => t,
            _ => &self.cx.config.build.filename,
        }
    }

    fn emit_file(&mut self, asset: Asset, path: String) {
        if let Some(owner) = self.claimed.get(&path) {
            self.set.failures.push(Issue::new(
                &asset.id,
                None,
                format!("output path `{path}` is also produced by `{owner}`"),
            ));
            return;
        }
        self.claimed.insert(path.clone(), asset.id.clone());
        let artifact = Artifact::new(path.clone(), asset.content, asset.id.clone());
        self.cx.manifest().add_output(&asset.id, artifact.output_ref());
        self.locators.insert(asset.id, Locator::File(path));
        self.set.artifacts.push(artifact);
    }

    fn place(&mut self, asset: Asset) {
        match asset.emit.clone() {
            emit @ Emit::File { .. } => {
                let path = render(self.template(&emit), &asset.id, &asset.extension, asset.hash());
                self.emit_file(asset, path);
            }
            Emit::Inline { size } => {
                let uri = String::from_utf8_lossy(&asset.content).into_owned();
                self.cx
                    .manifest()
                    .add_output(&asset.id, OutputRef::Inline { uri: uri.clone(), size });
                self.locators.insert(asset.id, Locator::Inline(uri));
            }
            Emit::Extracted => {
                if let Some(bundle) = self.cx.config.css_filename() {
                    self.locators.insert(asset.id.clone(), Locator::File(bundle.to_string()));
                }
                self.set.extracted.push(asset);
            }
        }
    }

    /// Point every reference in `html` at its target's final location, as
    /// seen from output path `from`. Returns the resolved target ids.
    fn rewrite_references(&mut self, asset: &Asset, html: &mut String, from: &str) -> Vec<String> {
        let mut targets = Vec::with_capacity(asset.references.len());
        let mut locations: FxHashMap<&str, String> = FxHashMap::default();
        for reference in &asset.references {
            let location = match self.locators.get(&reference.target) {
                Some(Locator::File(path)) => {
                    let suffix = reference
                        .raw
                        .find(['?', '#'])
                        .map_or("", |i| &reference.raw[i..]);
                    format!("{}{suffix}", relative_url(from, path))
                }
                Some(Locator::Inline(uri)) => uri.clone(),
                None => {
                    self.set.warnings.push(Issue::new(
                        &asset.id,
                        None,
                        format!("`{}` does not match any built asset", reference.raw),
                    ));
                    continue;
                }
            };
            locations.insert(reference.raw.as_str(), location);
            targets.push(reference.target.clone());
        }
        if locations.is_empty() {
            return targets;
        }

        match reference_spans(html) {
            Ok(spans) => *html = patch_spans(html, &spans, &locations),
            Err(e) => self.set.warnings.push(Issue::new(
                &asset.id,
                None,
                format!("references left unrewritten: {e:?}"),
            )),
        }
        targets
    }

    fn rewrite(&mut self, mut asset: Asset) {
        let template = self.template(&asset.emit).to_string();
        let provisional = render(&template, &asset.id, &asset.extension, asset.hash());

        let Ok(mut html) = asset.text().map(str::to_string) else {
            self.place(asset);
            return;
        };
        let targets = self.rewrite_references(&asset, &mut html, &provisional);

        asset.content = html.into_bytes();
        self.cx.manifest().set_references(&asset.id, targets);
        let path = render(&template, &asset.id, &asset.extension, asset.hash());
        self.emit_file(asset, path);
    }

    /// Hold the entry document template for the html hook, with references
    /// resolved relative to the hook's output file.
    fn hold_template(&mut self, mut asset: Asset, filename: &str) {
        let Ok(mut html) = asset.text().map(str::to_string) else {
            self.set
                .failures
                .push(Issue::new(&asset.id, None, "entry template is not valid UTF-8"));
            return;
        };
        let targets = self.rewrite_references(&asset, &mut html, filename);

        asset.content = html.into_bytes();
        let mut manifest = self.cx.manifest();
        manifest.set_references(&asset.id, targets);
        manifest.add_output(
            &asset.id,
            OutputRef::Bundled {
                path: filename.to_string(),
            },
        );
        drop(manifest);
        self.set.entry_template = Some(asset);
    }
}

/// Replace each span whose current value has a new location.
fn patch_spans(html: &str, spans: &[Range<usize>], locations: &FxHashMap<&str, String>) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for span in spans {
        if let Some(location) = locations.get(&html[span.clone()]) {
            out.push_str(&html[last..span.start]);
            out.push_str(location);
            last = span.end;
        }
    }
    out.push_str(&html[last..]);
    out
}

/// Name every transformed asset and record its outputs in the manifest.
pub fn finalize(cx: &BuildContext, mut transformed: Vec<Asset>) -> ArtifactSet {
    let entry = cx.config.html_plugin().and_then(|html| {
        let template = html.template.as_deref()?;
        let index = transformed.iter().position(|a| a.id == template)?;
        Some((transformed.remove(index), html.filename.clone()))
    });

    let (markup, others): (Vec<_>, Vec<_>) = transformed.into_iter().partition(|a| {
        a.kind == AssetKind::Markup && matches!(a.emit, Emit::File { .. }) && !a.references.is_empty()
    });

    let mut finalizer = Finalizer {
        cx,
        set: ArtifactSet::default(),
        locators: FxHashMap::default(),
        claimed: FxHashMap::default(),
    };
    for asset in others {
        finalizer.place(asset);
    }
    for asset in markup {
        finalizer.rewrite(asset);
    }
    if let Some((template, filename)) = entry {
        finalizer.hold_template(template, &filename);
    }

    let mut set = finalizer.set;
    set.artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    set.extracted
        .sort_by(|a, b| (a.precedence, &a.id).cmp(&(b.precedence, &b.id)));
    set
}
