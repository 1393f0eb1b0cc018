//! In-flight assets and their kinds.

use serde::{Deserialize, Serialize};

use crate::utils::hash::ContentHash;
use crate::utils::path::split_id;

/// Semantic type tag derived from the file extension at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Style,
    Script,
    Markup,
    Image,
    Other,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Style,
        AssetKind::Script,
        AssetKind::Markup,
        AssetKind::Image,
        AssetKind::Other,
    ];

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "css" | "less" | "scss" | "sass" | "styl" | "pcss" => Self::Style,
            "js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" | "mts" | "cts" => Self::Script,
            "html" | "htm" => Self::Markup,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "svg" | "ico" | "bmp" => Self::Image,
            _ => Self::Other,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Script => "script",
            Self::Markup => "markup",
            Self::Image => "image",
            Self::Other => "other",
        }
    }
}

/// How the writer materialises an asset's final content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// Written as its own file; `template` overrides the configured name.
    File { template: Option<String> },
    /// Content is a `data:` URI embedded by referrers, never written.
    /// `size` is the byte length before encoding.
    Inline { size: u64 },
    /// Held back for the style consolidation hook.
    Extracted,
}

impl Default for Emit {
    fn default() -> Self {
        Self::File { template: None }
    }
}

/// A local reference found in markup, rewritten by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Attribute value exactly as written in the document.
    pub raw: String,
    /// Identifier of the referenced asset.
    pub target: String,
}

/// One asset flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub content: Vec<u8>,
    pub kind: AssetKind,
    /// Output extension (`less` sources compile to `css`).
    pub extension: String,
    pub emit: Emit,
    pub references: Vec<Reference>,
    /// Index of the first rule that matched; fallback assets sort last.
    pub precedence: usize,
    /// Side-asset hops from a scanned source (0 for scanned assets).
    pub generation: u8,
    /// Identifier of the asset whose step produced this one.
    pub parent: Option<String>,
}

impl Asset {
    pub fn new(id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let id = id.into();
        let extension = split_id(&id).2.to_ascii_lowercase();
        Self {
            kind: AssetKind::from_extension(&extension),
            extension,
            id,
            content: content.into(),
            emit: Emit::default(),
            references: Vec::new(),
            precedence: usize::MAX,
            generation: 0,
            parent: None,
        }
    }

    /// Content as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.content)
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn hash(&self) -> ContentHash {
        ContentHash::of(&self.content)
    }
}

/// Extra output produced by a step, e.g. a lifted `<style>` block.
#[derive(Debug, Clone)]
pub struct SideAsset {
    pub id: String,
    pub content: Vec<u8>,
    /// Run the side asset through the rule matcher (one level only).
    pub reenter: bool,
}

impl SideAsset {
    /// Side asset next to `parent`, named `<stem>.<hash:10>.<ext>`.
    pub fn derived(parent: &str, extension: &str, content: Vec<u8>, reenter: bool) -> Self {
        let (dir, stem, _) = split_id(parent);
        let hash = ContentHash::of(&content).short(10);
        Self {
            id: format!("{dir}{stem}.{hash}.{extension}"),
            content,
            reenter,
        }
    }

    /// Turn into an asset of generation `generation`.
    pub fn into_asset(self, parent: &str, generation: u8) -> Asset {
        let mut asset = Asset::new(self.id, self.content);
        asset.generation = generation;
        asset.parent = Some(parent.to_string());
        asset
    }
}
