//! Entry document: template plus injected style and script tags.

use regex::Regex;
use std::sync::LazyLock;

use super::{Hook, HookError};
use crate::artifact::{Artifact, ArtifactSet};
use crate::config::{HtmlPluginConfig, PluginKind};
use crate::core::{AssetKind, BuildContext};
use crate::embed::html::{INDEX_HTML, IndexVars};
use crate::utils::html::{collapse_whitespace, escape, strip_comments};
use crate::utils::path::relative_url;

static HEAD_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());
static BODY_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</body\s*>").unwrap());

pub struct HtmlHook<'a>(pub &'a HtmlPluginConfig);

impl Hook for HtmlHook<'_> {
    fn kind(&self) -> PluginKind {
        PluginKind::Html
    }

    fn run(&self, cx: &BuildContext, set: &ArtifactSet) -> Result<Vec<Artifact>, HookError> {
        let config = self.0;
        let mut html = match &config.template {
            Some(id) => {
                let template = set
                    .entry_template
                    .as_ref()
                    .filter(|a| a.id == *id)
                    .ok_or_else(|| HookError::MissingTemplate(id.clone()))?;
                String::from_utf8_lossy(&template.content).into_owned()
            }
            None => INDEX_HTML.render(&IndexVars {
                title: config.title.clone(),
            }),
        };

        let (styles, scripts) = {
            let manifest = cx.manifest();
            let urls = |kind| {
                manifest
                    .files_of_kind(kind)
                    .into_iter()
                    .map(|path| relative_url(&config.filename, path))
                    .collect::<Vec<_>>()
            };
            (urls(AssetKind::Style), urls(AssetKind::Script))
        };

        let links: String = styles
            .iter()
            .filter(|url| !links_to(&html, url))
            .map(|url| format!(r#"<link rel="stylesheet" href="{}">"#, escape(url)))
            .collect();
        let tags: String = scripts
            .iter()
            .filter(|url| !links_to(&html, url))
            .map(|url| format!(r#"<script src="{}"></script>"#, escape(url)))
            .collect();

        html = insert_before(&HEAD_END, &html, &links, false);
        html = insert_before(&BODY_END, &html, &tags, true);

        if config.minify.remove_comments {
            html = strip_comments(&html);
        }
        if config.minify.collapse_whitespace {
            html = collapse_whitespace(&html);
        }
        Ok(vec![Artifact::new(config.filename.clone(), html, "@html")])
    }
}

/// The document already references `url` through an attribute.
fn links_to(html: &str, url: &str) -> bool {
    html.contains(&format!("=\"{url}\"")) || html.contains(&format!("='{url}'"))
}

/// Insert `tags` before the first `marker`; without one, at the end (or start).
fn insert_before(marker: &Regex, html: &str, tags: &str, or_append: bool) -> String {
    if tags.is_empty() {
        return html.to_string();
    }
    match marker.find(html) {
        Some(m) => format!("{}{tags}{}", &html[..m.start()], &html[m.start()..]),
        None if or_append => format!("{html}{tags}"),
        None => format!("{tags}{html}"),
    }
}
