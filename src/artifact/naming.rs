//! Output name templates.
//!
//! | token      | value                                  |
//! |------------|----------------------------------------|
//! | `[path]`   | source directory with trailing `/`     |
//! | `[name]`   | file stem                              |
//! | `[ext]`    | output extension                       |
//! | `[hash]`   | content hash, 20 hex chars             |
//! | `[hash:N]` | content hash, N hex chars              |

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::utils::hash::ContentHash;
use crate::utils::path::split_id;

const DEFAULT_HASH_LEN: usize = 20;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([a-z]+)(?::(\d+))?\]").unwrap());

/// Check a template for unknown tokens.
pub fn validate_template(template: &str) -> Result<(), String> {
    if template.trim().is_empty() {
        return Err("template is empty".into());
    }
    for caps in TOKEN.captures_iter(template) {
        match (&caps[1], caps.get(2)) {
            ("hash", _) | ("path" | "name" | "ext", None) => {}
            _ => return Err(format!("unknown token `{}`", &caps[0])),
        }
    }
    if template.starts_with('/') || template.split('/').any(|s| s == "..") {
        return Err("template must stay inside the output directory".into());
    }
    Ok(())
}

/// Render `template` for asset `id` with output `extension`.
pub fn render(template: &str, id: &str, extension: &str, hash: ContentHash) -> String {
    let (dir, stem, _) = split_id(id);
    let rendered = TOKEN.replace_all(template, |caps: &Captures| match &caps[1] {
        "path" => dir.to_string(),
        "name" => stem.to_string(),
        "ext" => extension.to_string(),
        "hash" => {
            let len = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(DEFAULT_HASH_LEN);
            hash.short(len)
        }
        _ => caps[0].to_string(),
    });
    // `[name].[ext]` with an empty extension would leave a trailing dot
    let rendered = rendered.strip_suffix('.').unwrap_or(&rendered);
    rendered.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tokens() {
        let hash = ContentHash::of(b"content");
        let short = hash.short(8);
        assert_eq!(
            render("[path][name].[hash:8].[ext]", "css/site.less", "css", hash),
            format!("css/site.{short}.css")
        );
        assert_eq!(render("[name].[ext]", "img/a.png", "png", hash), "a.png");
        assert_eq!(
            render("static/[name]-[hash].[ext]", "a.js", "js", hash),
            format!("static/a-{}.js", hash.short(20))
        );
        assert_eq!(render("[path][name].[ext]", "LICENSE", "", hash), "LICENSE");
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template("[path][name].[hash:8].[ext]").is_ok());
        assert!(validate_template("[name]-[hash].[ext]").is_ok());
        assert!(validate_template("[name].[contenthash].[ext]").is_err());
        assert!(validate_template("[name:3].[ext]").is_err());
        assert!(validate_template("../[name].[ext]").is_err());
        assert!(validate_template("").is_err());
    }
}
