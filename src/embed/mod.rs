//! Embedded templates used by the plugin hooks.
//!
//! ```ignore
//! use embed::html::{INDEX_HTML, IndexVars};
//!
//! let html = INDEX_HTML.render(&IndexVars { title: "app".into() });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod html {
    use super::{Template, TemplateVars};
    use crate::utils::html::escape;

    /// Variables for the default entry document.
    pub struct IndexVars {
        pub title: String,
    }

    impl TemplateVars for IndexVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__TITLE__", &escape(&self.title))
        }
    }

    /// Entry document used when the html plugin has no `template`.
    pub const INDEX_HTML: Template<IndexVars> = Template::new(include_str!("html/index.html"));
}

pub mod sw {
    use super::{Template, TemplateVars};

    /// Variables for the precache manifest script.
    pub struct PrecacheVars {
        /// JSON array of `{ url, revision }` entries.
        pub entries: String,
    }

    impl TemplateVars for PrecacheVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__ENTRIES__", &self.entries)
        }
    }

    /// Variables for the service worker installer.
    pub struct ServiceWorkerVars {
        pub precache_manifest: String,
        pub cache_id: String,
        pub skip_waiting: bool,
        pub claim_clients: bool,
    }

    impl TemplateVars for ServiceWorkerVars {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__PRECACHE_MANIFEST__", &self.precache_manifest)
                .replace("__CACHE_ID__", &self.cache_id)
                .replace("__SKIP_WAITING__", if self.skip_waiting { "true" } else { "false" })
                .replace("__CLAIM_CLIENTS__", if self.claim_clients { "true" } else { "false" })
        }
    }

    pub const PRECACHE_MANIFEST_JS: Template<PrecacheVars> =
        Template::new(include_str!("sw/precache-manifest.js"));

    pub const SERVICE_WORKER_JS: Template<ServiceWorkerVars> =
        Template::new(include_str!("sw/service-worker.js"));
}

#[cfg(test)]
mod tests {
    use super::template::leftover_placeholders;
    use super::*;

    #[test]
    fn test_index_html() {
        let html = html::INDEX_HTML.render(&html::IndexVars { title: "a <b>".into() });
        assert!(html.contains("<title>a &lt;b&gt;</title>"));
        assert!(leftover_placeholders(&html).is_empty());
    }

    #[test]
    fn test_service_worker() {
        let js = sw::SERVICE_WORKER_JS.render(&sw::ServiceWorkerVars {
            precache_manifest: "precache-manifest.1234abcd.js".into(),
            cache_id: "1234abcd".into(),
            skip_waiting: true,
            claim_clients: false,
        });
        assert!(js.contains(r#"importScripts("precache-manifest.1234abcd.js")"#));
        assert!(js.contains("if (true)"));
        assert!(js.contains("if (false)"));
        assert!(leftover_placeholders(&js).is_empty());
    }

    #[test]
    fn test_precache_manifest() {
        let js = sw::PRECACHE_MANIFEST_JS.render(&sw::PrecacheVars { entries: "[]".into() });
        assert!(js.contains(".concat([])"));
        assert!(leftover_placeholders(&js).is_empty());
    }
}
