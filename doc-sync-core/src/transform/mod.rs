//! Deterministic markdown post-processing.
//!
//! Passes run in a fixed order over one whole document and share no state
//! between documents:
//! 0. optional removal of `<PagesOnly>` blocks;
//! 1. fence `filename="…"` → `title="…"`;
//! 2. merge of consecutive switcher fences into tab groups;
//! 3. link target rewriting;
//! 4. heading anchor injection.

mod attributes;
mod fence;
mod headings;
mod links;
mod tabs;

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub use attributes::rewrite_filename_attributes;
pub use headings::{inject_heading_anchors, slugify};
pub use links::{default_link_rules, rewrite_links, rewrite_url, LinkCondition, LinkRewrite, LinkRule};
pub use tabs::{default_labels, merge_tab_groups, run_key, FlushTrigger, TabItem, TabMerger};

use crate::config::TransformConfig;
use crate::error::ConfigError;

fn pages_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<PagesOnly>.*?</PagesOnly>[ \t]*(\r?\n)?").expect("valid PagesOnly regex")
    })
}

/// Drops content only relevant to the Pages Router.
pub fn strip_pages_only(doc: &str) -> String {
    pages_only_re().replace_all(doc, "").into_owned()
}

#[derive(Debug, Clone)]
pub struct MarkdownTransformer {
    strip_pages_only: bool,
    labels: BTreeMap<String, String>,
    link_rules: Vec<LinkRule>,
}

impl MarkdownTransformer {
    pub fn new(config: &TransformConfig) -> Result<Self, ConfigError> {
        let mut labels = default_labels();
        labels.extend(config.switcher_labels.clone());
        let link_rules = match &config.link_rules {
            Some(rules) => rules
                .iter()
                .map(|r| LinkRule::from_config(r, &config.docs_version))
                .collect::<Result<Vec<_>, _>>()?,
            None => default_link_rules(&config.docs_version),
        };
        Ok(Self {
            strip_pages_only: config.strip_pages_only,
            labels,
            link_rules,
        })
    }

    pub fn link_rules(&self) -> &[LinkRule] {
        &self.link_rules
    }

    pub fn transform(&self, doc: &str) -> String {
        let doc = if self.strip_pages_only {
            strip_pages_only(doc)
        } else {
            doc.to_string()
        };
        let doc = rewrite_filename_attributes(&doc);
        let doc = merge_tab_groups(&doc, &self.labels);
        let doc = rewrite_links(&doc, &self.link_rules);
        inject_heading_anchors(&doc)
    }
}

impl Default for MarkdownTransformer {
    fn default() -> Self {
        Self {
            strip_pages_only: true,
            labels: default_labels(),
            link_rules: default_link_rules(&TransformConfig::default().docs_version),
        }
    }
}
