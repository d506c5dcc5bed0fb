//! Ordered, first-match-wins rewriting of markdown link targets.

use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::OnceLock;

use super::fence::map_lines_outside_fences;
use crate::config::{LinkConditionConfig, LinkRewriteConfig, LinkRuleConfig};
use crate::error::ConfigError;

const CANONICAL_SITE: &str = "https://nextjs.org";

const MARKETING_ROUTES: &[&str] = &[
    "/learn",
    "/showcase",
    "/blog",
    "/conf",
    "/templates",
    "/enterprise",
    "/contact",
];

#[derive(Debug, Clone)]
pub enum LinkCondition {
    /// Matches the route itself or anything below it, on whole segments.
    Route(String),
    Routes(Vec<String>),
    Exact(String),
    Pattern(Regex),
}

impl LinkCondition {
    pub fn matches(&self, url: &str) -> bool {
        match self {
            LinkCondition::Route(route) => route_matches(route, url),
            LinkCondition::Routes(routes) => routes.iter().any(|r| route_matches(r, url)),
            LinkCondition::Exact(exact) => url == exact,
            LinkCondition::Pattern(re) => re.is_match(url),
        }
    }
}

fn route_matches(route: &str, url: &str) -> bool {
    let route = route.trim_end_matches('/');
    match url.strip_prefix(route) {
        Some("") => true,
        Some(rest) => rest.starts_with(['/', '#', '?']),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRewrite {
    ReplacePrefix { prefix: String, with: String },
    Resolve { base: String },
}

impl LinkRewrite {
    pub fn apply(&self, url: &str) -> String {
        match self {
            LinkRewrite::ReplacePrefix { prefix, with } => match url.strip_prefix(prefix.as_str()) {
                Some(rest) => format!("{with}{rest}"),
                None => url.to_string(),
            },
            LinkRewrite::Resolve { base } => {
                let base = base.trim_end_matches('/');
                if url.starts_with('/') {
                    format!("{base}{url}")
                } else {
                    format!("{base}/{url}")
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkRule {
    pub condition: LinkCondition,
    pub rewrite: LinkRewrite,
}

impl LinkRule {
    /// Builds a rule from config, substituting `{version}` in rewrite targets.
    pub fn from_config(config: &LinkRuleConfig, version: &str) -> Result<Self, ConfigError> {
        let condition = match &config.when {
            LinkConditionConfig::Route(r) => LinkCondition::Route(r.clone()),
            LinkConditionConfig::Routes(rs) => LinkCondition::Routes(rs.clone()),
            LinkConditionConfig::Exact(e) => LinkCondition::Exact(e.clone()),
            LinkConditionConfig::Pattern(p) => {
                LinkCondition::Pattern(Regex::new(p).map_err(|source| ConfigError::LinkPattern {
                    pattern: p.clone(),
                    source,
                })?)
            }
        };
        let rewrite = match &config.rewrite {
            LinkRewriteConfig::ReplacePrefix { prefix, with } => LinkRewrite::ReplacePrefix {
                prefix: prefix.clone(),
                with: with.replace("{version}", version),
            },
            LinkRewriteConfig::Resolve { base } => LinkRewrite::Resolve {
                base: base.replace("{version}", version),
            },
        };
        Ok(Self { condition, rewrite })
    }
}

/// The rules used when the config does not supply its own list.
pub fn default_link_rules(version: &str) -> Vec<LinkRule> {
    vec![
        LinkRule {
            condition: LinkCondition::Route("/docs/pages".to_string()),
            rewrite: LinkRewrite::ReplacePrefix {
                prefix: "/docs/pages".to_string(),
                with: format!("{CANONICAL_SITE}/docs/{version}/pages"),
            },
        },
        LinkRule {
            condition: LinkCondition::Route("/docs/messages".to_string()),
            rewrite: LinkRewrite::Resolve {
                base: CANONICAL_SITE.to_string(),
            },
        },
        LinkRule {
            condition: LinkCondition::Routes(MARKETING_ROUTES.iter().map(|r| r.to_string()).collect()),
            rewrite: LinkRewrite::Resolve {
                base: CANONICAL_SITE.to_string(),
            },
        },
        LinkRule {
            condition: LinkCondition::Route("/docs/app".to_string()),
            rewrite: LinkRewrite::ReplacePrefix {
                prefix: "/docs/app".to_string(),
                with: "/docs/app-router".to_string(),
            },
        },
    ]
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Link text may hold one level of nested image: `[![alt](src)](href)`.
        Regex::new(r#"(!?)\[((?:[^\[\]]|!\[[^\[\]]*\]\([^)\s]*\))*)\]\(([^)\s]+)((?:\s+"[^"]*")?)\)"#)
            .expect("valid link regex")
    })
}

/// Rewrites `url` with the first matching rule, or returns it unchanged.
pub fn rewrite_url(rules: &[LinkRule], url: &str) -> String {
    rules
        .iter()
        .find(|rule| rule.condition.matches(url))
        .map(|rule| rule.rewrite.apply(url))
        .unwrap_or_else(|| url.to_string())
}

/// Byte ranges of the inline code spans on one line. A backtick run opens a
/// span closed by the next run of the same length; unmatched runs are literal.
fn code_spans(line: &str) -> Vec<Range<usize>> {
    let bytes = line.as_bytes();
    let run_end = |mut i: usize| {
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        i
    };
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        i = run_end(i);
        let width = i - start;
        let mut j = i;
        while j < bytes.len() {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let close = run_end(j);
            if close - j == width {
                spans.push(start..close);
                i = close;
                break;
            }
            j = close;
        }
    }
    spans
}

pub fn rewrite_links(doc: &str, rules: &[LinkRule]) -> String {
    if rules.is_empty() {
        return doc.to_string();
    }
    map_lines_outside_fences(doc, |line| {
        let spans = code_spans(line);
        link_re()
            .replace_all(line, |caps: &Captures<'_>| {
                let at = caps.get(0).map_or(0, |m| m.start());
                if !caps[1].is_empty() || spans.iter().any(|span| span.contains(&at)) {
                    return caps[0].to_string();
                }
                format!("[{}]({}{})", &caps[2], rewrite_url(rules, &caps[3]), &caps[4])
            })
            .into_owned()
    })
}
