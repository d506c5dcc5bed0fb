//! Explicit `{#anchor}` ids for ATX headings.

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use super::fence::{front_matter_end, map_lines_outside_fences};

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^( {0,3})(#{1,6})[ \t]+(.*?)[ \t]*$").expect("valid heading regex")
    })
}

fn existing_anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{#[^}]*\}$").expect("valid anchor regex"))
}

fn closing_hashes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|[ \t]+)#+$").expect("valid closing sequence regex"))
}

fn inline_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!?\[([^\[\]]*)\]\([^)]*\)").expect("valid inline link regex"))
}

/// Heading text as rendered: link and image syntax reduced to its text, code
/// span backticks dropped.
fn visible_text(text: &str) -> String {
    let once = inline_link_re().replace_all(text, "$1");
    // A second pass unwraps a link whose text was an image.
    let twice = inline_link_re().replace_all(&once, "$1");
    twice.replace('`', "")
}

/// Lower-cases `text` and collapses every run of characters outside `[a-z0-9]`
/// into one hyphen, trimming hyphens at both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn anchor_line(line: &str) -> Option<String> {
    let (content, ending) = match line.strip_suffix("\r\n") {
        Some(c) => (c, "\r\n"),
        None => match line.strip_suffix('\n') {
            Some(c) => (c, "\n"),
            None => (line, ""),
        },
    };
    let caps = heading_re().captures(content)?;
    let text = closing_hashes_re().replace(&caps[3], "");
    if text.is_empty() || existing_anchor_re().is_match(&text) {
        return None;
    }
    let slug = slugify(&visible_text(&text));
    if slug.is_empty() {
        warn!(heading = %text, "Heading has no ASCII characters to derive an anchor from");
        return None;
    }
    Some(format!("{}{} {} {{#{}}}{}", &caps[1], &caps[2], text, slug, ending))
}

/// Front matter is copied through untouched.
pub fn inject_heading_anchors(doc: &str) -> String {
    let (front_matter, body) = doc.split_at(front_matter_end(doc).unwrap_or(0));
    let mut out = front_matter.to_string();
    out.push_str(&map_lines_outside_fences(body, |line| {
        anchor_line(line).unwrap_or_else(|| line.to_string())
    }));
    out
}
