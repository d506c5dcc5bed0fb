//! Code fence attribute rewrite: `filename="X"` becomes `title="X"`.

use regex::Regex;
use std::sync::OnceLock;

use super::fence::{segments, Segment};

fn filename_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)(^|\s)filename=""#).expect("valid filename regex"))
}

pub fn rewrite_filename_attributes(doc: &str) -> String {
    let mut out = String::with_capacity(doc.len());
    for segment in segments(doc) {
        match segment {
            Segment::Fence(block) if !block.info.is_empty() => {
                out.push_str(&filename_attr().replace_all(block.open, r#"${1}title=""#));
                out.push_str(block.body);
                out.push_str(block.close);
            }
            other => other.push_raw(&mut out),
        }
    }
    out
}
