//! Line scanner splitting a markdown document into plain lines and fenced code blocks.
//!
//! Concatenating the raw text of every segment reproduces the input exactly.

/// A piece of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// One line outside any fence, line ending included.
    Line(&'a str),
    Fence(FencedBlock<'a>),
}

/// A fenced code block. `close` is empty when the fence runs to end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FencedBlock<'a> {
    pub open: &'a str,
    pub indent: &'a str,
    pub info: &'a str,
    pub body: &'a str,
    pub close: &'a str,
}

impl FencedBlock<'_> {
    pub fn push_raw(&self, out: &mut String) {
        out.push_str(self.open);
        out.push_str(self.body);
        out.push_str(self.close);
    }
}

impl Segment<'_> {
    pub fn push_raw(&self, out: &mut String) {
        match self {
            Segment::Line(line) => out.push_str(line),
            Segment::Fence(block) => block.push_raw(out),
        }
    }

    /// A line containing nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, Segment::Line(line) if line.trim().is_empty())
    }
}

struct Opening<'a> {
    indent: &'a str,
    marker: &'a str,
    info: &'a str,
}

fn opening(line: &str) -> Option<Opening<'_>> {
    let content = line.trim_end_matches(['\n', '\r']);
    let stripped = content.trim_start_matches(' ');
    let indent_len = content.len() - stripped.len();
    if indent_len > 3 {
        return None;
    }
    let fence_char = stripped.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = stripped.len() - stripped.trim_start_matches(fence_char).len();
    if run < 3 {
        return None;
    }
    let info = stripped[run..].trim();
    if fence_char == '`' && info.contains('`') {
        return None;
    }
    Some(Opening {
        indent: &content[..indent_len],
        marker: &stripped[..run],
        info,
    })
}

fn closes(line: &str, marker: &str) -> bool {
    let content = line.trim_end_matches(['\n', '\r']);
    let stripped = content.trim_start_matches(' ');
    if content.len() - stripped.len() > 3 {
        return false;
    }
    let Some(fence_char) = marker.chars().next() else {
        return false;
    };
    let run = stripped.len() - stripped.trim_start_matches(fence_char).len();
    run >= marker.len() && stripped[run..].trim().is_empty()
}

pub(crate) fn segments(doc: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut lines = doc.split_inclusive('\n');
    let mut offset = 0;

    while let Some(line) = lines.next() {
        let start = offset;
        offset += line.len();
        let Some(open) = opening(line) else {
            out.push(Segment::Line(line));
            continue;
        };

        let body_start = offset;
        let mut close = "";
        let mut body_end = body_start;
        for inner in lines.by_ref() {
            if closes(inner, open.marker) {
                body_end = offset;
                offset += inner.len();
                close = inner;
                break;
            }
            offset += inner.len();
            body_end = offset;
        }
        out.push(Segment::Fence(FencedBlock {
            open: &doc[start..body_start],
            indent: open.indent,
            info: open.info,
            body: &doc[body_start..body_end],
            close,
        }));
    }
    out
}

/// Applies `f` to every line outside fenced code blocks.
pub(crate) fn map_lines_outside_fences(doc: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(doc.len());
    for segment in segments(doc) {
        match segment {
            Segment::Line(line) => out.push_str(&f(line)),
            Segment::Fence(block) => block.push_raw(&mut out),
        }
    }
    out
}

/// Byte offset just past the closing `---` line of a leading front matter block.
pub(crate) fn front_matter_end(doc: &str) -> Option<usize> {
    let mut lines = doc.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        if line.trim_end() == "---" {
            return Some(offset);
        }
    }
    None
}
