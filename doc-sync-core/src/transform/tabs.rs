//! Merges runs of parallel "switcher" code samples into one tab container.
//!
//! A block is eligible when its info string carries a language, the bare
//! `switcher` flag and a `title="…"` attribute. Eligible blocks separated only
//! by blank lines and sharing a title (once its extension is stripped) form a
//! run; everything else is emitted unchanged.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use super::fence::{front_matter_end, segments, FencedBlock, Segment};

const TABS_IMPORT: &str = "import Tabs from '@theme/Tabs'";
const TAB_ITEM_IMPORT: &str = "import TabItem from '@theme/TabItem'";

/// Built-in language tag → tab label table.
pub fn default_labels() -> BTreeMap<String, String> {
    [
        ("tsx", "TypeScript"),
        ("ts", "TypeScript"),
        ("typescript", "TypeScript"),
        ("jsx", "JavaScript"),
        ("js", "JavaScript"),
        ("mjs", "JavaScript"),
        ("javascript", "JavaScript"),
        ("bash", "Terminal"),
        ("sh", "Terminal"),
        ("json", "JSON"),
        ("css", "CSS"),
        ("py", "Python"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// One sample inside a tab group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabItem {
    pub language: String,
    pub label: String,
    pub title: String,
    pub code: String,
    pub highlight: Option<String>,
}

/// Why an open run was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The next switcher block has a different stripped title.
    TitleChanged,
    /// The next switcher block shares the title but sits at another indent.
    IndentChanged,
    /// Something other than whitespace followed the run.
    ContentIntervened,
    EndOfInput,
}

enum ScanState {
    Scanning,
    InRun {
        key: String,
        indent: String,
        items: Vec<TabItem>,
        /// Blank lines seen after the last item, emitted only if the run ends.
        trailing: String,
    },
}

/// Single-pass state machine over document segments.
pub struct TabMerger<'l> {
    labels: &'l BTreeMap<String, String>,
    state: ScanState,
    out: String,
    groups: usize,
}

impl<'l> TabMerger<'l> {
    pub fn new(labels: &'l BTreeMap<String, String>) -> Self {
        Self {
            labels,
            state: ScanState::Scanning,
            out: String::new(),
            groups: 0,
        }
    }

    /// Feeds an eligible block. Returns the trigger if it closed the previous run.
    pub fn on_switcher(&mut self, item: TabItem, indent: &str) -> Option<FlushTrigger> {
        let key = run_key(&item.title).to_string();
        let mut reason = FlushTrigger::TitleChanged;
        if let ScanState::InRun {
            key: open_key,
            indent: open_indent,
            items,
            trailing,
        } = &mut self.state
        {
            if *open_key == key {
                if open_indent.as_str() == indent {
                    trailing.clear();
                    items.push(item);
                    return None;
                }
                reason = FlushTrigger::IndentChanged;
            }
        }
        let trigger = self.flush(reason);
        self.state = ScanState::InRun {
            key,
            indent: indent.to_string(),
            items: vec![item],
            trailing: String::new(),
        };
        trigger
    }

    /// Feeds a whitespace-only line.
    pub fn on_blank(&mut self, line: &str) {
        match &mut self.state {
            ScanState::InRun { trailing, .. } => trailing.push_str(line),
            ScanState::Scanning => self.out.push_str(line),
        }
    }

    /// Feeds any other text. Closes the open run first.
    pub fn on_content(&mut self, raw: &str) -> Option<FlushTrigger> {
        let trigger = self.flush(FlushTrigger::ContentIntervened);
        self.out.push_str(raw);
        trigger
    }

    /// Closes any open run and returns the output plus the number of groups rendered.
    pub fn finish(mut self) -> (String, usize) {
        self.flush(FlushTrigger::EndOfInput);
        (self.out, self.groups)
    }

    fn flush(&mut self, trigger: FlushTrigger) -> Option<FlushTrigger> {
        let ScanState::InRun {
            key,
            indent,
            items,
            trailing,
        } = std::mem::replace(&mut self.state, ScanState::Scanning)
        else {
            return None;
        };
        debug!(title = %key, items = items.len(), ?trigger, "Flushing tab group");
        render_group(&mut self.out, &indent, &items);
        self.out.push_str(&trailing);
        self.groups += 1;
        Some(trigger)
    }

    pub fn label_for(&self, language: &str) -> String {
        self.labels
            .get(language)
            .or_else(|| self.labels.get(&language.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_else(|| language.to_string())
    }
}

/// Title with a trailing file extension removed: `app/page.tsx` → `app/page`.
pub fn run_key(title: &str) -> &str {
    let name_start = title.rfind('/').map_or(0, |i| i + 1);
    match title[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &title[..name_start + dot],
        _ => title,
    }
}

fn title_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:^|\s)title="([^"]*)""#).expect("valid title regex"))
}

fn highlight_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\s)(?:highlight=)?(\{[0-9,\s-]+\})").expect("valid highlight regex")
    })
}

fn quoted() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[^"]*""#).expect("valid quoted regex"))
}

/// Extracts a tab item from an eligible block, `None` otherwise.
fn switcher_item(block: &FencedBlock<'_>, merger: &TabMerger<'_>) -> Option<TabItem> {
    let unquoted = quoted().replace_all(block.info, "\"\"");
    let mut tokens = unquoted.split_whitespace();
    let language = tokens.next().filter(|t| !t.contains('='))?;
    if !tokens.any(|t| t == "switcher") {
        return None;
    }
    let title = title_attr().captures(block.info)?.get(1)?.as_str().to_string();
    let highlight = highlight_attr()
        .captures(block.info)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    Some(TabItem {
        language: language.to_string(),
        label: merger.label_for(language),
        title,
        code: block.body.to_string(),
        highlight,
    })
}

fn render_group(out: &mut String, indent: &str, items: &[TabItem]) {
    out.push_str(&format!("{indent}<Tabs groupId=\"language\" queryString>\n"));
    for item in items {
        out.push_str(&format!(
            "{indent}  <TabItem value=\"{}\" label=\"{}\">\n\n",
            item.language, item.label
        ));
        let fence = fence_for(&item.code);
        out.push_str(&format!("{indent}{fence}{} title=\"{}\"", item.language, item.title));
        if let Some(highlight) = &item.highlight {
            out.push(' ');
            out.push_str(highlight);
        }
        out.push('\n');
        out.push_str(&item.code);
        if !item.code.is_empty() && !item.code.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{indent}{fence}\n\n{indent}  </TabItem>\n"));
    }
    out.push_str(&format!("{indent}</Tabs>\n"));
}

/// A backtick fence longer than any backtick run inside `code`.
fn fence_for(code: &str) -> String {
    let longest = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// Runs the merge over a whole document.
pub fn merge_tab_groups(doc: &str, labels: &BTreeMap<String, String>) -> String {
    let mut merger = TabMerger::new(labels);
    for segment in segments(doc) {
        match &segment {
            Segment::Fence(block) => match switcher_item(block, &merger) {
                Some(item) => {
                    merger.on_switcher(item, block.indent);
                }
                None => {
                    let mut raw = String::new();
                    segment.push_raw(&mut raw);
                    merger.on_content(&raw);
                }
            },
            Segment::Line(line) if segment.is_blank() => merger.on_blank(line),
            Segment::Line(line) => {
                merger.on_content(line);
            }
        }
    }
    let (out, groups) = merger.finish();
    if groups > 0 {
        ensure_tab_imports(&out)
    } else {
        out
    }
}

fn tabs_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^import\s+Tabs\s+from\s+['"]@theme/Tabs['"]"#).expect("valid import regex")
    })
}

fn tab_item_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^import\s+TabItem\s+from\s+['"]@theme/TabItem['"]"#)
            .expect("valid import regex")
    })
}

/// Inserts the `Tabs`/`TabItem` imports after any front matter unless already present.
fn ensure_tab_imports(doc: &str) -> String {
    let mut missing = Vec::new();
    if !tabs_import_re().is_match(doc) {
        missing.push(TABS_IMPORT);
    }
    if !tab_item_import_re().is_match(doc) {
        missing.push(TAB_ITEM_IMPORT);
    }
    if missing.is_empty() {
        return doc.to_string();
    }
    let imports = format!("{}\n\n", missing.join("\n"));
    let at = front_matter_end(doc).unwrap_or(0);
    let mut out = String::with_capacity(doc.len() + imports.len() + 1);
    out.push_str(&doc[..at]);
    if at > 0 {
        out.push('\n');
    }
    out.push_str(&imports);
    out.push_str(doc[at..].trim_start_matches('\n'));
    out
}
