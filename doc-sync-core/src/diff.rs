//! Change-list parsing: raw `--name-status` style records into a typed [`DiffSet`].
//!
//! Two input shapes are accepted:
//! - plain text, one record per non-blank line: `<status><score?>\t<path>` or
//!   `<status><score?>\t<from>\t<to>`;
//! - a JSON envelope `{ "submodule", "hash": { "previous"?, "current" }, "diffs": [..] }`
//!   whose `diffs` holds the same records.
//!
//! Records are tab-separated when the line contains a tab (paths may then
//! contain spaces); otherwise any whitespace separates tokens. Parsing is
//! all-or-nothing: the first bad record fails the whole change-list.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ParseError;

/// Status letters carried through unvalidated: type change, unmerged,
/// unknown, broken pairing and all-or-none pairing.
const OPAQUE_STATUSES: &[char] = &['T', 'U', 'X', 'B', '*'];

/// One classified file change between two revisions of the reference tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry {
    Added {
        path: String,
    },
    Modified {
        path: String,
    },
    Deleted {
        path: String,
    },
    Renamed {
        from: String,
        to: String,
        score: Option<u8>,
    },
    Copied {
        from: String,
        to: String,
        score: Option<u8>,
    },
    /// A status whose file mapping is not known; `raw` is everything after the status token.
    Opaque {
        status: String,
        raw: String,
    },
}

impl DiffEntry {
    /// Short status token, as it would appear in the change-list.
    pub fn status(&self) -> String {
        match self {
            DiffEntry::Added { .. } => "A".to_string(),
            DiffEntry::Modified { .. } => "M".to_string(),
            DiffEntry::Deleted { .. } => "D".to_string(),
            DiffEntry::Renamed { score, .. } => with_score('R', *score),
            DiffEntry::Copied { score, .. } => with_score('C', *score),
            DiffEntry::Opaque { status, .. } => status.clone(),
        }
    }
}

fn with_score(letter: char, score: Option<u8>) -> String {
    match score {
        Some(s) => format!("{letter}{s:03}"),
        None => letter.to_string(),
    }
}

/// Revision hashes of the reference tree the change-list was computed between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRange {
    #[serde(default)]
    pub previous: Option<String>,
    pub current: String,
}

/// A parsed change-list. Entry order is the order of the input records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSet {
    pub repository: Option<String>,
    pub revision: Option<RevisionRange>,
    pub entries: Vec<DiffEntry>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    submodule: String,
    hash: RevisionRange,
    diffs: Vec<String>,
}

/// Parses change-lists, validating every path against a root prefix.
#[derive(Debug, Clone)]
pub struct DiffRecordParser {
    root_prefix: String,
}

impl DiffRecordParser {
    pub fn new(root_prefix: &str) -> Self {
        Self {
            root_prefix: root_prefix.trim_matches('/').to_string(),
        }
    }

    /// Parses either input shape, picking JSON when the input starts with `{`.
    pub fn parse(&self, input: &str) -> Result<DiffSet, ParseError> {
        if input.trim_start().starts_with('{') {
            self.parse_envelope(input)
        } else {
            let entries = self.parse_records(input.lines())?;
            Ok(DiffSet {
                repository: None,
                revision: None,
                entries,
            })
        }
    }

    pub fn parse_envelope(&self, input: &str) -> Result<DiffSet, ParseError> {
        let envelope: Envelope = serde_json::from_str(input)?;
        let entries = self.parse_records(envelope.diffs.iter().map(String::as_str))?;
        info!(
            repository = %envelope.submodule,
            current = %envelope.hash.current,
            entries = entries.len(),
            "Parsed change-list envelope"
        );
        Ok(DiffSet {
            repository: Some(envelope.submodule),
            revision: Some(envelope.hash),
            entries,
        })
    }

    /// Parses records, numbering lines from 1 and skipping blank ones.
    pub fn parse_records<'a, I>(&self, lines: I) -> Result<Vec<DiffEntry>, ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = Vec::new();
        for (idx, raw) in lines.into_iter().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let entry = self.parse_line(idx + 1, raw)?;
            debug!(line = idx + 1, status = %entry.status(), "Parsed diff record");
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Parses one record. `line` is only used for error reporting.
    pub fn parse_line(&self, line: usize, raw: &str) -> Result<DiffEntry, ParseError> {
        // Leading tabs are kept so a blank status field stays detectable.
        let text = raw.trim_end().trim_start_matches(' ');
        let (status, rest) = if text.contains('\t') {
            text.split_once('\t').unwrap_or((text, ""))
        } else {
            text.split_once(char::is_whitespace).unwrap_or((text, ""))
        };
        let paths = split_paths(rest);

        let mut chars = status.chars();
        let Some(letter) = chars.next() else {
            if paths.is_empty() {
                return Err(ParseError::Malformed {
                    line,
                    text: text.to_string(),
                });
            }
            return Ok(DiffEntry::Opaque {
                status: String::new(),
                raw: rest.trim().to_string(),
            });
        };
        let digits = chars.as_str();
        let known = matches!(letter, 'A' | 'M' | 'D' | 'R' | 'C') || OPAQUE_STATUSES.contains(&letter);
        if !known || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::UnknownStatus {
                line,
                status: status.to_string(),
                text: text.to_string(),
            });
        }

        match letter {
            'A' | 'M' | 'D' => {
                let [path] = self.expect_paths::<1>(line, text, letter, &paths)?;
                Ok(match letter {
                    'A' => DiffEntry::Added { path },
                    'M' => DiffEntry::Modified { path },
                    _ => DiffEntry::Deleted { path },
                })
            }
            'R' | 'C' => {
                let score = parse_score(line, text, digits)?;
                let [from, to] = self.expect_paths::<2>(line, text, letter, &paths)?;
                Ok(if letter == 'R' {
                    DiffEntry::Renamed { from, to, score }
                } else {
                    DiffEntry::Copied { from, to, score }
                })
            }
            _ => Ok(DiffEntry::Opaque {
                status: status.to_string(),
                raw: rest.trim().to_string(),
            }),
        }
    }

    fn expect_paths<const N: usize>(
        &self,
        line: usize,
        text: &str,
        status: char,
        paths: &[&str],
    ) -> Result<[String; N], ParseError> {
        if paths.len() != N {
            return Err(ParseError::PathCount {
                line,
                status,
                expected: N,
                found: paths.len(),
                text: text.to_string(),
            });
        }
        for path in paths {
            if !self.is_under_root(path) {
                return Err(ParseError::OutsideRoot {
                    line,
                    path: path.to_string(),
                    prefix: self.root_prefix.clone(),
                    text: text.to_string(),
                });
            }
        }
        Ok(std::array::from_fn(|i| paths[i].to_string()))
    }

    fn is_under_root(&self, path: &str) -> bool {
        if self.root_prefix.is_empty() {
            return !path.is_empty();
        }
        path.strip_prefix(self.root_prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }
}

fn split_paths(rest: &str) -> Vec<&str> {
    if rest.contains('\t') {
        rest.split('\t')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        rest.split_whitespace().collect()
    }
}

fn parse_score(line: usize, text: &str, digits: &str) -> Result<Option<u8>, ParseError> {
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<u8>() {
        Ok(score) if score <= 100 => Ok(Some(score)),
        _ => Err(ParseError::ScoreOutOfRange {
            line,
            score: digits.to_string(),
            text: text.to_string(),
        }),
    }
}
