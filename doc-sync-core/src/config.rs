use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything a sync run needs, passed explicitly into each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root of the reference tree that diff paths are read from.
    pub source_dir: PathBuf,
    /// Root of the destination tree that diff paths are written to.
    pub dest_dir: PathBuf,
    /// Every path in the change-list must live under this prefix.
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,
    /// Language used when the caller does not pick one. `None` means copy only.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Renames/copies scoring at or above this become a plain move.
    /// `None` always re-reads and rewrites the target.
    #[serde(default = "default_move_similarity_threshold")]
    pub move_similarity_threshold: Option<u8>,
    /// Extensions (without dot) whose upserts are routed through translation.
    #[serde(default = "default_translate_extensions")]
    pub translate_extensions: Vec<String>,
    /// Written with the tracked revision pair after a run without failures.
    #[serde(default)]
    pub revision_file: Option<PathBuf>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            source_dir = %self.source_dir.display(),
            dest_dir = %self.dest_dir.display(),
            root_prefix = %self.root_prefix,
            language = self.language.as_deref().unwrap_or("none"),
            concurrency = self.concurrency,
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }

    /// Builds a config with defaults for everything but the two tree roots.
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            root_prefix: default_root_prefix(),
            language: None,
            concurrency: default_concurrency(),
            move_similarity_threshold: default_move_similarity_threshold(),
            translate_extensions: default_translate_extensions(),
            revision_file: None,
            provider: ProviderConfig::default(),
            transform: TransformConfig::default(),
        }
    }

    /// Whether an upsert of `path` needs its content rewritten.
    pub fn needs_translation(&self, path: &str) -> bool {
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        if ext.contains('/') {
            return false;
        }
        self.translate_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Completion provider settings. The API key comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on provider calls per file, continuations included.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Fixed pause before each provider call.
    #[serde(default)]
    pub request_delay_ms: u64,
    /// Replaces the built-in instruction document for the active language.
    #[serde(default)]
    pub instructions_file: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            max_turns: default_max_turns(),
            request_delay_ms: 0,
            instructions_file: None,
        }
    }
}

/// Markdown post-processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Substituted for `{version}` in link rule targets.
    #[serde(default = "default_docs_version")]
    pub docs_version: String,
    #[serde(default = "default_true")]
    pub strip_pages_only: bool,
    /// Merged over the built-in language → tab label table.
    #[serde(default)]
    pub switcher_labels: BTreeMap<String, String>,
    /// Replaces the built-in rule list when present.
    #[serde(default)]
    pub link_rules: Option<Vec<LinkRuleConfig>>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            docs_version: default_docs_version(),
            strip_pages_only: true,
            switcher_labels: BTreeMap::new(),
            link_rules: None,
        }
    }
}

/// A link rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRuleConfig {
    pub when: LinkConditionConfig,
    pub rewrite: LinkRewriteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LinkConditionConfig {
    /// Whole-segment path prefix.
    Route(String),
    /// Any of the listed routes, each matched like [`LinkConditionConfig::Route`].
    Routes(Vec<String>),
    /// Exact URL match.
    Exact(String),
    /// Regular expression over the URL.
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkRewriteConfig {
    /// Swap a leading prefix for `with` (which may contain `{version}`).
    ReplacePrefix { prefix: String, with: String },
    /// Prepend `base` to the URL.
    Resolve { base: String },
}

fn default_root_prefix() -> String {
    "docs".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_move_similarity_threshold() -> Option<u8> {
    Some(100)
}

fn default_translate_extensions() -> Vec<String> {
    vec!["md".to_string(), "mdx".to_string()]
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_turns() -> usize {
    8
}

fn default_docs_version() -> String {
    "14".to_string()
}

fn default_true() -> bool {
    true
}
