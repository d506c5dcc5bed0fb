//! Per-file translation through a [`CompletionProvider`], bounded by a [`ConcurrencyGate`].
//!
//! Each job is one conversation: a fixed system turn holding the
//! language's instruction document, then a user turn holding the file.
//! A response cut off by the length limit is appended as an assistant turn and
//! the provider is called again; the final text is every assistant
//! chunk concatenated in call order. The number of calls per job is capped by
//! `max_turns`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::ProviderConfig;
use crate::contract::{CompletionProvider, ConversationTurn, FinishReason};
use crate::error::{ConfigError, JobError, ProviderError};
use crate::gate::ConcurrencyGate;
use crate::persist;
use crate::transform::MarkdownTransformer;

const JAPANESE_INSTRUCTIONS: &str = include_str!("../prompts/ja.md");

/// A file whose content must be rewritten before it lands in the destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    /// Where the current content is read from.
    pub source: PathBuf,
    pub destination: PathBuf,
    pub language: String,
}

impl TranslationJob {
    pub async fn read_content(&self) -> Result<String, JobError> {
        tokio::fs::read_to_string(&self.source)
            .await
            .map_err(|e| JobError::io("read", &self.source, e))
    }
}

/// Result of a job whose output was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedFile {
    pub destination: PathBuf,
    /// Provider calls it took, continuations included.
    pub turns: usize,
    pub bytes: usize,
}

/// Language code → system-turn instruction document.
#[derive(Debug, Clone, Default)]
pub struct Instructions {
    documents: HashMap<String, String>,
}

impl Instructions {
    /// The documents shipped with the crate.
    pub fn builtin() -> Self {
        Self::default().with_document("ja", JAPANESE_INSTRUCTIONS)
    }

    pub fn with_document(mut self, language: &str, document: impl Into<String>) -> Self {
        self.documents.insert(language.to_string(), document.into());
        self
    }

    /// Built-in documents, with `language` replaced by the configured file if any.
    pub fn load(config: &ProviderConfig, language: &str) -> Result<Self, ConfigError> {
        let instructions = Self::builtin();
        let Some(path) = &config.instructions_file else {
            return Ok(instructions);
        };
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Instructions {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), language, "Loaded instruction document override");
        Ok(instructions.with_document(language, document))
    }

    pub fn for_language(&self, language: &str) -> Result<&str, ConfigError> {
        self.documents
            .get(language)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingInstructions(language.to_string()))
    }
}

pub struct TranslationOrchestrator<P> {
    provider: P,
    gate: ConcurrencyGate,
    instructions: Instructions,
    max_turns: usize,
    request_delay: Duration,
    transformer: Option<MarkdownTransformer>,
}

impl<P: CompletionProvider> TranslationOrchestrator<P> {
    pub fn new(
        provider: P,
        gate: ConcurrencyGate,
        instructions: Instructions,
        config: &ProviderConfig,
    ) -> Result<Self, ConfigError> {
        if config.max_turns == 0 {
            return Err(ConfigError::ZeroTurns);
        }
        Ok(Self {
            provider,
            gate,
            instructions,
            max_turns: config.max_turns,
            request_delay: Duration::from_millis(config.request_delay_ms),
            transformer: None,
        })
    }

    /// Post-processes every provider output before it is written.
    pub fn with_transformer(mut self, transformer: MarkdownTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Runs every job through the gate. Outcomes come back in job order; a
    /// failing job never stops the others.
    pub async fn translate_all(
        &self,
        jobs: Vec<TranslationJob>,
    ) -> Vec<Result<TranslatedFile, JobError>> {
        info!(
            jobs = jobs.len(),
            concurrency = self.gate.limit(),
            "Submitting translation jobs"
        );
        self.gate
            .drain(
                jobs.into_iter()
                    .map(|job| move || async move { self.translate_one(&job).await }),
            )
            .await
    }

    /// Reads, translates, post-processes and writes one file.
    pub async fn translate_one(&self, job: &TranslationJob) -> Result<TranslatedFile, JobError> {
        info!(source = %job.source.display(), language = %job.language, "Translating file");
        let result = self.run_job(job).await;
        match &result {
            Ok(done) => info!(
                destination = %done.destination.display(),
                turns = done.turns,
                bytes = done.bytes,
                "Translation written"
            ),
            Err(e) => error!(source = %job.source.display(), error = %e, "Translation job failed"),
        }
        result
    }

    async fn run_job(&self, job: &TranslationJob) -> Result<TranslatedFile, JobError> {
        let content = job.read_content().await?;
        let system = self
            .instructions
            .for_language(&job.language)
            .map_err(|source| JobError::Config {
                path: job.source.clone(),
                source,
            })?;
        let (output, turns) = self
            .converse(system, content)
            .await
            .map_err(|e| provider_failure(&job.source, e))?;
        let output = match &self.transformer {
            Some(transformer) => transformer.transform(&output),
            None => output,
        };
        let bytes = output.len();
        persist::write_atomic(&job.destination, output.into_bytes()).await?;
        Ok(TranslatedFile {
            destination: job.destination.clone(),
            turns,
            bytes,
        })
    }

    /// Drives one conversation to a `stop`, returning the joined output and
    /// the number of provider calls made.
    pub async fn converse(
        &self,
        system: &str,
        content: String,
    ) -> Result<(String, usize), ProviderError> {
        let mut conversation = vec![ConversationTurn::system(system), ConversationTurn::user(content)];
        let mut output = String::new();

        for turn in 1..=self.max_turns {
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            let response = self.provider.complete(&conversation).await?;
            debug!(
                turn,
                finish_reason = %response.finish_reason,
                chars = response.content.len(),
                "Provider turn finished"
            );
            output.push_str(&response.content);
            match response.finish_reason {
                FinishReason::Stop => return Ok((output, turn)),
                FinishReason::Length => {
                    conversation.push(ConversationTurn::assistant(response.content));
                }
                FinishReason::Other(reason) => return Err(ProviderError::UnexpectedFinish(reason)),
            }
        }
        Err(ProviderError::ContinuationLimit {
            max_turns: self.max_turns,
        })
    }
}

fn provider_failure(path: &Path, source: ProviderError) -> JobError {
    JobError::Provider {
        path: path.to_path_buf(),
        source,
    }
}
