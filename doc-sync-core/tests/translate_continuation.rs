use doc_sync_core::config::ProviderConfig;
use doc_sync_core::contract::{FinishReason, MockCompletionProvider, ProviderResponse, Role};
use doc_sync_core::error::{ConfigError, JobError, ProviderError};
use doc_sync_core::gate::ConcurrencyGate;
use doc_sync_core::transform::MarkdownTransformer;
use doc_sync_core::translate::{Instructions, TranslationJob, TranslationOrchestrator};
use tempfile::tempdir;

fn response(content: &str, finish_reason: &str) -> ProviderResponse {
    ProviderResponse {
        content: content.to_string(),
        finish_reason: FinishReason::from(finish_reason),
    }
}

fn orchestrator(
    provider: MockCompletionProvider,
    max_turns: usize,
) -> TranslationOrchestrator<MockCompletionProvider> {
    let config = ProviderConfig {
        max_turns,
        ..ProviderConfig::default()
    };
    TranslationOrchestrator::new(
        provider,
        ConcurrencyGate::new(2).expect("non-zero limit"),
        Instructions::builtin(),
        &config,
    )
    .expect("valid orchestrator config")
}

#[tokio::test]
async fn test_length_three_times_then_stop_concatenates_four_chunks() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src/docs/page.mdx");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "# Hello\n\nBody text.\n").unwrap();
    let destination = dir.path().join("dst/docs/nested/page.mdx");

    let mut provider = MockCompletionProvider::new();
    let mut calls = 0usize;
    provider.expect_complete().times(4).returning(move |conversation| {
        calls += 1;
        // system + user, then one assistant turn per truncated response
        assert_eq!(conversation.len(), calls + 1);
        assert_eq!(conversation[0].role, Role::System);
        assert!(conversation[0].content.contains("バージョン履歴"));
        assert_eq!(conversation[1].role, Role::User);
        assert_eq!(conversation[1].content, "# Hello\n\nBody text.\n");
        if calls > 1 {
            let last = conversation.last().unwrap();
            assert_eq!(last.role, Role::Assistant);
            assert_eq!(last.content, format!("chunk{} ", calls - 1));
        }
        if calls < 4 {
            Ok(response(&format!("chunk{calls} "), "length"))
        } else {
            Ok(response("chunk4", "stop"))
        }
    });

    let orchestrator = orchestrator(provider, 8);
    let outcomes = orchestrator
        .translate_all(vec![TranslationJob {
            source,
            destination: destination.clone(),
            language: "ja".to_string(),
        }])
        .await;

    assert_eq!(outcomes.len(), 1);
    let done = outcomes.into_iter().next().unwrap().expect("job succeeds");
    assert_eq!(done.turns, 4);
    assert_eq!(done.destination, destination);
    let written = std::fs::read_to_string(&destination).unwrap();
    assert_eq!(written, "chunk1 chunk2 chunk3 chunk4");
    assert_eq!(done.bytes, written.len());
}

#[tokio::test]
async fn test_unexpected_finish_reason_fails_without_writing() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("a.mdx");
    std::fs::write(&source, "text").unwrap();
    let destination = dir.path().join("out/a.mdx");

    let mut provider = MockCompletionProvider::new();
    provider
        .expect_complete()
        .times(1)
        .returning(|_| Ok(response("partial", "content_filter")));

    let orchestrator = orchestrator(provider, 8);
    let job = TranslationJob {
        source: source.clone(),
        destination: destination.clone(),
        language: "ja".to_string(),
    };
    let err = orchestrator
        .translate_one(&job)
        .await
        .expect_err("content_filter is not a success");

    match err {
        JobError::Provider { path, source: ProviderError::UnexpectedFinish(reason) } => {
            assert_eq!(path, source);
            assert_eq!(reason, "content_filter");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_continuation_is_bounded() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("long.mdx");
    std::fs::write(&source, "a very long page").unwrap();

    let mut provider = MockCompletionProvider::new();
    provider
        .expect_complete()
        .times(3)
        .returning(|_| Ok(response("more", "length")));

    let orchestrator = orchestrator(provider, 3);
    let err = orchestrator
        .translate_one(&TranslationJob {
            source,
            destination: dir.path().join("out/long.mdx"),
            language: "ja".to_string(),
        })
        .await
        .expect_err("provider never stops");

    assert!(matches!(
        err,
        JobError::Provider {
            source: ProviderError::ContinuationLimit { max_turns: 3 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_one_failing_job_does_not_block_its_siblings() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("present.mdx");
    std::fs::write(&present, "hello").unwrap();

    let mut provider = MockCompletionProvider::new();
    provider
        .expect_complete()
        .times(1)
        .returning(|_| Ok(response("こんにちは", "stop")));

    let orchestrator = orchestrator(provider, 8);
    let outcomes = orchestrator
        .translate_all(vec![
            TranslationJob {
                source: dir.path().join("missing.mdx"),
                destination: dir.path().join("out/missing.mdx"),
                language: "ja".to_string(),
            },
            TranslationJob {
                source: present,
                destination: dir.path().join("out/present.mdx"),
                language: "ja".to_string(),
            },
        ])
        .await;

    assert!(matches!(&outcomes[0], Err(JobError::Io { action: "read", .. })));
    assert!(outcomes[1].is_ok());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out/present.mdx")).unwrap(),
        "こんにちは"
    );
}

#[tokio::test]
async fn test_output_passes_through_transformer() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("page.mdx");
    std::fs::write(&source, "## Getting Started\n").unwrap();
    let destination = dir.path().join("out/page.mdx");

    let mut provider = MockCompletionProvider::new();
    provider
        .expect_complete()
        .times(1)
        .returning(|_| Ok(response("## Getting Started\n\nSee [pages](/docs/pages/intro).\n", "stop")));

    let orchestrator = orchestrator(provider, 8).with_transformer(MarkdownTransformer::default());
    orchestrator
        .translate_one(&TranslationJob {
            source,
            destination: destination.clone(),
            language: "ja".to_string(),
        })
        .await
        .expect("job succeeds");

    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        "## Getting Started {#getting-started}\n\nSee [pages](https://nextjs.org/docs/14/pages/intro).\n"
    );
}

#[tokio::test]
async fn test_language_without_instructions_fails_the_job() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("page.mdx");
    std::fs::write(&source, "text").unwrap();

    let provider = MockCompletionProvider::new();
    let orchestrator = orchestrator(provider, 8);
    let err = orchestrator
        .translate_one(&TranslationJob {
            source,
            destination: dir.path().join("out/page.mdx"),
            language: "fr".to_string(),
        })
        .await
        .expect_err("no French document is built in");

    assert!(matches!(
        err,
        JobError::Config {
            source: ConfigError::MissingInstructions(ref language),
            ..
        } if language == "fr"
    ));
}

#[test]
fn test_instructions_file_overrides_builtin_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fr.md");
    std::fs::write(&path, "Traduire en français.").unwrap();

    let config = ProviderConfig {
        instructions_file: Some(path),
        ..ProviderConfig::default()
    };
    let instructions = Instructions::load(&config, "fr").expect("override is readable");
    assert_eq!(
        instructions.for_language("fr").unwrap(),
        "Traduire en français."
    );
    assert!(instructions.for_language("ja").is_ok());
}

#[test]
fn test_zero_max_turns_is_rejected() {
    let config = ProviderConfig {
        max_turns: 0,
        ..ProviderConfig::default()
    };
    let result = TranslationOrchestrator::new(
        MockCompletionProvider::new(),
        ConcurrencyGate::new(1).unwrap(),
        Instructions::builtin(),
        &config,
    );
    assert!(matches!(result, Err(ConfigError::ZeroTurns)));
}
