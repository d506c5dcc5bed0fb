use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{create_dir_all, read_to_string, write};
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Reference and destination trees plus a config pointing at them.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().expect("Creating temp dir failed");
        let ws = Workspace { dir };
        ws.write("reference/docs/x.mdx", "# Routing\n");
        ws.write("reference/docs/logo.svg", "<svg/>");
        ws.write("site/docs/y.mdx", "# old\n");
        ws.write("site/docs/z.mdx", "# moved\n");
        ws.write(
            "config.yaml",
            &format!(
                "source_dir: {}\ndest_dir: {}\nrevision_file: {}\n",
                ws.path("reference").display(),
                ws.path("site").display(),
                ws.path("site/.sync/revision.json").display(),
            ),
        );
        ws
    }

    fn path(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        create_dir_all(path.parent().unwrap()).unwrap();
        write(path, content).expect("Writing fixture failed");
    }

    fn config(&self) -> std::path::PathBuf {
        self.path("config.yaml")
    }
}

fn doc_sync() -> Command {
    let mut cmd = Command::cargo_bin("doc-sync").expect("Binary exists");
    cmd.env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn plan_prints_operations_in_change_list_order() {
    let ws = Workspace::new();
    ws.write(
        "diff.txt",
        "A\tdocs/x.mdx\nD\tdocs/y.mdx\nR100\tdocs/z.mdx\tdocs/w.mdx\nR050\tdocs/a.mdx\tdocs/b.mdx\n",
    );

    let assert = doc_sync()
        .arg("plan")
        .arg("--config")
        .arg(ws.config())
        .arg("--diff")
        .arg(ws.path("diff.txt"))
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with(['A', 'D', 'R']) && l.contains('\t'))
        .collect();
    assert_eq!(
        lines,
        vec![
            "A\tupsert docs/x.mdx",
            "D\tremove docs/y.mdx",
            "R100\tmove docs/z.mdx -> docs/w.mdx",
            "R050\tremove docs/a.mdx",
            "R050\tupsert docs/b.mdx",
        ]
    );
    // Planning never touches the trees.
    assert!(ws.path("site/docs/y.mdx").exists());
}

#[test]
fn plan_fails_on_malformed_change_list() {
    let ws = Workspace::new();
    ws.write("diff.txt", "A\tdocs/x.mdx\nA\tREADME.md\n");

    doc_sync()
        .arg("plan")
        .arg("--config")
        .arg(ws.config())
        .arg("--diff")
        .arg(ws.path("diff.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn sync_without_language_copies_removes_and_moves() {
    let ws = Workspace::new();
    ws.write(
        "diff.json",
        r#"{"submodule":"next.js","hash":{"previous":"aaa","current":"bbb"},"diffs":["A\tdocs/x.mdx","A\tdocs/logo.svg","D\tdocs/y.mdx","R100\tdocs/z.mdx\tdocs/w.mdx"]}"#,
    );

    doc_sync()
        .arg("sync")
        .arg("--config")
        .arg(ws.config())
        .arg("--diff")
        .arg(ws.path("diff.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ok\tmove docs/z.mdx -> docs/w.mdx"));

    assert_eq!(read_to_string(ws.path("site/docs/x.mdx")).unwrap(), "# Routing\n");
    assert_eq!(read_to_string(ws.path("site/docs/logo.svg")).unwrap(), "<svg/>");
    assert!(!ws.path("site/docs/y.mdx").exists());
    assert_eq!(read_to_string(ws.path("site/docs/w.mdx")).unwrap(), "# moved\n");
    let revision = read_to_string(ws.path("site/.sync/revision.json")).unwrap();
    assert!(revision.contains("\"current\": \"bbb\""), "{revision}");
}

#[test]
fn sync_exits_non_zero_when_an_entry_fails() {
    let ws = Workspace::new();
    ws.write("diff.txt", "D\tdocs/y.mdx\nT\tdocs/typechange.mdx\n");

    doc_sync()
        .arg("sync")
        .arg("--config")
        .arg(ws.config())
        .arg("--diff")
        .arg(ws.path("diff.txt"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("failed\tT"))
        .stderr(predicate::str::contains("1 of 2 entries failed"));

    // The sibling entry still ran.
    assert!(!ws.path("site/docs/y.mdx").exists());
}

#[test]
fn sync_with_unknown_language_fails_before_touching_files() {
    let ws = Workspace::new();
    ws.write("diff.txt", "D\tdocs/y.mdx\n");

    doc_sync()
        .arg("sync")
        .arg("--config")
        .arg(ws.config())
        .arg("--diff")
        .arg(ws.path("diff.txt"))
        .arg("--language")
        .arg("xx")
        .assert()
        .failure()
        .stderr(predicate::str::contains("xx"));

    assert!(ws.path("site/docs/y.mdx").exists());
}

#[test]
fn transform_rewrites_files_in_place() {
    let ws = Workspace::new();
    ws.write(
        "site/docs/page.mdx",
        "## Getting Started!\n\nSee [a](/docs/pages/foo).\n",
    );

    doc_sync()
        .arg("transform")
        .arg("--config")
        .arg(ws.config())
        .arg(ws.path("site/docs/page.mdx"))
        .assert()
        .success()
        .stdout(predicate::str::contains("transformed"));

    assert_eq!(
        read_to_string(ws.path("site/docs/page.mdx")).unwrap(),
        "## Getting Started! {#getting-started}\n\nSee [a](https://nextjs.org/docs/14/pages/foo).\n"
    );
}

#[test]
fn missing_config_file_is_reported() {
    let ws = Workspace::new();
    ws.write("diff.txt", "A\tdocs/x.mdx\n");
    doc_sync()
        .arg("plan")
        .arg("--config")
        .arg(Path::new("does/not/exist.yaml"))
        .arg("--diff")
        .arg(ws.path("diff.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use doc_sync::cli::{run, Cli, Commands};

    // A dummy path: the command fails, but only after the event was emitted.
    let cli = Cli {
        command: Commands::Plan {
            config: std::path::PathBuf::from("dummy.yaml"),
            diff: std::path::PathBuf::from("dummy.txt"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
