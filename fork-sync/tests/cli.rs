use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

#[test]
fn help_lists_sync_subcommand() {
    let mut cmd = Command::cargo_bin("fork-sync").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn sync_fails_with_nonexistent_config() {
    let mut cmd = Command::cargo_bin("fork-sync").expect("Binary exists");
    cmd.arg("sync").arg("--config").arg("/nonexistent/fork-sync.yaml");
    cmd.assert().failure();
}

#[test]
fn sync_fails_with_invalid_yaml_config() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), b"repository: [:::").expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("fork-sync").expect("Binary exists");
    cmd.arg("sync").arg("--config").arg(config.path());
    cmd.assert().failure();
}

/// With a valid config but no bucket credentials in the environment, the run
/// must fail before touching the repository.
#[test]
fn sync_fails_without_bucket_credentials() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"repository:\n  path: .\n  branch: main\n  upstream_url: \"https://github.com/example/upstream.git\"\n",
    )
    .expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("fork-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_REGION")
        .env_remove("S3_BUCKET_NAME")
        // Keep dotenv from re-injecting credentials from a local .env file.
        .current_dir(std::env::temp_dir());
    cmd.assert().failure();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, Registry};

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

    use fork_sync::cli::{run, Cli, Commands};

    // A dummy path is enough: the event fires before config loading.
    let cli = Cli {
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
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
