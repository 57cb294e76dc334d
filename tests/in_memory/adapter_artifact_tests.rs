//! Adapters written by a run and loaded back from disk.

use super::helpers::{entry, listing, options};
use census::catalog::{
    adapters::{
        artifacts::{FileAdapterGenerator, MANIFEST_FILE},
        json_file::JsonFileRegistryStore,
        memory::ScriptedProber,
        module::{AdapterInvocationError, AdapterModule, Invocation},
    },
    domain::{AdapterMode, StepStatus, SynthesisOptions},
    ports::RegistryStore,
    services::{RunCoordinator, RunOptions},
};
use camino::Utf8PathBuf;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const DOCS_URL: &str = "https://docs.example.com/mcp";

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        Self { _dir: dir, root }
    }

    fn adapters(&self) -> Utf8PathBuf {
        self.root.join("adapters")
    }

    fn store(&self) -> Arc<JsonFileRegistryStore> {
        Arc::new(JsonFileRegistryStore::new(self.root.join("registry.json")))
    }
}

async fn run_docs_server(
    workspace: &Workspace,
    synthesis: SynthesisOptions,
    options: RunOptions,
) -> Utf8PathBuf {
    let store = workspace.store();
    store
        .save(&[entry("Docs Search", Some(DOCS_URL))])
        .await
        .expect("seed registry");
    let generator = FileAdapterGenerator::new(workspace.adapters(), synthesis);
    let prober = ScriptedProber::new().script("Docs Search", listing(&["search", "fetchPage"]));

    let summary = RunCoordinator::new(
        Arc::clone(&store),
        Arc::new(prober),
        Arc::new(generator),
        Arc::new(DefaultClock),
        options,
    )
    .run(CancellationToken::new())
    .await
    .expect("run succeeds");
    assert_eq!(summary.report.generation_successes, 1);

    workspace.adapters().join("docs-search")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generated_mock_adapter_answers_locally(options: RunOptions) {
    let workspace = Workspace::new();
    let adapter_dir = run_docs_server(&workspace, SynthesisOptions::default(), options).await;

    let module = AdapterModule::load(&adapter_dir).expect("adapter loads");
    let identifiers: Vec<&str> = module
        .entry_points()
        .iter()
        .map(|point| point.identifier.as_str())
        .collect();
    assert_eq!(identifiers, vec!["search", "fetch_page"]);

    let invocation = module
        .invoke("search", &json!({"query": "tokio"}))
        .expect("invocation succeeds");
    assert_eq!(
        invocation,
        Invocation::Mock("mock response from Docs Search for search".to_owned())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generated_client_adapter_plans_remote_call(options: RunOptions) {
    let workspace = Workspace::new();
    let synthesis = SynthesisOptions {
        mode: AdapterMode::Client,
        ..SynthesisOptions::default()
    };
    let adapter_dir = run_docs_server(&workspace, synthesis, options).await;

    let module = AdapterModule::load(&adapter_dir).expect("adapter loads");
    let invocation = module
        .invoke("fetchPage", &json!({"query": "intro", "limit": 3}))
        .expect("invocation succeeds");

    let Invocation::Planned(call) = invocation else {
        panic!("expected a planned call, got {invocation:?}");
    };
    assert_eq!(call.location, DOCS_URL);
    assert_eq!(call.tool, "fetchPage");
    assert_eq!(call.arguments.get("limit"), Some(&json!(3)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn loaded_adapter_validates_arguments(options: RunOptions) {
    let workspace = Workspace::new();
    let adapter_dir = run_docs_server(&workspace, SynthesisOptions::default(), options).await;
    let module = AdapterModule::load(&adapter_dir).expect("adapter loads");

    let missing = module.invoke("search", &json!({"limit": 1}));
    assert!(matches!(
        missing,
        Err(AdapterInvocationError::MissingParameter { .. })
    ));

    let unknown = module.invoke("delete_everything", &json!({}));
    assert!(matches!(
        unknown,
        Err(AdapterInvocationError::UnknownTool { .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn registry_file_records_generated_entry(options: RunOptions) {
    let workspace = Workspace::new();
    run_docs_server(&workspace, SynthesisOptions::default(), options).await;

    let entries = workspace.store().load().await.expect("registry loads");
    let [saved] = entries.as_slice() else {
        panic!("expected a single entry, got {entries:?}");
    };
    assert!(saved.tested());
    assert_eq!(saved.generation_status(), StepStatus::Success);
    assert_eq!(saved.tool_count(), 2);
    assert!(saved.tested_at().is_some());
}

#[test]
fn missing_adapter_directory_fails_to_load() {
    let workspace = Workspace::new();
    let absent = workspace.root.join("absent");
    let result = AdapterModule::load(&absent);
    assert!(matches!(result, Err(AdapterInvocationError::Load(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn manifest_lands_under_server_slug(options: RunOptions) {
    let workspace = Workspace::new();
    let adapter_dir = run_docs_server(&workspace, SynthesisOptions::default(), options).await;

    assert!(adapter_dir.join(MANIFEST_FILE).is_file());
}
