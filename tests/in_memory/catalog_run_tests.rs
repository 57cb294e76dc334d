//! Full catalog runs over in-memory adapters.

use super::helpers::{entry, listing, options, timed_out};
use census::catalog::{
    adapters::memory::{InMemoryAdapterGenerator, InMemoryRegistryStore, ScriptedProber},
    domain::{
        NO_VALID_LOCATION, ProbeError, ProbeResult, ReportOutcome, StepStatus, SynthesisOptions,
    },
    services::{CatalogService, RunCoordinator, RunOptions},
};
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type TestCoordinator =
    RunCoordinator<InMemoryRegistryStore, ScriptedProber, InMemoryAdapterGenerator, DefaultClock>;

struct TestContext {
    store: Arc<InMemoryRegistryStore>,
    prober: ScriptedProber,
    generator: Arc<InMemoryAdapterGenerator>,
}

impl TestContext {
    fn new(store: InMemoryRegistryStore, prober: ScriptedProber) -> Self {
        Self {
            store: Arc::new(store),
            prober,
            generator: Arc::new(InMemoryAdapterGenerator::new(SynthesisOptions::default())),
        }
    }

    fn coordinator(&self, options: RunOptions) -> TestCoordinator {
        RunCoordinator::new(
            Arc::clone(&self.store),
            Arc::new(self.prober.clone()),
            Arc::clone(&self.generator),
            Arc::new(DefaultClock),
            options,
        )
    }
}

fn mixed_registry() -> TestContext {
    let store = InMemoryRegistryStore::with_entries(vec![
        entry("Docs Search", Some("https://docs.example.com/mcp")),
        entry("Directory Listing", Some("Unknown - Listed in directories")),
        entry("Flaky Weather", Some("https://weather.example.com/mcp")),
        entry("Broken Billing", Some("https://billing.example.com/mcp")),
    ]);
    let prober = ScriptedProber::new()
        .script("Docs Search", listing(&["search", "fetch_page"]))
        .script("Flaky Weather", timed_out())
        .script("Flaky Weather", listing(&["forecast"]))
        .script(
            "Broken Billing",
            ProbeResult::failure(
                ProbeError::protocol("tools/list reply has no result"),
                Duration::from_millis(4),
            ),
        );
    TestContext::new(store, prober)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mixed_registry_is_fully_reconciled(options: RunOptions) {
    let context = mixed_registry();

    let summary = context
        .coordinator(options)
        .run(CancellationToken::new())
        .await
        .expect("run succeeds");

    assert_eq!(summary.selected, 4);
    assert_eq!(summary.reconciled, 4);
    assert!(!summary.cancelled);
    assert!(summary.generation_failures.is_empty());
    assert_eq!(summary.report.total, 4);
    assert_eq!(summary.report.tested, 4);
    assert_eq!(summary.report.discovery_successes, 2);
    assert_eq!(summary.report.generation_successes, 2);
    assert_eq!(summary.report.actually_working, 2);
    assert_eq!(summary.report.skipped, 1);
    assert!(summary.report.pending.is_empty());
    assert_eq!(context.generator.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn registry_order_survives_concurrent_reconciliation(options: RunOptions) {
    let context = mixed_registry();

    context
        .coordinator(options)
        .run(CancellationToken::new())
        .await
        .expect("run succeeds");

    let names: Vec<String> = context
        .store
        .snapshot()
        .expect("registry saved")
        .iter()
        .map(|saved| saved.name().as_str().to_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "Docs Search",
            "Directory Listing",
            "Flaky Weather",
            "Broken Billing"
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn each_entry_records_its_outcome(options: RunOptions) {
    let context = mixed_registry();
    context
        .coordinator(options)
        .run(CancellationToken::new())
        .await
        .expect("run succeeds");
    let entries = context.store.snapshot().expect("registry saved");
    let find = |name: &str| {
        entries
            .iter()
            .find(|saved| saved.name().as_str() == name)
            .cloned()
            .expect("entry present")
    };

    let listed = find("Directory Listing");
    assert_eq!(listed.discovery_status(), StepStatus::Skipped);
    assert_eq!(listed.generation_status(), StepStatus::NotAttempted);
    assert_eq!(listed.failure_reason(), Some(NO_VALID_LOCATION));

    let flaky = find("Flaky Weather");
    assert_eq!(flaky.discovery_status(), StepStatus::Success);
    assert_eq!(flaky.tool_count(), 1);
    assert!(flaky.actually_working());

    let broken = find("Broken Billing");
    assert_eq!(broken.discovery_status(), StepStatus::Failure);
    assert!(!broken.actually_working());
    assert!(
        broken
            .failure_reason()
            .is_some_and(|reason| reason.contains("no result"))
    );

    let manifest = context
        .generator
        .manifest("Docs Search")
        .expect("manifest generated");
    assert_eq!(manifest.tool_names(), vec!["search", "fetch_page"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_run_only_probes_untested_entries(options: RunOptions) {
    let context = mixed_registry();
    context
        .coordinator(options.clone())
        .run(CancellationToken::new())
        .await
        .expect("first run succeeds");
    let probes_after_first = context.prober.probe_count();
    let saves_after_first = context.store.save_count();

    let summary = context
        .coordinator(options)
        .run(CancellationToken::new())
        .await
        .expect("second run succeeds");

    assert_eq!(summary.selected, 0);
    assert_eq!(context.prober.probe_count(), probes_after_first);
    assert_eq!(context.store.save_count(), saves_after_first);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn report_reflects_finished_run(options: RunOptions) {
    let context = mixed_registry();
    context
        .coordinator(options)
        .run(CancellationToken::new())
        .await
        .expect("run succeeds");

    let outcome = CatalogService::new(Arc::clone(&context.store))
        .report()
        .await
        .expect("report succeeds");

    let ReportOutcome::Populated(report) = outcome else {
        panic!("expected populated report, got {outcome:?}");
    };
    assert_eq!(report.actually_working, 2);
    let rendered = report.to_string();
    assert!(rendered.contains("registry with 4 entries, 4 tested"));
    assert!(rendered.contains("Docs Search"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn entries_added_through_the_service_are_probed(options: RunOptions) {
    let context = TestContext::new(
        InMemoryRegistryStore::new(),
        ScriptedProber::new().script("Notes", listing(&["create_note"])),
    );
    let service = CatalogService::new(Arc::clone(&context.store));
    service
        .add_entry("Notes", Some("https://notes.example.com/mcp".to_owned()))
        .await
        .expect("entry added");

    let summary = context
        .coordinator(options)
        .run(CancellationToken::new())
        .await
        .expect("run succeeds");

    assert_eq!(summary.report.actually_working, 1);
    assert!(context.generator.manifest("Notes").is_some());
}
