use clap::Parser;
use coursegate::application::assessments::AssessmentEngine;
use coursegate::application::ledger::PaymentLedger;
use coursegate::application::projector::EnrollmentProjector;
use coursegate::domain::ports::{
    AttemptStore, AttemptStoreRef, EnrollmentStore, EnrollmentStoreRef, NotifierRef, PaymentStore,
    PaymentStoreRef, TestStoreRef,
};
use coursegate::infrastructure::clock::SystemClock;
use coursegate::infrastructure::gateway::MockGateway;
use coursegate::infrastructure::in_memory::{
    InMemoryActorStore, InMemoryAttemptStore, InMemoryCourseStore, InMemoryEnrollmentStore,
    InMemoryPaymentStore, InMemoryTestStore,
};
use coursegate::infrastructure::notifier::LoggingNotifier;
use coursegate::interfaces::csv::report_writer::ReportWriter;
use coursegate::interfaces::json::scenario::Scenario;
use coursegate::interfaces::runner::ScenarioRunner;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file (seed data plus an ordered operation list)
    scenario: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

struct Stores {
    payments: PaymentStoreRef,
    enrollments: EnrollmentStoreRef,
    tests: TestStoreRef,
    attempts: AttemptStoreRef,
}

fn in_memory_stores() -> Stores {
    Stores {
        payments: Arc::new(InMemoryPaymentStore::new()),
        enrollments: Arc::new(InMemoryEnrollmentStore::new()),
        tests: Arc::new(InMemoryTestStore::new()),
        attempts: Arc::new(InMemoryAttemptStore::new()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn persistent_stores(path: &Path) -> Result<Stores> {
    let store = coursegate::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
    Ok(Stores {
        payments: Arc::new(store.clone()),
        enrollments: Arc::new(store.clone()),
        tests: Arc::new(store.clone()),
        attempts: Arc::new(store),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn persistent_stores(_path: &Path) -> Result<Stores> {
    Err(miette::miette!(
        "this build has no persistent storage; rebuild with --features storage-rocksdb"
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let stores = match &cli.db_path {
        Some(path) => persistent_stores(path)?,
        None => in_memory_stores(),
    };
    let actors = Arc::new(InMemoryActorStore::new());
    let courses = Arc::new(InMemoryCourseStore::new());
    let notifier: NotifierRef = Arc::new(LoggingNotifier);
    let clock = Arc::new(SystemClock);
    let gateway = Arc::new(MockGateway::new("coursegate-demo-secret"));

    let projector = Arc::new(EnrollmentProjector::new(
        stores.enrollments.clone(),
        notifier.clone(),
    ));
    let ledger = Arc::new(PaymentLedger::new(
        stores.payments.clone(),
        stores.enrollments.clone(),
        actors.clone(),
        courses.clone(),
        gateway.clone(),
        notifier.clone(),
        projector,
        clock.clone(),
    ));
    let engine = Arc::new(AssessmentEngine::new(
        stores.tests.clone(),
        stores.attempts.clone(),
        stores.enrollments.clone(),
        actors.clone(),
        courses.clone(),
        notifier,
        clock,
    ));
    let runner = ScenarioRunner::new(
        ledger,
        engine,
        stores.payments.clone(),
        actors,
        courses,
        gateway,
    );

    let file = File::open(&cli.scenario).into_diagnostic()?;
    let scenario = Scenario::from_reader(file).into_diagnostic()?;
    runner.seed(&scenario).await.into_diagnostic()?;

    for (index, operation) in scenario.operations.iter().enumerate() {
        match runner.apply(operation).await {
            Ok(outcome) => tracing::debug!(index, %outcome, "operation applied"),
            Err(e) => eprintln!("Error applying operation {index}: {e}"),
        }
    }

    let payments = stores.payments.all().await.into_diagnostic()?;
    let enrollments = stores.enrollments.all().await.into_diagnostic()?;
    let attempts = stores.attempts.all().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer
        .write_report(&payments, &enrollments, &attempts)
        .into_diagnostic()?;

    Ok(())
}
