//! Minimal CLI entry point. Reads a [`PlanRequest`] from a JSON file path
//! argument and prints the resulting [`RunOutcome`] as JSON. Flag
//! parsing, YAML configuration, and report rendering are out of scope —
//! this binary exists only so the orchestration core is runnable end to
//! end, not as the product's CLI surface.

use std::{env, fs, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use loadtest_blob::S3BlobClient;
use loadtest_container::DockerContainerClient;
use loadtest_core::{CancellationToken, PlanRequest};
use loadtest_orchestrator::{Orchestrator, exit_code};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "orchestrator run failed");
            eprintln!("error: {err:?}");
            ExitCode::from(6)
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let path = env::args()
        .nth(1)
        .context("usage: loadtest-orchestrator <plan-request.json>")?;
    let raw = fs::read_to_string(&path).with_context(|| format!("reading plan request at {path}"))?;
    let request: PlanRequest = serde_json::from_str(&raw).context("parsing plan request JSON")?;

    let container = Arc::new(DockerContainerClient::connect_local().context("connecting to container provider")?);
    let blob = Arc::new(S3BlobClient::from_env().await);
    let orchestrator = Orchestrator::new(container, blob);

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received interrupt, cancelling run");
            cancel_on_signal.cancel();
        }
    });

    match orchestrator.run(request, cancel).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::from(u8::try_from(exit_code(&outcome)).unwrap_or(6)))
        }
        Err(invalid_plan) => {
            eprintln!("invalid plan: {invalid_plan}");
            Ok(ExitCode::from(5))
        }
    }
}
