//! Platform smoke test CLI.
//!
//! Runs the read-only platform audit against the current cluster and exits
//! non-zero when any check fails.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use smoke_test::{
    platform, ui, CheckContext, ExecutionMode, HttpsProbe, KubeAccessor, Orchestrator,
};

/// Post-deployment smoke test for the platform.
#[derive(Parser, Debug)]
#[command(
    name = "smoke-test",
    version,
    about = "Verify a platform deployment",
    long_about = "Audit cluster health, platform controllers, custom resources and SSO wiring.\n\n\
                  Every check is read-only. The process exits non-zero when at least one\n\
                  check fails; warnings alone do not fail the run."
)]
struct Cli {
    /// Path to a single kubeconfig file. When omitted, the client is inferred
    /// from in-cluster config or `KUBECONFIG` (which may list several files)
    /// and falls back to ~/.kube/config.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use.
    #[arg(long, env = "SMOKE_TEST_CONTEXT")]
    context: Option<String>,

    /// Timeout in seconds for each ingress reachability probe.
    #[arg(long, env = "SMOKE_TEST_PROBE_TIMEOUT", default_value_t = 5)]
    probe_timeout: u64,

    /// Evaluate check groups concurrently.
    #[arg(long)]
    parallel: bool,

    /// Print the summary as JSON instead of the console report.
    #[arg(long)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    async fn accessor(&self) -> Result<KubeAccessor> {
        match &self.kubeconfig {
            Some(path) => KubeAccessor::from_kubeconfig(path, self.context.as_deref()).await,
            None => KubeAccessor::infer(self.context.as_deref()).await,
        }
    }

    fn mode(&self) -> ExecutionMode {
        if self.parallel {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    if !cli.json {
        ui::print_banner();
    }

    let accessor = cli.accessor().await?;
    let probe = HttpsProbe::new(Duration::from_secs(cli.probe_timeout))
        .context("Failed to build HTTP client for reachability probes")?;
    let ctx = CheckContext::new(&accessor, &probe);

    let audit = Orchestrator::new(platform::groups())
        .with_mode(cli.mode())
        .run(ctx)
        .await;
    let summary = audit.summary();

    if cli.json {
        let json =
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{json}");
    } else {
        ui::print_report(&summary);
        ui::print_summary(&summary);
    }

    Ok(audit.exit_signal().into())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,smoke_test=debug"
    } else {
        "warn,smoke_test=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Smoke test could not run");
            if !cli.json {
                ui::print_init_error(&format!("{err:#}"));
            }
            ExitCode::FAILURE
        }
    }
}
