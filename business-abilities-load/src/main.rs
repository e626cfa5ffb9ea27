use anyhow::{Context, Result};
use business_abilities_load::{run, Args};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::process::ExitCode;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter));
    FmtSubscriber::builder().with_env_filter(filter).init();

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install the Prometheus exporter")?;
        info!("Serving metrics on http://{addr}/metrics");
    }

    let stats = run(&args).await?;
    println!("{stats}");

    if stats.passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("One or more thresholds were crossed");
        Ok(ExitCode::FAILURE)
    }
}
