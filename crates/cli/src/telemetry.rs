// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::OnceLock;

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Logs go to stderr so that stdout stays clean for exported data.
/// With `emit_metrics` a Prometheus recorder is installed as well.
pub fn init_telemetry(emit_metrics: bool) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledgerscope=info,ledgerscope_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install log subscriber")?;

    if !emit_metrics {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    if PROM_HANDLE.set(handle).is_err() {
        tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
    }

    metrics::describe_counter!("ledgerscope_entries_verified_total", "Entries whose inclusion proof verified");
    metrics::describe_counter!("ledgerscope_verification_failures_total", "Inclusion proofs that did not reconstruct the claimed root");
    metrics::describe_counter!("ledgerscope_rollbacks_detected_total", "Roots older than the last verified root");
    metrics::describe_counter!("ledgerscope_forks_detected_total", "Roots that disagree with the last verified root at the same transaction");
    metrics::describe_counter!("ledgerscope_transport_retries_total", "Transport calls retried after a transient failure");
    metrics::describe_gauge!("ledgerscope_verified_transaction_id", "Transaction id of the last verified root");
    Ok(())
}

/// Prometheus text rendering, if metrics were enabled.
pub fn render_metrics() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
