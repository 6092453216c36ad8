//! # Metrics
//!
//! Prometheus metrics for monitoring the reconciler.
//!
//! Hooks are short-lived processes, so instead of serving `/metrics` the
//! registry can be rendered to a node-exporter textfile after each invocation.
//!
//! ## Metrics Exposed
//!
//! - `service_reconciler_reconciliations_total` - Total number of reconcile calls
//! - `service_reconciler_reconciliations_skipped_total` - Calls skipped as no-op triggers
//! - `service_reconciler_reconciliations_applied_total` - Calls that restarted the service
//! - `service_reconciler_reconciliation_errors_total` - Calls that failed
//! - `service_reconciler_reconciliation_duration_seconds` - Duration of reconcile calls
//! - `service_reconciler_artifacts_written_total` - Artifacts rewritten on disk
//! - `service_reconciler_service_commands_total` - Service manager commands by command
//! - `service_reconciler_service_command_errors_total` - Failed service manager commands

use anyhow::Result;
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_reconciler_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_SKIPPED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_reconciler_reconciliations_skipped_total",
        "Total number of reconciliations skipped for no-op triggers",
    )
    .expect("Failed to create RECONCILIATIONS_SKIPPED_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_APPLIED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_reconciler_reconciliations_applied_total",
        "Total number of reconciliations that changed artifacts and restarted the service",
    )
    .expect("Failed to create RECONCILIATIONS_APPLIED_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_reconciler_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "service_reconciler_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static ARTIFACTS_WRITTEN_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "service_reconciler_artifacts_written_total",
        "Total number of artifacts rewritten because their content changed",
    )
    .expect("Failed to create ARTIFACTS_WRITTEN_TOTAL metric - this should never happen")
});

static SERVICE_COMMANDS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_reconciler_service_commands_total",
            "Total number of service manager commands by command",
        ),
        &["command"],
    )
    .expect("Failed to create SERVICE_COMMANDS_TOTAL metric - this should never happen")
});

static SERVICE_COMMAND_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "service_reconciler_service_command_errors_total",
            "Total number of failed service manager commands by command",
        ),
        &["command"],
    )
    .expect("Failed to create SERVICE_COMMAND_ERRORS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Safe to call more than once; already registered collectors are skipped.
pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RECONCILIATIONS_TOTAL.clone()),
        Box::new(RECONCILIATIONS_SKIPPED_TOTAL.clone()),
        Box::new(RECONCILIATIONS_APPLIED_TOTAL.clone()),
        Box::new(RECONCILIATION_ERRORS_TOTAL.clone()),
        Box::new(RECONCILIATION_DURATION.clone()),
        Box::new(ARTIFACTS_WRITTEN_TOTAL.clone()),
        Box::new(SERVICE_COMMANDS_TOTAL.clone()),
        Box::new(SERVICE_COMMAND_ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliations_skipped() {
    RECONCILIATIONS_SKIPPED_TOTAL.inc();
}

pub fn increment_reconciliations_applied() {
    RECONCILIATIONS_APPLIED_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_artifacts_written() {
    ARTIFACTS_WRITTEN_TOTAL.inc();
}

pub fn increment_service_commands(command: &str) {
    SERVICE_COMMANDS_TOTAL.with_label_values(&[command]).inc();
}

pub fn increment_service_command_errors(command: &str) {
    SERVICE_COMMAND_ERRORS_TOTAL
        .with_label_values(&[command])
        .inc();
}

/// Render the registry in the Prometheus text exposition format
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Write the registry to a node-exporter textfile
pub fn write_textfile(path: &Path) -> Result<()> {
    let text = gather_text()?;
    crate::artifact::write_atomic(path, text.as_bytes(), 0o644)?;
    Ok(())
}
