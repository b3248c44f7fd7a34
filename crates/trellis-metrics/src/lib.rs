//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Metrics collection and export utilities."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use tracing::debug;

/// Shared registry type used across crates.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Render the registry in the Prometheus text exposition format.
pub fn render_text(registry: &Registry) -> Result<String> {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .context("failed to encode metrics")?;
    String::from_utf8(buffer).context("metrics output was not utf-8")
}

/// Most recent error report produced by a rebind pass.
#[derive(Debug, Clone, Default)]
pub struct ErrorReport {
    pub recorded_at: Option<DateTime<Utc>>,
    pub messages: Vec<String>,
}

#[derive(Debug, Default)]
struct ActivityState {
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
    last_duration: Option<Duration>,
    last_errors: ErrorReport,
}

/// Success/failure accounting for rebind passes.
#[derive(Clone)]
pub struct RebindMetrics {
    successes: IntCounter,
    failures: IntCounter,
    error_reports: IntCounter,
    last_error_count: IntGauge,
    duration: HistogramVec,
    state: Arc<Mutex<ActivityState>>,
}

impl RebindMetrics {
    /// Register all rebind metrics with the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let successes = IntCounter::with_opts(Opts::new(
            "trellis_rebind_success_total",
            "Total number of rebind passes that completed",
        ))?;
        registry.register(Box::new(successes.clone()))?;

        let failures = IntCounter::with_opts(Opts::new(
            "trellis_rebind_failure_total",
            "Total number of rebind passes that aborted",
        ))?;
        registry.register(Box::new(failures.clone()))?;

        let error_reports = IntCounter::with_opts(Opts::new(
            "trellis_rebind_error_reports_total",
            "Total number of rebind passes that reported errors or warnings",
        ))?;
        registry.register(Box::new(error_reports.clone()))?;

        let last_error_count = IntGauge::with_opts(Opts::new(
            "trellis_rebind_last_error_messages",
            "Number of messages in the most recent rebind error report",
        ))?;
        registry.register(Box::new(last_error_count.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "trellis_rebind_duration_seconds",
                "Time spent in a rebind pass, by outcome",
            )
            .buckets(buckets),
            &["outcome"],
        )?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            successes,
            failures,
            error_reports,
            last_error_count,
            duration,
            state: Arc::new(Mutex::new(ActivityState::default())),
        })
    }

    /// Registry-less instance, for callers that do not export metrics.
    pub fn detached() -> Result<Self> {
        Self::new(new_registry())
    }

    pub fn note_success(&self, elapsed: Duration) {
        self.successes.inc();
        self.duration
            .with_label_values(&["success"])
            .observe(elapsed.as_secs_f64());
        let mut state = self.state.lock();
        state.last_success = Some(Utc::now());
        state.last_duration = Some(elapsed);
    }

    pub fn note_failure(&self, elapsed: Duration) {
        self.failures.inc();
        self.duration
            .with_label_values(&["failure"])
            .observe(elapsed.as_secs_f64());
        let mut state = self.state.lock();
        state.last_failure = Some(Utc::now());
        state.last_duration = Some(elapsed);
    }

    /// Replace the last error report with `messages`.
    pub fn note_error(&self, messages: Vec<String>) {
        debug!(count = messages.len(), "recording rebind error report");
        self.error_reports.inc();
        self.last_error_count.set(messages.len() as i64);
        let mut state = self.state.lock();
        state.last_errors = ErrorReport {
            recorded_at: Some(Utc::now()),
            messages,
        };
    }

    pub fn success_count(&self) -> u64 {
        self.successes.get()
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.get()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_success
    }

    pub fn last_failure(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_failure
    }

    pub fn last_duration(&self) -> Option<Duration> {
        self.state.lock().last_duration
    }

    pub fn last_errors(&self) -> ErrorReport {
        self.state.lock().last_errors.clone()
    }
}

impl std::fmt::Debug for RebindMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebindMetrics")
            .field("successes", &self.successes.get())
            .field("failures", &self.failures.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_success_failure_and_errors() {
        let registry = new_registry();
        let metrics = RebindMetrics::new(registry.clone()).unwrap();

        metrics.note_success(Duration::from_millis(12));
        metrics.note_failure(Duration::from_millis(30));
        metrics.note_error(vec!["boom".into(), "warned".into()]);

        assert_eq!(metrics.success_count(), 1);
        assert_eq!(metrics.failure_count(), 1);
        assert!(metrics.last_success().is_some());
        assert!(metrics.last_failure().is_some());
        assert_eq!(metrics.last_duration(), Some(Duration::from_millis(30)));
        assert_eq!(metrics.last_errors().messages, vec!["boom", "warned"]);

        let text = render_text(&registry).unwrap();
        assert!(text.contains("trellis_rebind_success_total 1"));
        assert!(text.contains("trellis_rebind_duration_seconds_bucket"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = new_registry();
        RebindMetrics::new(registry.clone()).unwrap();
        assert!(RebindMetrics::new(registry).is_err());
    }
}
