//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Structured logging adapters and sinks."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Logging context shared by the rebind pipeline and the HA supervisor.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

#[macro_use]
pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Management node identifier.
    pub node: Option<&'a str>,
    /// Management mode (master, hot-standby, hot-backup).
    pub mode: Option<&'a str>,
    /// Rebind pass counter for hot proxies.
    pub iteration: Option<i64>,
    /// Current rebind phase, when inside a pass.
    pub phase: Option<u8>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node identifier.
    pub fn with_node(mut self, node: &'a str) -> Self {
        self.node = Some(node);
        self
    }

    /// Attach a management mode descriptor.
    pub fn with_mode(mut self, mode: &'a str) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Attach the read-only pass counter.
    pub fn with_iteration(mut self, iteration: i64) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Attach the active phase.
    pub fn with_phase(mut self, phase: u8) -> Self {
        self.phase = Some(phase);
        self
    }
}

/// Severity selector used where the level is decided at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingLevel {
    /// Fine-grained tracing.
    Trace,
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Operator attention advised.
    Warn,
}

/// Emit `message` at a level chosen at runtime, enriched with `context`.
pub fn log_at(level: LoggingLevel, context: &LogContext<'_>, message: &str) {
    match level {
        LoggingLevel::Trace => trellis_trace!(context = context, "{}", message),
        LoggingLevel::Debug => trellis_debug!(context = context, "{}", message),
        LoggingLevel::Info => trellis_info!(context = context, "{}", message),
        LoggingLevel::Warn => trellis_warn!(context = context, "{}", message),
    }
}
