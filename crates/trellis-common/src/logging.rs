//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Tracing bootstrap for a management node."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::fmt as stdfmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::span::EnteredSpan;
use tracing::{info, info_span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LoggingConfig, ManagementMode};

const LOG_ENV: &str = "TRELLIS_LOG";

/// Available log formats for the management node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Writer guards and the entered `node` span. Output stops once this is dropped.
#[must_use = "dropping the guard stops log output"]
pub struct LoggingGuard {
    _writers: [WorkerGuard; 2],
    _node: EnteredSpan,
}

impl stdfmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

/// Install the subscriber for one management node.
///
/// Events are recorded inside a `node` span carrying the node id and the
/// management mode, so a master and its standbys writing to a shared
/// collector stay distinguishable. The rolling file is named after the node
/// unless `file_prefix` says otherwise.
pub fn init_tracing(
    service_name: &str,
    node_id: &str,
    mode: ManagementMode,
    config: &LoggingConfig,
) -> Result<LoggingGuard> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(node_id);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, log_file_name(prefix, service_name)));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .compact()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .boxed();

    let directive = select_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        &config.level,
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive {directive:?} ({err}); using info");
        EnvFilter::new("info")
    });

    // A second node in the same process (tests) keeps the first subscriber.
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    let node = info_span!("node", node = %node_id, mode = %mode).entered();
    if installed {
        info!(
            service = service_name,
            log_dir = %config.directory.display(),
            format = ?config.format,
            filter = %directive,
            "tracing initialised"
        );
    }
    Ok(LoggingGuard {
        _writers: [file_guard, stdout_guard],
        _node: node,
    })
}

fn log_file_name(prefix: &str, service_name: &str) -> String {
    format!("{prefix}-{service_name}.log")
}

/// `TRELLIS_LOG` wins over `RUST_LOG`, which wins over the configured level.
/// Blank values count as unset.
fn select_directive(
    trellis_log: Option<String>,
    rust_log: Option<String>,
    configured: &str,
) -> String {
    [trellis_log, rust_log]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| configured.to_owned())
}
