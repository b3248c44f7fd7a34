//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Shared primitives and utilities for the management runtime."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Core shared primitives for the Trellis workspace.
//! This crate exposes configuration loading, the management-node enums that
//! every other crate agrees on, and tracing initialisation.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, CatalogConfig, CatalogLoadMode, FailureMode, HaConfig, LoggingConfig,
    ManagementMode, MetricsConfig, PersistenceConfig, PersistenceFeatures, RebindConfig,
};
pub use logging::{init_tracing, LogFormat, LoggingGuard};
