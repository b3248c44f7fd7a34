//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "binary"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Binary entrypoint for the Trellis daemon."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use trellis_common::{init_tracing, AppConfig, ManagementMode};
use trellis_metrics::{new_registry, render_text, RebindMetrics};
use trellis_persistence::{FileMementoStore, PersistenceStoreAccess};
use trellis_rebind::basic::basic_type_registry;
use trellis_rebind::{
    DefaultExceptionHandler, ManagedObject, ManagementContext, RebindExceptionHandler, RebindManager,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Trellis management daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, help = "Override the management mode")]
    mode: Option<CliMode>,

    #[arg(long, value_name = "DIR", help = "Override the persisted state directory")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    Master,
    HotStandby,
    HotBackup,
}

impl From<CliMode> for ManagementMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Master => ManagementMode::Master,
            CliMode::HotStandby => ManagementMode::HotStandby,
            CliMode::HotBackup => ManagementMode::HotBackup,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Rebind the live graph from the store and report the result")]
    Rebind {
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
    #[command(about = "Summarise the persisted state without rebinding")]
    Inspect,
}

#[derive(Debug, Serialize)]
struct RebindReport {
    node: String,
    mode: ManagementMode,
    store: String,
    applications: Vec<String>,
    entities: usize,
    locations: usize,
    catalog_items: usize,
    writable: bool,
    elapsed_ms: u128,
    errors: Vec<String>,
    warnings: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/trellis.toml"));
    candidates.push(PathBuf::from("configs/trellis.example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if let Some(store) = &cli.store {
        config.persistence.directory = store.clone();
    }
    let _logging = init_tracing("trellisd", &config.node_id, config.mode, &config.logging)?;
    info!(config = %loaded.source.display(), node = %config.node_id, mode = %config.mode, "configuration loaded");

    let store = FileMementoStore::open(&config.persistence.directory);
    match cli.command.unwrap_or(Commands::Rebind { json: false }) {
        Commands::Rebind { json } => rebind(&config, &store, json),
        Commands::Inspect => inspect(&store),
    }
}

fn rebind(config: &AppConfig, store: &FileMementoStore, json: bool) -> Result<()> {
    let registry = new_registry();
    let metrics = RebindMetrics::new(registry.clone())?;
    let management = Arc::new(ManagementContext::new(
        config.node_id.clone(),
        basic_type_registry(),
    ));
    let manager = RebindManager::from_config(management.clone(), config, metrics);
    let handler = manager.default_handler();

    let started = Instant::now();
    let outcome = manager.rebind_with_handler(store, &handler, config.mode);
    let elapsed = started.elapsed();

    let applications = match &outcome {
        Ok(applications) => applications.iter().map(|app| app.id()).collect(),
        Err(err) => {
            warn!(error = %err, "rebind failed");
            Vec::new()
        }
    };
    let report = build_report(config, store, &management, &handler, applications, elapsed.as_millis());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} ({}) rebound {} application(s), {} entit(ies), {} location(s), {} catalog item(s) from {} in {} ms; store writable: {}",
            report.node,
            report.mode,
            report.applications.len(),
            report.entities,
            report.locations,
            report.catalog_items,
            report.store,
            report.elapsed_ms,
            report.writable
        );
        for error in &report.errors {
            println!("  error: {error}");
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }

    if config.metrics.enabled {
        print!("{}", render_text(&registry)?);
    }

    outcome
        .map(|_| ())
        .context("rebind did not complete")
}

fn build_report(
    config: &AppConfig,
    store: &FileMementoStore,
    management: &ManagementContext,
    handler: &DefaultExceptionHandler,
    applications: Vec<String>,
    elapsed_ms: u128,
) -> RebindReport {
    RebindReport {
        node: config.node_id.clone(),
        mode: config.mode,
        store: store.backing_store_description(),
        applications,
        entities: management.entities().len(),
        locations: management.locations().len(),
        catalog_items: management.catalog().len(),
        writable: store.is_writable(),
        elapsed_ms,
        errors: handler.errors(),
        warnings: handler.warnings(),
    }
}

fn inspect(store: &FileMementoStore) -> Result<()> {
    let handler = DefaultExceptionHandler::default();
    let raw = store.load_raw_data(&handler)?;
    let manifest = store.load_manifest(&raw, &handler)?;
    println!("store: {}", store.backing_store_description());
    println!("entities: {}", manifest.entities.len());
    for entity in manifest.entities.values() {
        println!(
            "  {} {}{}",
            entity.id,
            entity.type_name,
            entity
                .parent
                .as_deref()
                .map(|parent| format!(" (parent {parent})"))
                .unwrap_or_default()
        );
    }
    println!("locations: {}", manifest.location_types.len());
    println!("catalog items: {:?}", manifest.catalog_item_ids());
    Ok(())
}
