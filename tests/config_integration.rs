//! ---
//! trellis_section: "15-testing-qa-runbook"
//! trellis_subsection: "integration-tests"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Shipped configuration files parse and drive the catalog."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::path::Path;
use std::time::Duration;

use trellis_common::{AppConfig, CatalogLoadMode, FailureMode, ManagementMode};
use trellis_rebind::{DefaultCatalogSource, FileCatalogSource, ManagedObject};

fn configs() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../configs"))
}

#[test]
fn example_config_parses() {
    let config = AppConfig::load(&[configs().join("trellis.example.toml")]).expect("example config");
    assert_eq!(config.node_id, "trellis-node-1");
    assert_eq!(config.mode, ManagementMode::Master);
    assert_eq!(
        config.catalog.load_mode,
        CatalogLoadMode::LoadDefaultCatalogIfNoPersistedState
    );
    assert_eq!(config.rebind.failure_mode, FailureMode::FailAtEnd);
    assert_eq!(config.rebind.dangling_ref_failure_mode, FailureMode::Continue);
    assert_eq!(config.ha.watchdog_timeout, Duration::from_millis(2000));
    assert!(config.persistence.features.feeds);
    assert_eq!(config.logging.level, "info,trellis_rebind=debug");
}

#[test]
fn example_catalog_loads() {
    let items = FileCatalogSource::new(configs().join("catalog.example.toml"))
        .load()
        .expect("example catalog");
    let ids: Vec<String> = items.iter().map(|item| item.id()).collect();
    assert_eq!(
        ids,
        vec![
            "trellis.entity.BasicApplication:0.0.0.SNAPSHOT".to_owned(),
            "web-cluster:1.0".to_owned()
        ]
    );
}
