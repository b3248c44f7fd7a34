//! ---
//! trellis_section: "15-testing-qa-runbook"
//! trellis_subsection: "integration-tests"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Standby node follows a file store and takes over on failover."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use trellis_common::{HaConfig, ManagementMode};
use trellis_ha::{FailoverReason, HaSupervisor, NodeContext};
use trellis_metrics::RebindMetrics;
use trellis_persistence::{FileMementoStore, Memento, ObjectKind, PersistenceStoreAccess};
use trellis_rebind::basic::{
    basic_type_registry, BASIC_APPLICATION, BASIC_ENTITY, BASIC_LOCATION, BASIC_POLICY,
};
use trellis_rebind::{
    Entity, ManagedObject, ManagementContext, ManagementTransitionMode, RebindError,
    RebindManager, RebindSettings,
};

fn ha_node(id: &str, priority: u32) -> NodeContext {
    let config = HaConfig {
        priority,
        heartbeat_interval: Duration::from_millis(10),
        watchdog_timeout: Duration::from_millis(20),
    };
    NodeContext::from_config(id, &config)
}

fn rebind_manager(node_id: &str) -> RebindManager {
    let management = Arc::new(ManagementContext::new(node_id, basic_type_registry()));
    RebindManager::new(
        management,
        RebindSettings::default(),
        RebindMetrics::detached().unwrap(),
    )
}

fn write_application(store: &FileMementoStore) {
    let mut app = Memento::new("app", BASIC_APPLICATION);
    app.children = vec!["web".into()];
    app.locations = vec!["dc1".into()];
    let mut web = Memento::new("web", BASIC_ENTITY)
        .with_parent("app")
        .with_config("replicas", json!(3));
    web.display_name = Some("Web tier".into());
    web.policies = vec!["restart".into()];

    store.persist(ObjectKind::Entity, "app", &app).unwrap();
    store.persist(ObjectKind::Entity, "web", &web).unwrap();
    store
        .persist(ObjectKind::Location, "dc1", &Memento::new("dc1", BASIC_LOCATION))
        .unwrap();
    store
        .persist(ObjectKind::Policy, "restart", &Memento::new("restart", BASIC_POLICY))
        .unwrap();
}

#[test]
fn standby_takes_over_after_master_goes_silent() {
    let dir = tempfile::tempdir().unwrap();
    let supervisor = HaSupervisor::new("cluster-a");
    supervisor.register(ha_node("primary", 0));
    supervisor.register(ha_node("standby", 1));
    let start = Instant::now();
    supervisor.heartbeat("primary", start);
    supervisor.heartbeat("standby", start);
    supervisor.evaluate(start).expect("startup election");
    assert_eq!(supervisor.mode_of("primary"), ManagementMode::Master);

    // The elected master rebinds the empty store, which makes it writable.
    let primary_store = FileMementoStore::open(dir.path());
    let primary = rebind_manager("primary");
    let applications = primary
        .rebind(&primary_store, supervisor.mode_of("primary"))
        .unwrap();
    assert!(applications.is_empty());
    assert!(primary_store.is_writable());
    write_application(&primary_store);

    let standby_store = FileMementoStore::open(dir.path());
    let standby = rebind_manager("standby");
    let applications = standby
        .rebind(&standby_store, supervisor.mode_of("standby"))
        .unwrap();
    assert_eq!(applications.len(), 1);
    assert!(applications[0].is_read_only());
    assert!(!standby_store.is_writable());
    assert_eq!(standby.read_only_rebind_count(), 1);

    let web = standby.management().entities().get("web").expect("web rebound");
    assert_eq!(web.parent_id().as_deref(), Some("app"));
    assert_eq!(web.config("replicas"), Some(json!(3)));
    assert_eq!(web.adjuncts(ObjectKind::Policy).len(), 1);

    let later = start + Duration::from_millis(50);
    supervisor.heartbeat("standby", later);
    let event = supervisor.evaluate(later).expect("failover");
    assert_eq!(event.promoted, "standby");
    assert_eq!(event.reason, FailoverReason::HeartbeatTimeout);

    let applications = standby
        .rebind(&standby_store, supervisor.mode_of("standby"))
        .unwrap();
    assert!(!applications[0].is_read_only());
    assert!(standby_store.is_writable());
    assert_eq!(standby.read_only_rebind_count(), 0);
    assert_eq!(standby.metrics().success_count(), 2);
    for id in ["app", "web"] {
        assert_eq!(
            standby.management().entities().last_transition_mode(id),
            Some(ManagementTransitionMode::RebindingBecomingPrimary)
        );
    }
    assert_eq!(
        standby.management().locations().last_transition_mode("dc1"),
        Some(ManagementTransitionMode::RebindingBecomingPrimary)
    );
}

#[test]
fn tampered_memento_fails_the_pass_and_keeps_store_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMementoStore::open(dir.path());
    store.set_writable(true);
    write_application(&store);
    store.set_writable(false);

    let path = dir.path().join("entities").join("web.json");
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, contents.replace("Web tier", "Tampered")).unwrap();

    let manager = rebind_manager("node-1");
    let err = manager.rebind(&store, ManagementMode::Master).unwrap_err();
    match err {
        RebindError::Failed { errors, .. } => {
            assert!(errors.iter().any(|error| error.contains("integrity")), "{errors:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!store.is_writable());
    assert_eq!(manager.metrics().failure_count(), 1);
}
