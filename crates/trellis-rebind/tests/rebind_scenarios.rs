//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "test"
//! trellis_type: "source"
//! trellis_scope: "test"
//! trellis_description: "End-to-end rebind passes against in-memory stores."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
mod common;

use std::sync::Arc;

use common::*;
use trellis_common::{CatalogLoadMode, FailureMode, ManagementMode, PersistenceFeatures};
use trellis_persistence::{CatalogItemMemento, InMemoryStore, Memento, ObjectKind, PersistenceStoreAccess};
use trellis_rebind::basic::{
    BasicCatalogItem, BASIC_APPLICATION, BASIC_CATALOG_ITEM, BASIC_ENTITY, BASIC_LOCATION, BASIC_POLICY,
};
use trellis_rebind::{
    Adjunct, DefaultExceptionHandler, Entity, ManagedObject, ManagementTransitionMode, RebindError, RebindExceptionHandler, RebindSettings, StaticCatalogSource,
};

fn app_with_child(store: &InMemoryStore) {
    let mut app = Memento::new("E", JOURNAL_ENTITY);
    app.children = vec!["C".into()];
    seed(store, ObjectKind::Entity, "C", &Memento::new("C", JOURNAL_ENTITY).with_parent("E"));
    seed(store, ObjectKind::Entity, "E", &app);
}

#[test]
fn empty_store_rebinds_to_nothing() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    let handler = DefaultExceptionHandler::default();

    let mut iteration = manager.new_iteration(&store, &handler, ManagementMode::Master);
    let applications = iteration.run().unwrap();

    assert!(applications.is_empty());
    assert!(iteration.is_empty());
    assert!(!iteration.overwriting_master());
    assert!(handler.errors().is_empty());
    assert!(handler.warnings().is_empty());
    assert!(manager.metrics().last_errors().messages.is_empty());
}

#[test]
fn parents_are_reconstructed_and_managed_first() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    app_with_child(&store);
    let handler = RecordingHandler::default();

    let mut iteration = manager.new_iteration(&store, &handler, ManagementMode::Master);
    let applications = iteration.run().unwrap();

    assert_eq!(ids(&applications), vec!["E"]);
    assert!(iteration.scratch().entity("E").is_some());
    assert!(iteration.scratch().entity("C").is_some());
    assert!(journal.position("reconstruct E") < journal.position("reconstruct C"));
    assert!(journal.position("manage E") < journal.position("manage C"));
    assert_eq!(
        manager.management().entities().last_transition_mode("C"),
        Some(ManagementTransitionMode::RebindingCreating)
    );
    assert_eq!(handler.journal.entries(), vec!["start", "done"]);
}

#[test]
fn failed_policy_is_dropped_before_association() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    let mut app = Memento::new("E", BASIC_APPLICATION);
    app.policies = vec!["p1".into()];
    seed(&store, ObjectKind::Entity, "E", &app);
    seed(&store, ObjectKind::Policy, "p1", &Memento::new("p1", FAILING_POLICY));
    let handler = RecordingHandler::default();

    let mut iteration = manager.new_iteration(&store, &handler, ManagementMode::Master);
    let applications = iteration.run().unwrap();

    assert_eq!(handler.journal.count_prefix("rebind_failed policy p1"), 1);
    assert!(iteration.scratch().adjunct(ObjectKind::Policy, "p1").is_none());
    assert!(applications[0].adjuncts(ObjectKind::Policy).is_empty());
    assert!(handler.journal.entries().contains(&"dangling policy p1".to_owned()));
}

#[test]
fn policies_attach_to_their_entity() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    let mut app = Memento::new("E", BASIC_APPLICATION);
    app.policies = vec!["p1".into()];
    seed(&store, ObjectKind::Entity, "E", &app);
    seed(
        &store,
        ObjectKind::Policy,
        "p1",
        &Memento::new("p1", BASIC_POLICY).with_config("threshold", serde_json::json!(3)),
    );

    let applications = manager.rebind(&store, ManagementMode::Master).unwrap();

    let policies = applications[0].adjuncts(ObjectKind::Policy);
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].entity_id().as_deref(), Some("E"));
    assert_eq!(policies[0].config("threshold"), Some(serde_json::json!(3)));
}

#[test]
fn failed_creation_is_reported_once() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    seed(&store, ObjectKind::Entity, "bad", &Memento::new("bad", BROKEN_ENTITY));
    seed(&store, ObjectKind::Entity, "good", &Memento::new("good", BASIC_APPLICATION));

    let recorder = RecordingHandler::default();
    let applications = manager
        .new_iteration(&store, &recorder, ManagementMode::Master)
        .run()
        .unwrap();
    assert_eq!(ids(&applications), vec!["good"]);
    assert_eq!(recorder.journal.count_prefix("create_failed entity bad"), 1);
    assert_eq!(recorder.journal.count_prefix("rebind_failed entity bad"), 0);
    assert_eq!(recorder.journal.count_prefix("manage_failed entity bad"), 0);

    let handler = DefaultExceptionHandler::new(FailureMode::FailAtEnd, FailureMode::Continue);
    let err = manager
        .new_iteration(&store, &handler, ManagementMode::Master)
        .run()
        .unwrap_err();
    match err {
        RebindError::Failed { errors, .. } => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("entity bad"));
        }
        other => panic!("expected aggregated failure, got {other}"),
    }
}

#[test]
fn fail_fast_stops_at_first_problem() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    seed(&store, ObjectKind::Entity, "bad", &Memento::new("bad", BROKEN_ENTITY));
    let handler = DefaultExceptionHandler::new(FailureMode::FailFast, FailureMode::Continue);

    let err = manager.rebind_with_handler(&store, &handler, ManagementMode::Master).unwrap_err();

    assert!(err.to_string().contains("entity bad"), "{err}");
    assert_eq!(manager.metrics().failure_count(), 1);
    assert!(!store.is_writable());
}

#[test]
fn overwriting_master_requires_live_objects() {
    let journal = Journal::default();
    let store = InMemoryStore::new("memory");
    app_with_child(&store);
    let handler = DefaultExceptionHandler::default();

    let manager = manager(&journal);
    let mut first = manager.new_iteration(&store, &handler, ManagementMode::Master);
    first.run().unwrap();
    assert!(!first.overwriting_master());
    let mut second = manager.new_iteration(&store, &handler, ManagementMode::Master);
    second.run().unwrap();
    assert!(second.overwriting_master());

    let follower = manager_with(&journal, RebindSettings::default());
    follower
        .rebind(&store, ManagementMode::HotStandby)
        .unwrap();
    let mut promoted = follower.new_iteration(&store, &handler, ManagementMode::Master);
    promoted.run().unwrap();
    assert!(!promoted.overwriting_master());

    let mut standby = manager.new_iteration(&store, &handler, ManagementMode::HotStandby);
    standby.run().unwrap();
    assert!(!standby.overwriting_master());
}

#[test]
fn stale_objects_are_destroyed() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    app_with_child(&store);
    seed(&store, ObjectKind::Location, "loc", &Memento::new("loc", BASIC_LOCATION));
    manager.rebind(&store, ManagementMode::Master).unwrap();

    store.set_writable(true);
    store.delete(ObjectKind::Entity, "C").unwrap();
    store.delete(ObjectKind::Location, "loc").unwrap();
    let mut app = Memento::new("E", JOURNAL_ENTITY);
    app.children.clear();
    store.persist(ObjectKind::Entity, "E", &app).unwrap();

    manager.rebind(&store, ManagementMode::Master).unwrap();

    let management = manager.management();
    assert!(management.entities().contains("E"));
    assert!(!management.entities().contains("C"));
    assert!(!management.locations().contains("loc"));
    assert!(journal.entries().contains(&"unmanage C".to_owned()));
}

#[test]
fn failed_application_is_omitted_but_registered() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    seed(&store, ObjectKind::Entity, "fragile", &Memento::new("fragile", FRAGILE_APP));
    seed(&store, ObjectKind::Entity, "solid", &Memento::new("solid", JOURNAL_ENTITY));
    let handler = RecordingHandler::default();

    let applications = manager
        .new_iteration(&store, &handler, ManagementMode::Master)
        .run()
        .unwrap();

    assert_eq!(ids(&applications), vec!["solid"]);
    assert_eq!(handler.journal.count_prefix("manage_failed entity fragile"), 1);
    assert!(manager.management().entities().contains("fragile"));
}

#[test]
fn standby_rebinds_read_only_then_promotes() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    app_with_child(&store);

    let applications = manager.rebind(&store, ManagementMode::HotStandby).unwrap();
    assert!(applications[0].is_read_only());
    assert!(!store.is_writable());
    assert_eq!(manager.read_only_rebind_count(), 1);
    assert_eq!(
        manager.management().entities().last_transition_mode("E"),
        Some(ManagementTransitionMode::RebindingReadOnly)
    );

    manager.rebind(&store, ManagementMode::HotStandby).unwrap();
    assert_eq!(manager.read_only_rebind_count(), 2);

    let applications = manager.rebind(&store, ManagementMode::Master).unwrap();
    assert!(!applications[0].is_read_only());
    assert!(store.is_writable());
    assert_eq!(manager.read_only_rebind_count(), 0);
    assert_eq!(
        manager.management().entities().last_transition_mode("C"),
        Some(ManagementTransitionMode::RebindingBecomingPrimary)
    );
}

fn catalog_fixture(store: &InMemoryStore, settings: RebindSettings) -> Vec<String> {
    let journal = Journal::default();
    let manager = manager_with(&journal, settings);
    let catalog = manager.management().catalog();
    catalog.register(Arc::new(BasicCatalogItem::from_memento(&CatalogItemMemento::new(
        "old",
        "1.0",
        BASIC_CATALOG_ITEM,
    ))));
    catalog.set_default_source(Arc::new(StaticCatalogSource::new(vec![CatalogItemMemento::new(
        "web",
        "1.0",
        BASIC_CATALOG_ITEM,
    )])));

    manager.rebind(store, ManagementMode::Master).unwrap();
    let mut ids: Vec<String> = catalog.items().iter().map(|item| item.id()).collect();
    ids.sort();
    ids
}

#[test]
fn catalog_load_modes() {
    let persisted = InMemoryStore::new("persisted");
    seed(
        &persisted,
        ObjectKind::CatalogItem,
        "db:1.0",
        &CatalogItemMemento::new("db", "1.0", BASIC_CATALOG_ITEM),
    );
    let empty = InMemoryStore::new("empty");
    let settings = |catalog_load_mode: CatalogLoadMode| RebindSettings {
        catalog_load_mode,
        ..RebindSettings::default()
    };

    assert_eq!(
        catalog_fixture(&persisted, settings(CatalogLoadMode::LoadPersistedState)),
        vec!["db:1.0"]
    );
    assert!(catalog_fixture(&empty, settings(CatalogLoadMode::LoadPersistedState)).is_empty());
    assert_eq!(
        catalog_fixture(&persisted, settings(CatalogLoadMode::LoadDefaultCatalog)),
        vec!["web:1.0"]
    );
    assert_eq!(
        catalog_fixture(&persisted, settings(CatalogLoadMode::LoadDefaultCatalogIfNoPersistedState)),
        vec!["db:1.0"]
    );
    assert_eq!(
        catalog_fixture(&empty, settings(CatalogLoadMode::LoadDefaultCatalogIfNoPersistedState)),
        vec!["web:1.0"]
    );

    let disabled = RebindSettings {
        features: PersistenceFeatures {
            catalog_items: false,
            ..PersistenceFeatures::default()
        },
        catalog_load_mode: CatalogLoadMode::LoadPersistedState,
        ..RebindSettings::default()
    };
    assert_eq!(catalog_fixture(&persisted, disabled), vec!["old:1.0"]);
}

#[test]
fn disabled_adjunct_kinds_are_skipped() {
    let journal = Journal::default();
    let settings = RebindSettings {
        features: PersistenceFeatures {
            policies: false,
            ..PersistenceFeatures::default()
        },
        ..RebindSettings::default()
    };
    let manager = manager_with(&journal, settings);
    let store = InMemoryStore::new("memory");
    let mut app = Memento::new("E", BASIC_APPLICATION);
    app.policies = vec!["p1".into()];
    seed(&store, ObjectKind::Entity, "E", &app);
    seed(&store, ObjectKind::Policy, "p1", &Memento::new("p1", BASIC_POLICY));
    let handler = RecordingHandler::default();

    let mut iteration = manager.new_iteration(&store, &handler, ManagementMode::Master);
    let applications = iteration.run().unwrap();

    assert_eq!(iteration.scratch().count(ObjectKind::Policy), 0);
    assert!(applications[0].adjuncts(ObjectKind::Policy).is_empty());
    assert_eq!(handler.journal.entries(), vec!["start", "done"]);
}

#[test]
fn provenance_is_inherited_from_ancestors() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    seed(
        &store,
        ObjectKind::CatalogItem,
        "shop:2.0",
        &CatalogItemMemento::new("shop", "2.0", BASIC_CATALOG_ITEM),
    );
    let mut app = Memento::new("E", BASIC_APPLICATION).with_catalog_item("shop:2.0");
    app.children = vec!["C".into()];
    seed(&store, ObjectKind::Entity, "E", &app);
    seed(&store, ObjectKind::Entity, "C", &Memento::new("C", BASIC_ENTITY).with_parent("E"));

    let handler = DefaultExceptionHandler::default();
    let mut iteration = manager.new_iteration(&store, &handler, ManagementMode::Master);
    iteration.run().unwrap();

    let child = iteration.scratch().entity("C").unwrap();
    assert_eq!(child.catalog_item_id().as_deref(), Some("shop:2.0"));
}

#[test]
fn locations_are_reconstructed_and_managed_parent_first() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    let mut dc = Memento::new("dc", JOURNAL_LOCATION);
    dc.children = vec!["rack".into()];
    seed(&store, ObjectKind::Location, "rack", &Memento::new("rack", JOURNAL_LOCATION).with_parent("dc"));
    seed(&store, ObjectKind::Location, "dc", &dc);
    let handler = RecordingHandler::default();

    manager.new_iteration(&store, &handler, ManagementMode::Master).run().unwrap();

    assert!(journal.position("reconstruct dc") < journal.position("reconstruct rack"));
    assert!(journal.position("manage dc") < journal.position("manage rack"));
    assert_eq!(journal.count_prefix("manage rack"), 1);
    assert_eq!(
        manager.management().locations().last_transition_mode("rack"),
        Some(ManagementTransitionMode::RebindingCreating)
    );
    assert_eq!(handler.journal.entries(), vec!["start", "done"]);
}

#[test]
fn children_of_a_failed_parent_are_still_managed() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    let mut zone = Memento::new("zone", "test.MissingLocation");
    zone.children = vec!["host".into()];
    seed(&store, ObjectKind::Location, "zone", &zone);
    seed(&store, ObjectKind::Location, "host", &Memento::new("host", JOURNAL_LOCATION).with_parent("zone"));
    let mut app = Memento::new("app", BROKEN_ENTITY);
    app.children = vec!["web".into()];
    seed(&store, ObjectKind::Entity, "app", &app);
    seed(&store, ObjectKind::Entity, "web", &Memento::new("web", JOURNAL_ENTITY).with_parent("app"));
    let handler = RecordingHandler::default();

    let applications = manager
        .new_iteration(&store, &handler, ManagementMode::Master)
        .run()
        .unwrap();

    assert!(applications.is_empty());
    let management = manager.management();
    assert!(management.locations().contains("host"));
    assert!(!management.locations().contains("zone"));
    assert!(management.entities().contains("web"));
    assert!(!management.entities().contains("app"));
    assert_eq!(journal.count_prefix("manage host"), 1);
    assert_eq!(journal.count_prefix("manage web"), 1);
    assert_eq!(handler.journal.count_prefix("create_failed location zone"), 1);
    assert_eq!(handler.journal.count_prefix("create_failed entity app"), 1);
    assert_eq!(handler.journal.count_prefix("manage_failed"), 0);
    assert_eq!(management.locations().pending_mode_count(), 0);
    assert_eq!(management.entities().pending_mode_count(), 0);
}

#[test]
fn children_that_only_name_their_parent_are_managed() {
    let journal = Journal::default();
    let manager = manager(&journal);
    let store = InMemoryStore::new("memory");
    seed(&store, ObjectKind::Location, "root", &Memento::new("root", JOURNAL_LOCATION));
    seed(&store, ObjectKind::Location, "leaf", &Memento::new("leaf", JOURNAL_LOCATION).with_parent("root"));
    seed(&store, ObjectKind::Entity, "E", &Memento::new("E", JOURNAL_ENTITY));
    seed(&store, ObjectKind::Entity, "C", &Memento::new("C", JOURNAL_ENTITY).with_parent("E"));
    let handler = RecordingHandler::default();

    let applications = manager
        .new_iteration(&store, &handler, ManagementMode::Master)
        .run()
        .unwrap();

    assert_eq!(ids(&applications), vec!["E"]);
    let management = manager.management();
    assert!(management.locations().contains("leaf"));
    assert!(management.entities().contains("C"));
    assert!(journal.position("manage root") < journal.position("manage leaf"));
    assert!(journal.position("manage E") < journal.position("manage C"));
    assert_eq!(journal.count_prefix("manage C"), 1);
    assert_eq!(handler.journal.entries(), vec!["start", "done"]);
}
