//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "test"
//! trellis_type: "source"
//! trellis_scope: "test"
//! trellis_description: "Shared fixtures for rebind integration tests."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use trellis_metrics::RebindMetrics;
use trellis_persistence::{
    InMemoryStore, ObjectKind, PersistenceError, PersistenceExceptionHandler,
    PersistenceStoreAccess, RawMementoData,
};
use trellis_rebind::basic::{basic_type_registry, BasicAdjunct, BasicEntity, BasicLocation};
use trellis_rebind::{
    Adjunct, Entity, LiveObject, Location, ManagedObject, ManagementContext, ManagementTransitionMode,
    ObjectError, RebindContext, RebindError, RebindExceptionHandler, RebindManager,
    RebindSettings, TypeDescriptor, TypeRegistry,
};

pub const JOURNAL_ENTITY: &str = "test.JournalEntity";
pub const JOURNAL_LOCATION: &str = "test.JournalLocation";
pub const FRAGILE_APP: &str = "test.FragileApp";
pub const FAILING_POLICY: &str = "test.FailingPolicy";
pub const BROKEN_ENTITY: &str = "test.BrokenEntity";

/// Ordered record of what happened during a pass.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|candidate| candidate == entry)
            .unwrap_or_else(|| panic!("{entry} not in journal {:?}", self.entries()))
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

/// Entity that journals reconstruction and management; optionally refuses to be managed.
#[derive(Debug)]
pub struct JournalEntity {
    inner: BasicEntity,
    journal: Journal,
    fail_manage: bool,
}

impl ManagedObject for JournalEntity {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn assign_id(&self, id: &str) {
        self.inner.assign_id(id)
    }

    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn catalog_item_id(&self) -> Option<String> {
        self.inner.catalog_item_id()
    }

    fn set_catalog_item_id(&self, catalog_item_id: Option<String>) {
        self.inner.set_catalog_item_id(catalog_item_id)
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn set_read_only(&self, read_only: bool) {
        self.inner.set_read_only(read_only)
    }

    fn child_ids(&self) -> Vec<String> {
        self.inner.child_ids()
    }

    fn on_managed(&self, mode: ManagementTransitionMode) -> Result<(), ObjectError> {
        self.journal.push(format!("manage {}", self.id()));
        self.inner.on_managed(mode)?;
        if self.fail_manage {
            return Err(ObjectError::Manage(format!("{} refused", self.id())));
        }
        Ok(())
    }

    fn on_unmanaged(&self, mode: ManagementTransitionMode) {
        self.journal.push(format!("unmanage {}", self.id()));
        self.inner.on_unmanaged(mode)
    }
}

impl Entity for JournalEntity {
    fn reconstruct(
        &self,
        context: &RebindContext<'_>,
        memento: &trellis_persistence::Memento,
    ) -> Result<(), ObjectError> {
        self.journal.push(format!("reconstruct {}", memento.id));
        self.inner.reconstruct(context, memento)
    }

    fn parent_id(&self) -> Option<String> {
        self.inner.parent_id()
    }

    fn location_ids(&self) -> Vec<String> {
        self.inner.location_ids()
    }

    fn display_name(&self) -> Option<String> {
        self.inner.display_name()
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.inner.config(key)
    }

    fn attribute(&self, key: &str) -> Option<Value> {
        self.inner.attribute(key)
    }

    fn add_adjunct(&self, kind: ObjectKind, adjunct: Arc<dyn Adjunct>) -> Result<(), ObjectError> {
        self.inner.add_adjunct(kind, adjunct)
    }

    fn adjuncts(&self, kind: ObjectKind) -> Vec<Arc<dyn Adjunct>> {
        self.inner.adjuncts(kind)
    }
}

/// Location that journals reconstruction and management.
#[derive(Debug)]
pub struct JournalLocation {
    inner: BasicLocation,
    journal: Journal,
}

impl ManagedObject for JournalLocation {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn assign_id(&self, id: &str) {
        self.inner.assign_id(id)
    }

    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn catalog_item_id(&self) -> Option<String> {
        self.inner.catalog_item_id()
    }

    fn set_catalog_item_id(&self, catalog_item_id: Option<String>) {
        self.inner.set_catalog_item_id(catalog_item_id)
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn set_read_only(&self, read_only: bool) {
        self.inner.set_read_only(read_only)
    }

    fn child_ids(&self) -> Vec<String> {
        self.inner.child_ids()
    }

    fn on_managed(&self, mode: ManagementTransitionMode) -> Result<(), ObjectError> {
        self.journal.push(format!("manage {}", self.id()));
        self.inner.on_managed(mode)
    }
}

impl Location for JournalLocation {
    fn reconstruct(
        &self,
        context: &RebindContext<'_>,
        memento: &trellis_persistence::Memento,
    ) -> Result<(), ObjectError> {
        self.journal.push(format!("reconstruct {}", memento.id));
        self.inner.reconstruct(context, memento)
    }

    fn parent_id(&self) -> Option<String> {
        self.inner.parent_id()
    }

    fn display_name(&self) -> Option<String> {
        self.inner.display_name()
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.inner.config(key)
    }
}

/// Policy whose reconstruction always fails.
#[derive(Debug)]
pub struct FailingPolicy(BasicAdjunct);

impl ManagedObject for FailingPolicy {
    fn id(&self) -> String {
        self.0.id()
    }

    fn assign_id(&self, id: &str) {
        self.0.assign_id(id)
    }

    fn type_name(&self) -> &str {
        self.0.type_name()
    }

    fn catalog_item_id(&self) -> Option<String> {
        self.0.catalog_item_id()
    }

    fn set_catalog_item_id(&self, catalog_item_id: Option<String>) {
        self.0.set_catalog_item_id(catalog_item_id)
    }

    fn is_read_only(&self) -> bool {
        self.0.is_read_only()
    }

    fn set_read_only(&self, read_only: bool) {
        self.0.set_read_only(read_only)
    }
}

impl Adjunct for FailingPolicy {
    fn reconstruct(
        &self,
        _context: &RebindContext<'_>,
        _memento: &trellis_persistence::Memento,
    ) -> Result<(), ObjectError> {
        Err(ObjectError::Reconstruct("policy state is corrupt".into()))
    }

    fn attach(&self, entity_id: &str) -> Result<(), ObjectError> {
        self.0.attach(entity_id)
    }

    fn entity_id(&self) -> Option<String> {
        self.0.entity_id()
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.0.config(key)
    }
}

/// Stock types plus the journaling and failing test types.
pub fn test_types(journal: &Journal) -> TypeRegistry {
    let mut types = basic_type_registry();
    for (name, fail_manage) in [(JOURNAL_ENTITY, false), (FRAGILE_APP, true)] {
        let journal = journal.clone();
        types.register(TypeDescriptor::canonical(name, ObjectKind::Entity, move |spec| {
            Ok(LiveObject::Entity(Arc::new(JournalEntity {
                inner: BasicEntity::new(spec.id, spec.type_name),
                journal: journal.clone(),
                fail_manage,
            })))
        }));
    }
    let location_journal = journal.clone();
    types
        .register(TypeDescriptor::canonical(JOURNAL_LOCATION, ObjectKind::Location, move |spec| {
            Ok(LiveObject::Location(Arc::new(JournalLocation {
                inner: BasicLocation::new(spec.id, spec.type_name),
                journal: location_journal.clone(),
            })))
        }))
        .register(TypeDescriptor::canonical(FAILING_POLICY, ObjectKind::Policy, |spec| {
            Ok(LiveObject::Policy(Arc::new(FailingPolicy(BasicAdjunct::new(
                spec.id,
                spec.type_name,
            )))))
        }))
        .register(TypeDescriptor::canonical(BROKEN_ENTITY, ObjectKind::Entity, |_| {
            Err(ObjectError::Construct("constructor exploded".into()))
        }));
    types
}

pub fn manager_with(journal: &Journal, settings: RebindSettings) -> RebindManager {
    RebindManager::new(
        Arc::new(ManagementContext::new("node-a", test_types(journal))),
        settings,
        RebindMetrics::detached().unwrap(),
    )
}

pub fn manager(journal: &Journal) -> RebindManager {
    manager_with(journal, RebindSettings::default())
}

pub fn seed<T: Serialize>(store: &InMemoryStore, kind: ObjectKind, id: &str, value: &T) {
    store.seed(kind, id, serde_json::to_string(value).unwrap());
}

pub fn ids(applications: &[Arc<dyn Entity>]) -> Vec<String> {
    applications.iter().map(|app| app.id()).collect()
}

/// Handler that journals every notification and never fails the pass.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub journal: Journal,
}

impl PersistenceExceptionHandler for RecordingHandler {
    fn on_load_memento_failed(
        &self,
        kind: ObjectKind,
        message: &str,
        _error: &PersistenceError,
    ) -> trellis_persistence::Result<()> {
        self.journal.push(format!("load_failed {kind} {message}"));
        Ok(())
    }

    fn on_dangling_reference(&self, kind: ObjectKind, id: &str) -> trellis_persistence::Result<()> {
        self.journal.push(format!("dangling {kind} {id}"));
        Ok(())
    }
}

impl RebindExceptionHandler for RecordingHandler {
    fn on_start(&self, _context: &RebindContext<'_>) {
        self.journal.push("start");
    }

    fn on_create_failed(
        &self,
        kind: ObjectKind,
        id: &str,
        _type_name: &str,
        _error: &ObjectError,
    ) -> Result<(), RebindError> {
        self.journal.push(format!("create_failed {kind} {id}"));
        Ok(())
    }

    fn on_not_found(&self, kind: ObjectKind, id: &str) -> Result<(), RebindError> {
        self.journal.push(format!("not_found {kind} {id}"));
        Ok(())
    }

    fn on_rebind_failed(
        &self,
        kind: ObjectKind,
        object: &LiveObject,
        _error: &ObjectError,
    ) -> Result<(), RebindError> {
        self.journal.push(format!("rebind_failed {kind} {}", object.id()));
        Ok(())
    }

    fn on_manage_failed(
        &self,
        kind: ObjectKind,
        object: &LiveObject,
        _error: &ObjectError,
    ) -> Result<(), RebindError> {
        self.journal.push(format!("manage_failed {kind} {}", object.id()));
        Ok(())
    }

    fn on_done(&self) -> Result<(), RebindError> {
        self.journal.push("done");
        Ok(())
    }

    fn on_failed(&self, error: RebindError) -> RebindError {
        self.journal.push(format!("failed {error}"));
        error
    }

    fn errors(&self) -> Vec<String> {
        Vec::new()
    }

    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Store whose raw load announces itself and waits for a go-ahead.
pub struct GatedStore {
    pub name: &'static str,
    pub inner: InMemoryStore,
    pub events: Journal,
    pub entered: Sender<&'static str>,
    pub gate: Option<Mutex<Receiver<()>>>,
}

impl PersistenceStoreAccess for GatedStore {
    fn backing_store_description(&self) -> String {
        self.name.to_owned()
    }

    fn load_raw_data(
        &self,
        handler: &dyn PersistenceExceptionHandler,
    ) -> trellis_persistence::Result<RawMementoData> {
        self.events.push(format!("{}-start", self.name));
        let _ = self.entered.send(self.name);
        if let Some(gate) = &self.gate {
            gate.lock().recv().unwrap();
        }
        self.events.push(format!("{}-end", self.name));
        self.inner.load_raw_data(handler)
    }

    fn is_writable(&self) -> bool {
        self.inner.is_writable()
    }

    fn set_writable(&self, writable: bool) {
        self.inner.set_writable(writable)
    }
}
