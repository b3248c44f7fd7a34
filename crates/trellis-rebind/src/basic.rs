//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Stock implementations of every object kind, and a registry preloaded
//! with them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;
use trellis_persistence::{CatalogItemMemento, Memento, ObjectKind};

use crate::context::RebindContext;
use crate::error::ObjectError;
use crate::object::{Adjunct, CatalogItem, Entity, LiveObject, Location, ManagedObject};
use crate::transition::ManagementTransitionMode;
use crate::types::{Flags, ShellSpec, TypeDescriptor, TypeRegistry};

pub const BASIC_APPLICATION: &str = "trellis.entity.BasicApplication";
pub const BASIC_ENTITY: &str = "trellis.entity.BasicEntity";
pub const BASIC_LOCATION: &str = "trellis.location.BasicLocation";
pub const BASIC_POLICY: &str = "trellis.policy.BasicPolicy";
pub const BASIC_ENRICHER: &str = "trellis.enricher.BasicEnricher";
pub const BASIC_FEED: &str = "trellis.feed.BasicFeed";
pub const BASIC_CATALOG_ITEM: &str = "trellis.catalog.BasicCatalogItem";

/// Identity shared by the stock implementations.
#[derive(Debug)]
pub struct ShellCore {
    id: RwLock<String>,
    type_name: String,
    catalog_item_id: RwLock<Option<String>>,
    read_only: AtomicBool,
}

impl ShellCore {
    pub fn new(id: &str, type_name: &str) -> Self {
        Self {
            id: RwLock::new(id.to_owned()),
            type_name: type_name.to_owned(),
            catalog_item_id: RwLock::new(None),
            read_only: AtomicBool::new(false),
        }
    }
}

macro_rules! delegate_managed_object {
    ($ty:ty) => {
        fn id(&self) -> String {
            self.core.id.read().clone()
        }

        fn assign_id(&self, id: &str) {
            *self.core.id.write() = id.to_owned();
        }

        fn type_name(&self) -> &str {
            &self.core.type_name
        }

        fn catalog_item_id(&self) -> Option<String> {
            self.core.catalog_item_id.read().clone()
        }

        fn set_catalog_item_id(&self, catalog_item_id: Option<String>) {
            *self.core.catalog_item_id.write() = catalog_item_id;
        }

        fn is_read_only(&self) -> bool {
            self.core.read_only.load(Ordering::SeqCst)
        }

        fn set_read_only(&self, read_only: bool) {
            self.core.read_only.store(read_only, Ordering::SeqCst);
        }
    };
}

#[derive(Debug, Default)]
struct EntityState {
    display_name: Option<String>,
    parent: Option<String>,
    children: Vec<String>,
    locations: Vec<String>,
    config: BTreeMap<String, Value>,
    attributes: BTreeMap<String, Value>,
    policies: Vec<Arc<dyn Adjunct>>,
    enrichers: Vec<Arc<dyn Adjunct>>,
    feeds: Vec<Arc<dyn Adjunct>>,
    managed: Option<ManagementTransitionMode>,
}

/// Plain entity; applications use the same implementation.
#[derive(Debug)]
pub struct BasicEntity {
    core: ShellCore,
    state: RwLock<EntityState>,
}

impl BasicEntity {
    pub fn new(id: &str, type_name: &str) -> Self {
        Self {
            core: ShellCore::new(id, type_name),
            state: RwLock::new(EntityState::default()),
        }
    }

    /// Last transition the live manager applied.
    pub fn managed_mode(&self) -> Option<ManagementTransitionMode> {
        self.state.read().managed
    }
}

impl ManagedObject for BasicEntity {
    delegate_managed_object!(BasicEntity);

    fn child_ids(&self) -> Vec<String> {
        self.state.read().children.clone()
    }

    fn on_managed(&self, mode: ManagementTransitionMode) -> Result<(), ObjectError> {
        self.state.write().managed = Some(mode);
        Ok(())
    }

    fn on_unmanaged(&self, mode: ManagementTransitionMode) {
        trace!(entity = %self.id(), %mode, "entity unmanaged");
        self.state.write().managed = None;
    }
}

impl Entity for BasicEntity {
    fn reconstruct(&self, context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError> {
        let mut state = self.state.write();
        state.display_name = memento.display_name.clone();
        state.parent = memento
            .parent
            .clone()
            .filter(|parent| context.entity(parent).is_some());
        state.children = memento.children.clone();
        state.config = memento.config.clone();
        state.attributes = memento.attributes.clone();
        state.locations = memento
            .locations
            .iter()
            .filter(|id| context.location(id).is_some())
            .cloned()
            .collect();
        Ok(())
    }

    fn parent_id(&self) -> Option<String> {
        self.state.read().parent.clone()
    }

    fn location_ids(&self) -> Vec<String> {
        self.state.read().locations.clone()
    }

    fn display_name(&self) -> Option<String> {
        self.state.read().display_name.clone()
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.state.read().config.get(key).cloned()
    }

    fn attribute(&self, key: &str) -> Option<Value> {
        self.state.read().attributes.get(key).cloned()
    }

    fn add_adjunct(&self, kind: ObjectKind, adjunct: Arc<dyn Adjunct>) -> Result<(), ObjectError> {
        adjunct.attach(&self.id())?;
        let mut state = self.state.write();
        let slot = match kind {
            ObjectKind::Policy => &mut state.policies,
            ObjectKind::Enricher => &mut state.enrichers,
            ObjectKind::Feed => &mut state.feeds,
            other => {
                return Err(ObjectError::Reconstruct(format!(
                    "{other} cannot be attached to an entity"
                )))
            }
        };
        slot.push(adjunct);
        Ok(())
    }

    fn adjuncts(&self, kind: ObjectKind) -> Vec<Arc<dyn Adjunct>> {
        let state = self.state.read();
        match kind {
            ObjectKind::Policy => state.policies.clone(),
            ObjectKind::Enricher => state.enrichers.clone(),
            ObjectKind::Feed => state.feeds.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct LocationState {
    display_name: Option<String>,
    parent: Option<String>,
    children: Vec<String>,
    config: BTreeMap<String, Value>,
}

#[derive(Debug)]
pub struct BasicLocation {
    core: ShellCore,
    state: RwLock<LocationState>,
}

impl BasicLocation {
    pub fn new(id: &str, type_name: &str) -> Self {
        Self {
            core: ShellCore::new(id, type_name),
            state: RwLock::new(LocationState::default()),
        }
    }

    /// Legacy construction from an `id`/`deferConstructionChecks` flag map.
    pub fn from_flags(type_name: &str, flags: &Flags) -> Self {
        let id = flags.get("id").and_then(Value::as_str).unwrap_or_default();
        let location = Self::new(id, type_name);
        location.state.write().config = flags
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "deferConstructionChecks")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        location
    }
}

impl ManagedObject for BasicLocation {
    delegate_managed_object!(BasicLocation);

    fn child_ids(&self) -> Vec<String> {
        self.state.read().children.clone()
    }
}

impl Location for BasicLocation {
    fn reconstruct(&self, context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError> {
        let mut state = self.state.write();
        state.display_name = memento.display_name.clone();
        state.parent = memento
            .parent
            .clone()
            .filter(|parent| context.location(parent).is_some());
        state.children = memento.children.clone();
        state.config.extend(memento.config.clone());
        Ok(())
    }

    fn parent_id(&self) -> Option<String> {
        self.state.read().parent.clone()
    }

    fn display_name(&self) -> Option<String> {
        self.state.read().display_name.clone()
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.state.read().config.get(key).cloned()
    }
}

#[derive(Debug, Default)]
struct AdjunctState {
    display_name: Option<String>,
    config: BTreeMap<String, Value>,
    attributes: BTreeMap<String, Value>,
    entity: Option<String>,
}

/// Stock policy, enricher or feed.
#[derive(Debug)]
pub struct BasicAdjunct {
    core: ShellCore,
    state: RwLock<AdjunctState>,
}

impl BasicAdjunct {
    pub fn new(id: &str, type_name: &str) -> Self {
        Self {
            core: ShellCore::new(id, type_name),
            state: RwLock::new(AdjunctState::default()),
        }
    }

    /// Legacy construction: flags carry the id and the persisted config.
    pub fn from_flags(type_name: &str, flags: &Flags) -> Self {
        let id = flags.get("id").and_then(Value::as_str).unwrap_or_default();
        let adjunct = Self::new(id, type_name);
        adjunct.state.write().config = flags
            .iter()
            .filter(|(key, _)| {
                !matches!(
                    key.as_str(),
                    "id" | "deferConstructionChecks" | "noConstructionInit"
                )
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        adjunct
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.state.read().attributes.get(key).cloned()
    }
}

impl ManagedObject for BasicAdjunct {
    delegate_managed_object!(BasicAdjunct);
}

impl Adjunct for BasicAdjunct {
    fn reconstruct(&self, _context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError> {
        let mut state = self.state.write();
        state.display_name = memento.display_name.clone();
        state.config.extend(memento.config.clone());
        state.attributes = memento.attributes.clone();
        Ok(())
    }

    fn attach(&self, entity_id: &str) -> Result<(), ObjectError> {
        let mut state = self.state.write();
        if let Some(existing) = state.entity.as_deref() {
            if existing != entity_id {
                return Err(ObjectError::Reconstruct(format!(
                    "{} is already attached to {existing}",
                    self.core.id.read()
                )));
            }
        }
        state.entity = Some(entity_id.to_owned());
        Ok(())
    }

    fn entity_id(&self) -> Option<String> {
        self.state.read().entity.clone()
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.state.read().config.get(key).cloned()
    }
}

#[derive(Debug)]
pub struct BasicCatalogItem {
    core: ShellCore,
    state: RwLock<CatalogItemMemento>,
}

impl BasicCatalogItem {
    /// Empty shell; populated by [`CatalogItem::reconstruct`].
    pub fn new(id: &str, type_name: &str) -> Self {
        Self {
            core: ShellCore::new(id, type_name),
            state: RwLock::new(CatalogItemMemento::default()),
        }
    }

    /// Fully populated item.
    pub fn from_memento(memento: &CatalogItemMemento) -> Self {
        Self {
            core: ShellCore::new(&memento.id, &memento.type_name),
            state: RwLock::new(memento.clone()),
        }
    }
}

impl ManagedObject for BasicCatalogItem {
    delegate_managed_object!(BasicCatalogItem);
}

impl CatalogItem for BasicCatalogItem {
    fn reconstruct(&self, memento: &CatalogItemMemento) -> Result<(), ObjectError> {
        *self.state.write() = memento.clone();
        Ok(())
    }

    fn symbolic_name(&self) -> String {
        self.state.read().symbolic_name.clone()
    }

    fn version(&self) -> String {
        self.state.read().version.clone()
    }

    fn libraries(&self) -> Vec<String> {
        self.state.read().libraries.clone()
    }

    fn registered_type(&self) -> Option<String> {
        self.state.read().registered_type.clone()
    }
}

fn entity_factory(spec: &ShellSpec<'_>) -> Result<LiveObject, ObjectError> {
    Ok(LiveObject::Entity(Arc::new(BasicEntity::new(spec.id, spec.type_name))))
}

fn adjunct_factory(kind: ObjectKind) -> impl Fn(&ShellSpec<'_>) -> Result<LiveObject, ObjectError> {
    move |spec| {
        let adjunct: Arc<dyn Adjunct> = Arc::new(BasicAdjunct::new(spec.id, spec.type_name));
        LiveObject::adjunct(kind, adjunct).ok_or(ObjectError::KindMismatch {
            type_name: spec.type_name.to_owned(),
            expected: ObjectKind::Policy,
            actual: kind,
        })
    }
}

/// Registry holding the stock type of every kind.
pub fn basic_type_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(TypeDescriptor::canonical(BASIC_APPLICATION, ObjectKind::Entity, entity_factory))
        .register(TypeDescriptor::canonical(BASIC_ENTITY, ObjectKind::Entity, entity_factory))
        .register(TypeDescriptor::canonical(BASIC_LOCATION, ObjectKind::Location, |spec| {
            Ok(LiveObject::Location(Arc::new(BasicLocation::new(spec.id, spec.type_name))))
        }))
        .register(TypeDescriptor::canonical(
            BASIC_POLICY,
            ObjectKind::Policy,
            adjunct_factory(ObjectKind::Policy),
        ))
        .register(TypeDescriptor::canonical(
            BASIC_ENRICHER,
            ObjectKind::Enricher,
            adjunct_factory(ObjectKind::Enricher),
        ))
        .register(TypeDescriptor::canonical(
            BASIC_FEED,
            ObjectKind::Feed,
            adjunct_factory(ObjectKind::Feed),
        ))
        .register(TypeDescriptor::canonical(
            BASIC_CATALOG_ITEM,
            ObjectKind::CatalogItem,
            |spec| {
                Ok(LiveObject::CatalogItem(Arc::new(BasicCatalogItem::new(
                    spec.id,
                    spec.type_name,
                ))))
            },
        ));
    registry
}
