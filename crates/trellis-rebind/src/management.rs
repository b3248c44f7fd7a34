//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! The live manager: registries of managed entities and locations, the
//! catalog and the type registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::trace;
use trellis_persistence::ObjectKind;

use crate::catalog::Catalog;
use crate::error::ObjectError;
use crate::object::{Entity, LiveObject, Location, ManagedObject};
use crate::transition::ManagementTransitionMode;
use crate::types::TypeRegistry;

#[derive(Debug, Clone)]
struct Registered<T: ?Sized> {
    object: Arc<T>,
    mode: ManagementTransitionMode,
}

/// Objects of one kind currently under management.
pub struct ObjectRegistry<T: ?Sized> {
    kind: ObjectKind,
    objects: RwLock<IndexMap<String, Registered<T>>>,
    pending_modes: Mutex<HashMap<String, ManagementTransitionMode>>,
}

impl<T: ?Sized + ManagedObject> ObjectRegistry<T> {
    fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            objects: RwLock::new(IndexMap::new()),
            pending_modes: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.objects.read().get(id).map(|entry| entry.object.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<Arc<T>> {
        self.objects
            .read()
            .values()
            .map(|entry| entry.object.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Transition applied when `id` was last managed.
    pub fn last_transition_mode(&self, id: &str) -> Option<ManagementTransitionMode> {
        self.objects.read().get(id).map(|entry| entry.mode)
    }

    /// True when any managed object is live rather than read-only.
    pub fn has_primary_objects(&self) -> bool {
        self.objects
            .read()
            .values()
            .any(|entry| !entry.object.is_read_only())
    }

    /// Record the transition to use the next time `id` is managed.
    pub fn set_transition_mode(&self, id: &str, mode: ManagementTransitionMode) {
        self.pending_modes.lock().insert(id.to_owned(), mode);
    }

    /// Manage an object created outside of a rebind.
    pub fn manage(&self, object: Arc<T>) -> Result<(), ObjectError> {
        self.manage_with_mode(object, ManagementTransitionMode::Creating)
    }

    fn manage_with_mode(&self, object: Arc<T>, mode: ManagementTransitionMode) -> Result<(), ObjectError> {
        let id = object.id();
        object.set_read_only(mode.is_read_only());
        self.objects.write().insert(
            id.clone(),
            Registered {
                object: object.clone(),
                mode,
            },
        );
        trace!(kind = %self.kind, id = %id, %mode, "managed");
        object.on_managed(mode)
    }

    /// Manage `root` and every descendant reachable through `children`.
    ///
    /// Each object is registered before its management hook runs, so a failing
    /// hook leaves the object registered. The first failure is returned after
    /// the whole tree has been visited.
    pub fn manage_rebinded_root(
        &self,
        root: &Arc<T>,
        children: impl Fn(&T) -> Vec<Arc<T>>,
    ) -> Result<usize, ObjectError> {
        let mut visited = HashSet::new();
        let mut stack = vec![root.clone()];
        let mut first_error = None;
        while let Some(object) = stack.pop() {
            let id = object.id();
            if !visited.insert(id.clone()) {
                continue;
            }
            let mode = self
                .pending_modes
                .lock()
                .remove(&id)
                .unwrap_or(ManagementTransitionMode::RebindingCreating);
            if let Err(err) = self.manage_with_mode(object.clone(), mode) {
                first_error.get_or_insert(ObjectError::Manage(format!("{} {id}: {err}", self.kind)));
            }
            stack.extend(children(&*object).into_iter().rev());
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(visited.len()),
        }
    }

    /// Forget transitions recorded for objects no root reached; returns how many.
    pub fn clear_pending_modes(&self) -> usize {
        let mut pending = self.pending_modes.lock();
        let count = pending.len();
        pending.clear();
        count
    }

    pub fn pending_mode_count(&self) -> usize {
        self.pending_modes.lock().len()
    }

    /// Drop `id` from management.
    pub fn unmanage(&self, id: &str, mode: ManagementTransitionMode) -> Option<Arc<T>> {
        self.pending_modes.lock().remove(id);
        let removed = self.objects.write().shift_remove(id)?;
        removed.object.on_unmanaged(mode);
        trace!(kind = %self.kind, id, %mode, "unmanaged");
        Some(removed.object)
    }
}

impl<T: ?Sized> std::fmt::Debug for ObjectRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("kind", &self.kind)
            .field("objects", &self.objects.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-wide management state that a rebind writes into.
#[derive(Debug)]
pub struct ManagementContext {
    node_id: String,
    types: Arc<TypeRegistry>,
    catalog: Catalog,
    entities: ObjectRegistry<dyn Entity>,
    locations: ObjectRegistry<dyn Location>,
    pre_managed: Mutex<HashSet<(ObjectKind, String)>>,
}

impl ManagementContext {
    pub fn new(node_id: impl Into<String>, types: TypeRegistry) -> Self {
        Self {
            node_id: node_id.into(),
            types: Arc::new(types),
            catalog: Catalog::new(),
            entities: ObjectRegistry::new(ObjectKind::Entity),
            locations: ObjectRegistry::new(ObjectKind::Location),
            pre_managed: Mutex::new(HashSet::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn entities(&self) -> &ObjectRegistry<dyn Entity> {
        &self.entities
    }

    pub fn locations(&self) -> &ObjectRegistry<dyn Location> {
        &self.locations
    }

    /// Note a freshly constructed shell before any of its state is populated.
    pub fn pre_manage(&self, object: &LiveObject) {
        self.pre_managed.lock().insert((object.kind(), object.id()));
    }

    pub fn is_pre_managed(&self, kind: ObjectKind, id: &str) -> bool {
        self.pre_managed.lock().contains(&(kind, id.to_owned()))
    }

    /// Forget every pre-managed shell, returning how many there were.
    pub fn clear_pre_managed(&self) -> usize {
        let mut pre_managed = self.pre_managed.lock();
        let count = pre_managed.len();
        pre_managed.clear();
        count
    }

    /// Entity or location lookup across both registries.
    pub fn contains(&self, kind: ObjectKind, id: &str) -> bool {
        match kind {
            ObjectKind::Entity => self.entities.contains(id),
            ObjectKind::Location => self.locations.contains(id),
            ObjectKind::CatalogItem => self.catalog.get_optional_version(id).is_some(),
            _ => false,
        }
    }
}
