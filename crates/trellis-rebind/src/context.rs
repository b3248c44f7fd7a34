//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use trellis_persistence::{LookupContext, ObjectKind};

use crate::management::ManagementContext;
use crate::object::{Adjunct, CatalogItem, Entity, LiveObject, Location};

/// Per-pass table of the shells created so far, by kind and id.
///
/// Absence of an id is an ordinary "not found" condition for every phase
/// that consults the table.
#[derive(Debug)]
pub struct RebindScratchContext {
    objects: IndexMap<ObjectKind, IndexMap<String, LiveObject>>,
    read_only: HashSet<(ObjectKind, String)>,
    all_read_only: bool,
}

impl RebindScratchContext {
    /// `all_read_only` marks every registered object read-only.
    pub fn new(all_read_only: bool) -> Self {
        Self {
            objects: ObjectKind::ALL
                .iter()
                .map(|kind| (*kind, IndexMap::new()))
                .collect(),
            read_only: HashSet::new(),
            all_read_only,
        }
    }

    pub fn all_read_only(&self) -> bool {
        self.all_read_only
    }

    pub fn register(&mut self, object: LiveObject) {
        let kind = object.kind();
        let id = object.id();
        if self.all_read_only {
            object.set_read_only(true);
            self.read_only.insert((kind, id.clone()));
        }
        if let Some(objects) = self.objects.get_mut(&kind) {
            objects.insert(id, object);
        }
    }

    pub fn unregister(&mut self, kind: ObjectKind, id: &str) -> Option<LiveObject> {
        self.read_only.remove(&(kind, id.to_owned()));
        self.objects.get_mut(&kind)?.shift_remove(id)
    }

    pub fn get(&self, kind: ObjectKind, id: &str) -> Option<&LiveObject> {
        self.objects.get(&kind)?.get(id)
    }

    pub fn contains(&self, kind: ObjectKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    pub fn is_read_only(&self, kind: ObjectKind, id: &str) -> bool {
        self.read_only.contains(&(kind, id.to_owned()))
    }

    /// Objects of `kind` in registration order.
    pub fn objects(&self, kind: ObjectKind) -> impl Iterator<Item = &LiveObject> {
        self.objects.get(&kind).into_iter().flat_map(|objects| objects.values())
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.get(&kind).map_or(0, IndexMap::len)
    }

    pub fn entity(&self, id: &str) -> Option<Arc<dyn Entity>> {
        self.get(ObjectKind::Entity, id)?.as_entity().cloned()
    }

    pub fn location(&self, id: &str) -> Option<Arc<dyn Location>> {
        self.get(ObjectKind::Location, id)?.as_location().cloned()
    }

    pub fn adjunct(&self, kind: ObjectKind, id: &str) -> Option<Arc<dyn Adjunct>> {
        self.get(kind, id)?.as_adjunct().cloned()
    }

    pub fn catalog_item(&self, id: &str) -> Option<Arc<dyn CatalogItem>> {
        self.get(ObjectKind::CatalogItem, id)?
            .as_catalog_item()
            .cloned()
    }

    pub fn entities(&self) -> Vec<Arc<dyn Entity>> {
        self.objects(ObjectKind::Entity)
            .filter_map(|object| object.as_entity().cloned())
            .collect()
    }

    pub fn locations(&self) -> Vec<Arc<dyn Location>> {
        self.objects(ObjectKind::Location)
            .filter_map(|object| object.as_location().cloned())
            .collect()
    }

    pub fn catalog_items(&self) -> Vec<Arc<dyn CatalogItem>> {
        self.objects(ObjectKind::CatalogItem)
            .filter_map(|object| object.as_catalog_item().cloned())
            .collect()
    }
}

/// What an object sees while it is being reconstructed.
///
/// Lookups consult the objects rebuilt in this pass first and fall back to
/// the live manager.
#[derive(Debug, Clone, Copy)]
pub struct RebindContext<'a> {
    scratch: &'a RebindScratchContext,
    management: &'a ManagementContext,
    rebinding: bool,
}

impl<'a> RebindContext<'a> {
    pub fn new(scratch: &'a RebindScratchContext, management: &'a ManagementContext) -> Self {
        Self {
            scratch,
            management,
            rebinding: true,
        }
    }

    /// Set while a rebind pass is in progress.
    pub fn is_rebinding(&self) -> bool {
        self.rebinding
    }

    pub fn is_read_only(&self) -> bool {
        self.scratch.all_read_only()
    }

    pub fn scratch(&self) -> &'a RebindScratchContext {
        self.scratch
    }

    pub fn entity(&self, id: &str) -> Option<Arc<dyn Entity>> {
        self.scratch
            .entity(id)
            .or_else(|| self.management.entities().get(id))
    }

    pub fn location(&self, id: &str) -> Option<Arc<dyn Location>> {
        self.scratch
            .location(id)
            .or_else(|| self.management.locations().get(id))
    }

    pub fn adjunct(&self, kind: ObjectKind, id: &str) -> Option<Arc<dyn Adjunct>> {
        self.scratch.adjunct(kind, id)
    }

    pub fn catalog_item(&self, id: &str) -> Option<Arc<dyn CatalogItem>> {
        self.scratch
            .catalog_item(id)
            .or_else(|| self.management.catalog().get_optional_version(id))
    }
}

impl LookupContext for RebindContext<'_> {
    fn contains(&self, kind: ObjectKind, id: &str) -> bool {
        match kind {
            ObjectKind::Entity => self.entity(id).is_some(),
            ObjectKind::Location => self.location(id).is_some(),
            ObjectKind::CatalogItem => self.catalog_item(id).is_some(),
            adjunct => self.scratch.contains(adjunct, id),
        }
    }
}
