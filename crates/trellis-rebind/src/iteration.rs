//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! One rebind pass: reconstructs the live graph from a store in eight
//! strictly ordered phases.
//!
//! 1. load the raw payloads and the manifest;
//! 2. rebuild the catalog;
//! 3. create location and entity shells;
//! 4. decode the full mementos;
//! 5. create policy, enricher and feed shells;
//! 6. reconstruct every shell;
//! 7. attach adjuncts to their entities;
//! 8. hand locations and entities to the live manager.
//!
//! Per-object problems go to the [`RebindExceptionHandler`]; only phase
//! ordering faults and store failures abort the pass directly.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, trace, warn};
use trellis_common::{ManagementMode, PersistenceFeatures};
use trellis_logging::{log_at, LogContext, LoggingLevel};
use trellis_persistence::{
    FullMemento, Memento, MementoManifest, ObjectKind, PersistenceExceptionHandler,
    PersistenceStoreAccess, RawMementoData,
};

use crate::context::{RebindContext, RebindScratchContext};
use crate::error::RebindError;
use crate::handler::RebindExceptionHandler;
use crate::instantiator::ObjectInstantiator;
use crate::management::ManagementContext;
use crate::manager::RebindManager;
use crate::object::{Entity, LiveObject, ManagedObject};
use crate::provenance::CatalogProvenanceResolver;
use crate::sorter::sort_parent_first;
use crate::transition::ManagementTransitionMode;

/// Adjunct kinds in the order they are created and reconstructed.
const ADJUNCT_KINDS: [ObjectKind; 3] = [ObjectKind::Policy, ObjectKind::Enricher, ObjectKind::Feed];

const FINAL_PHASE: u8 = 8;

/// Whether persistence of `kind` is switched on.
pub fn persistence_enabled(features: &PersistenceFeatures, kind: ObjectKind) -> bool {
    match kind {
        ObjectKind::CatalogItem => features.catalog_items,
        ObjectKind::Policy => features.policies,
        ObjectKind::Enricher => features.enrichers,
        ObjectKind::Feed => features.feeds,
        ObjectKind::Entity | ObjectKind::Location => true,
    }
}

/// A single-use rebind pass. Create one per pass with
/// [`RebindManager::new_iteration`].
pub struct RebindIteration<'a, H: RebindExceptionHandler> {
    manager: &'a RebindManager,
    store: &'a dyn PersistenceStoreAccess,
    handler: &'a H,
    mode: ManagementMode,
    phase: u8,
    started: bool,
    timer: Option<Instant>,
    scratch: RebindScratchContext,
    is_empty: bool,
    overwriting_master: bool,
}

impl<'a, H: RebindExceptionHandler> RebindIteration<'a, H> {
    pub(crate) fn new(
        manager: &'a RebindManager,
        store: &'a dyn PersistenceStoreAccess,
        handler: &'a H,
        mode: ManagementMode,
    ) -> Self {
        Self {
            manager,
            store,
            handler,
            mode,
            phase: 0,
            started: false,
            timer: None,
            scratch: RebindScratchContext::new(mode.is_read_only()),
            is_empty: false,
            overwriting_master: false,
        }
    }

    pub fn mode(&self) -> ManagementMode {
        self.mode
    }

    /// Last phase entered; 0 before the pass starts.
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// True when the store held no entities, locations or catalog items.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// True when a master pass found live, writable objects already managed.
    pub fn overwriting_master(&self) -> bool {
        self.overwriting_master
    }

    /// Shells built by this pass.
    pub fn scratch(&self) -> &RebindScratchContext {
        &self.scratch
    }

    /// Run every phase, returning the top-level applications now managed.
    ///
    /// Blocks until no other pass of the same manager is running.
    pub fn run(&mut self) -> Result<Vec<Arc<dyn Entity>>, RebindError> {
        if self.started {
            return Err(RebindError::AlreadyRun);
        }
        self.started = true;

        let _permit = self.manager.acquire_permit();
        if self.mode.is_hot_proxy() {
            self.manager.read_only_count.fetch_add(1, Ordering::SeqCst);
        }
        let timer = Instant::now();
        self.timer = Some(timer);
        let management = self.management();
        self.handler
            .on_start(&RebindContext::new(&self.scratch, management));

        let result = self
            .run_phases()
            .and_then(|applications| self.handler.on_done().map(|()| applications));

        let elapsed = timer.elapsed();
        match result {
            Ok(applications) => {
                self.manager.metrics.note_success(elapsed);
                self.note_errors(None);
                Ok(applications)
            }
            Err(err) => {
                self.manager.metrics.note_failure(elapsed);
                self.note_errors(Some(&err));
                trellis_logging::trellis_warn!(context = self.log_context(), "rebind failed: {}", err);
                Err(self.handler.on_failed(err))
            }
        }
    }

    fn run_phases(&mut self) -> Result<Vec<Arc<dyn Entity>>, RebindError> {
        let (raw, manifest) = self.load_manifest_files()?;
        self.rebuild_catalog(&manifest)?;
        self.instantiate_locations_and_entities(&manifest)?;
        let full = self.load_mementos(&raw)?;
        self.instantiate_adjuncts(&full)?;
        self.reconstruct_everything(&full)?;
        self.associate_adjuncts_with_entities(&full)?;
        let applications = self.manage_the_objects(&full)?;
        self.finishing_up(&full, &applications)?;
        Ok(applications)
    }

    fn management(&self) -> &'a ManagementContext {
        &self.manager.management
    }

    fn instantiator(&self) -> ObjectInstantiator<'a> {
        ObjectInstantiator::new(
            self.management(),
            self.manager.settings.infer_catalog_item_on_rebind,
        )
    }

    fn enabled(&self, kind: ObjectKind) -> bool {
        persistence_enabled(&self.manager.settings.features, kind)
    }

    fn store_handler(&self) -> &'a dyn PersistenceExceptionHandler {
        self.handler
    }

    fn check_entering_phase(&mut self, phase: u8) -> Result<(), RebindError> {
        self.phase += 1;
        self.check_continuing_phase(phase)
    }

    fn check_continuing_phase(&self, phase: u8) -> Result<(), RebindError> {
        if self.phase != phase {
            return Err(RebindError::PhaseMismatch {
                expected: phase,
                actual: self.phase,
            });
        }
        Ok(())
    }

    /// Hot proxies rebind constantly; keep their chatter down after the first few passes.
    fn should_log_rebinding(&self) -> bool {
        if !self.mode.is_hot_proxy() {
            return true;
        }
        let count = self.manager.read_only_count.load(Ordering::SeqCst);
        count < 5 || count % 1000 == 0
    }

    fn log_context(&self) -> LogContext<'a> {
        let context = LogContext::new()
            .with_node(self.management().node_id())
            .with_mode(self.mode.as_str())
            .with_phase(self.phase);
        if self.mode.is_hot_proxy() {
            context.with_iteration(self.manager.read_only_count.load(Ordering::SeqCst))
        } else {
            context
        }
    }

    fn log_rebinding(&self, message: &str) {
        let level = if self.should_log_rebinding() {
            LoggingLevel::Debug
        } else {
            LoggingLevel::Trace
        };
        log_at(level, &self.log_context(), message);
    }

    fn load_manifest_files(&mut self) -> Result<(RawMementoData, MementoManifest), RebindError> {
        self.check_entering_phase(1)?;
        let description = self.store.backing_store_description();
        self.log_rebinding(&format!("rebinding from {description}"));

        let raw = self.store.load_raw_data(self.store_handler())?;
        let manifest = self.store.load_manifest(&raw, self.store_handler())?;

        self.check_continuing_phase(1)?;
        self.is_empty = manifest.is_empty();
        self.overwriting_master = false;

        if !self.mode.is_hot_proxy() {
            let management = self.management();
            if self.is_empty {
                info!(node = management.node_id(), store = %description, "no existing state; new items will be persisted to the store");
            } else {
                info!(node = management.node_id(), mode = %self.mode, store = %description, "rebinding from store");
            }
            if management.entities().has_primary_objects() || management.locations().has_primary_objects() {
                self.overwriting_master = true;
                warn!(
                    node = management.node_id(),
                    mode = %self.mode,
                    entities = management.entities().len(),
                    locations = management.locations().len(),
                    "rebind requested while live state is already active; it will likely be overwritten"
                );
            }
        }
        Ok((raw, manifest))
    }

    fn rebuild_catalog(&mut self, manifest: &MementoManifest) -> Result<(), RebindError> {
        self.check_entering_phase(2)?;
        let kind = ObjectKind::CatalogItem;
        if !self.enabled(kind) {
            self.log_rebinding(&format!(
                "not rebinding catalog; feature disabled: {:?}",
                manifest.catalog_item_ids()
            ));
            return Ok(());
        }

        let instantiator = self.instantiator();
        self.log_rebinding(&format!(
            "instantiating catalog items: {:?}",
            manifest.catalog_item_ids()
        ));
        for memento in manifest.catalog_items.values() {
            match instantiator.new_catalog_item(memento) {
                Ok(item) => self.scratch.register(item),
                Err(err) => self
                    .handler
                    .on_create_failed(kind, &memento.id, &memento.type_name, &err)?,
            }
        }

        self.log_rebinding("reconstructing catalog items");
        for memento in manifest.catalog_items.values() {
            let Some(object) = self.scratch.get(kind, &memento.id) else {
                self.handler.on_not_found(kind, &memento.id)?;
                continue;
            };
            if let Some(item) = object.as_catalog_item() {
                if let Err(err) = item.reconstruct(memento) {
                    self.handler.on_rebind_failed(kind, object, &err)?;
                }
            }
        }

        let load_mode = self.manager.settings.catalog_load_mode;
        let catalog = self.management().catalog();
        if load_mode.should_reset_to_persisted(self.is_empty) {
            self.log_rebinding("resetting catalog to persisted state");
            catalog.reset(self.scratch.catalog_items());
        } else if load_mode.should_load_default(self.is_empty) {
            self.log_rebinding("loading default catalog");
            let loaded = catalog
                .reset_to_default()
                .map_err(|err| RebindError::DefaultCatalog(format!("{err:#}")))?;
            debug!(items = loaded, "default catalog loaded");
        } else {
            let persisted = self.scratch.count(kind);
            if persisted > 0 && self.should_log_rebinding() {
                info!(?load_mode, persisted, "not resetting catalog to persisted state");
            } else {
                self.log_rebinding(&format!(
                    "not resetting catalog to persisted state; load mode is {load_mode:?}"
                ));
            }
        }
        Ok(())
    }

    fn instantiate_locations_and_entities(&mut self, manifest: &MementoManifest) -> Result<(), RebindError> {
        self.check_entering_phase(3)?;
        let instantiator = self.instantiator();

        self.log_rebinding(&format!(
            "instantiating locations: {:?}",
            manifest.location_types.keys().collect::<Vec<_>>()
        ));
        for (id, type_name) in &manifest.location_types {
            trace!(location = %id, "instantiating location");
            match instantiator.new_location(&self.scratch, id, type_name) {
                Ok(location) => self.scratch.register(location),
                Err(err) => self
                    .handler
                    .on_create_failed(ObjectKind::Location, id, type_name, &err)?,
            }
        }

        self.log_rebinding(&format!(
            "instantiating entities: {:?}",
            manifest.entities.keys().collect::<Vec<_>>()
        ));
        let management = self.management();
        let resolver = CatalogProvenanceResolver::new(
            management.catalog(),
            management.types(),
            self.manager.settings.infer_catalog_item_on_rebind,
        );
        for entity in manifest.entities.values() {
            trace!(entity = %entity.id, "instantiating entity");
            let catalog_item_id = resolver.resolve(&manifest.entities, entity);
            match instantiator.new_entity(
                &self.scratch,
                &entity.id,
                &entity.type_name,
                catalog_item_id.as_deref(),
            ) {
                Ok(shell) => self.scratch.register(shell),
                Err(err) => self.handler.on_create_failed(
                    ObjectKind::Entity,
                    &entity.id,
                    &entity.type_name,
                    &err,
                )?,
            }
        }
        Ok(())
    }

    fn load_mementos(&mut self, raw: &RawMementoData) -> Result<FullMemento, RebindError> {
        self.check_entering_phase(4)?;
        let lookup = RebindContext::new(&self.scratch, self.management());
        let full = self
            .store
            .load_full_mementos(raw, &lookup, self.store_handler())?;
        Ok(full)
    }

    fn instantiate_adjuncts(&mut self, full: &FullMemento) -> Result<(), RebindError> {
        self.check_entering_phase(5)?;
        let instantiator = self.instantiator();
        for kind in ADJUNCT_KINDS {
            let Some(mementos) = full.of_kind(kind) else {
                continue;
            };
            if !self.enabled(kind) {
                self.log_rebinding(&format!(
                    "not rebinding {}; feature disabled: {:?}",
                    kind.directory(),
                    mementos.keys().collect::<Vec<_>>()
                ));
                continue;
            }
            self.log_rebinding(&format!(
                "instantiating {}: {:?}",
                kind.directory(),
                mementos.keys().collect::<Vec<_>>()
            ));
            for memento in mementos.values() {
                match instantiator.new_adjunct(&self.scratch, kind, memento) {
                    Ok(adjunct) => self.scratch.register(adjunct),
                    Err(err) => self
                        .handler
                        .on_create_failed(kind, &memento.id, &memento.type_name, &err)?,
                }
            }
        }
        Ok(())
    }

    fn reconstruct_everything(&mut self, full: &FullMemento) -> Result<(), RebindError> {
        self.check_entering_phase(6)?;

        self.log_rebinding("reconstructing locations");
        for memento in sort_parent_first(&full.locations) {
            self.reconstruct_one(ObjectKind::Location, memento)?;
        }

        for kind in ADJUNCT_KINDS {
            if !self.enabled(kind) {
                continue;
            }
            let Some(mementos) = full.of_kind(kind) else {
                continue;
            };
            self.log_rebinding(&format!("reconstructing {}", kind.directory()));
            for memento in mementos.values() {
                self.reconstruct_one(kind, memento)?;
            }
        }

        self.log_rebinding("reconstructing entities");
        for memento in sort_parent_first(&full.entities) {
            self.reconstruct_one(ObjectKind::Entity, memento)?;
        }
        Ok(())
    }

    /// Adjuncts that fail to reconstruct are dropped from the pass; locations
    /// and entities stay so that dependents can still resolve them.
    fn reconstruct_one(&mut self, kind: ObjectKind, memento: &Memento) -> Result<(), RebindError> {
        let Some(object) = self.scratch.get(kind, &memento.id).cloned() else {
            return self.handler.on_not_found(kind, &memento.id);
        };
        trace!(%kind, id = %memento.id, "reconstructing");
        let context = RebindContext::new(&self.scratch, self.management());
        if let Err(err) = object.reconstruct(&context, memento) {
            self.handler.on_rebind_failed(kind, &object, &err)?;
            if kind.is_adjunct() {
                self.scratch.unregister(kind, &memento.id);
            }
        }
        Ok(())
    }

    fn associate_adjuncts_with_entities(&mut self, full: &FullMemento) -> Result<(), RebindError> {
        self.check_entering_phase(7)?;
        self.log_rebinding("associating adjuncts with entities");
        for memento in sort_parent_first(&full.entities) {
            let Some(entity) = self.scratch.entity(&memento.id) else {
                self.handler.on_not_found(ObjectKind::Entity, &memento.id)?;
                continue;
            };
            for kind in ADJUNCT_KINDS {
                if !self.enabled(kind) {
                    continue;
                }
                for adjunct_id in memento.adjunct_ids(kind) {
                    match self.scratch.adjunct(kind, adjunct_id) {
                        Some(adjunct) => {
                            if let Err(err) = entity.add_adjunct(kind, adjunct) {
                                self.handler.on_rebind_failed(
                                    ObjectKind::Entity,
                                    &LiveObject::Entity(entity.clone()),
                                    &err,
                                )?;
                            }
                        }
                        None => {
                            debug!(entity = %memento.id, %kind, id = %adjunct_id, "adjunct not available; discarding reference");
                            self.handler.on_dangling_reference(kind, adjunct_id)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn manage_the_objects(&mut self, full: &FullMemento) -> Result<Vec<Arc<dyn Entity>>, RebindError> {
        self.check_entering_phase(8)?;
        let management = self.management();
        let transitions = &self.manager.transitions;

        self.log_rebinding("managing locations");
        let registry = management.locations();
        let mut old_locations: IndexSet<String> = registry.ids().into_iter().collect();
        let locations = self.scratch.locations();
        for location in &locations {
            let id = location.id();
            let previous = registry.last_transition_mode(&id);
            let mode = transitions.compute(
                ObjectKind::Location,
                &id,
                previous,
                self.scratch.is_read_only(ObjectKind::Location, &id),
            );
            registry.set_transition_mode(&id, mode);
            if previous.is_some() {
                old_locations.shift_remove(&id);
            }
        }
        let declared = declared_children(
            locations
                .iter()
                .map(|location| (location.id(), location.parent_id())),
        );
        let roots = locations.iter().filter(|location| {
            location
                .parent_id()
                .and_then(|parent| self.scratch.location(&parent))
                .is_none()
        });
        for location in roots {
            let managed = registry.manage_rebinded_root(location, |parent| {
                children_of(parent, &declared, |id| self.scratch.location(id))
            });
            if let Err(err) = managed {
                self.handler.on_manage_failed(
                    ObjectKind::Location,
                    &LiveObject::Location(location.clone()),
                    &err,
                )?;
            }
        }
        self.destroy_unused("locations", &old_locations, |id| {
            registry.unmanage(id, ManagementTransitionMode::RebindingDestroyed).is_some()
        });

        self.log_rebinding("managing entities");
        let registry = management.entities();
        let mut old_entities: IndexSet<String> = registry.ids().into_iter().collect();
        for entity in self.scratch.entities() {
            let id = entity.id();
            let previous = registry.last_transition_mode(&id);
            let mode = transitions.compute(
                ObjectKind::Entity,
                &id,
                previous,
                self.scratch.is_read_only(ObjectKind::Entity, &id),
            );
            registry.set_transition_mode(&id, mode);
            if previous.is_some() {
                old_entities.shift_remove(&id);
            }
        }
        let entities = self.scratch.entities();
        let declared = declared_children(entities.iter().map(|entity| (entity.id(), entity.parent_id())));
        let app_ids = full.application_ids();
        let mut applications = Vec::new();
        for app_id in &app_ids {
            let Some(entity) = self.scratch.entity(app_id) else {
                self.handler.on_not_found(ObjectKind::Entity, app_id)?;
                continue;
            };
            let managed = registry.manage_rebinded_root(&entity, |parent| {
                children_of(parent, &declared, |id| self.scratch.entity(id))
            });
            match managed {
                Ok(managed) => {
                    trace!(application = %app_id, managed, "application managed");
                    applications.push(entity);
                }
                Err(err) => self.handler.on_manage_failed(
                    ObjectKind::Entity,
                    &LiveObject::Entity(entity.clone()),
                    &err,
                )?,
            }
        }
        // Entities whose parent did not survive the pass are managed as their own roots.
        let orphans = entities.iter().filter(|entity| {
            !app_ids.contains(&entity.id())
                && entity
                    .parent_id()
                    .and_then(|parent| self.scratch.entity(&parent))
                    .is_none()
        });
        for entity in orphans {
            debug!(entity = %entity.id(), "managing entity whose parent is gone");
            let managed = registry.manage_rebinded_root(entity, |parent| {
                children_of(parent, &declared, |id| self.scratch.entity(id))
            });
            if let Err(err) = managed {
                self.handler.on_manage_failed(
                    ObjectKind::Entity,
                    &LiveObject::Entity(entity.clone()),
                    &err,
                )?;
            }
        }
        self.destroy_unused("entities", &old_entities, |id| {
            registry.unmanage(id, ManagementTransitionMode::RebindingDestroyed).is_some()
        });

        let unreached =
            management.locations().clear_pending_modes() + management.entities().clear_pending_modes();
        if unreached > 0 {
            debug!(unreached, "objects not reachable from any root were left unmanaged");
        }
        let cleared = management.clear_pre_managed();
        trace!(cleared, "pre-managed shells released");
        Ok(applications)
    }

    fn destroy_unused(&self, what: &str, ids: &IndexSet<String>, mut unmanage: impl FnMut(&str) -> bool) {
        if ids.is_empty() {
            return;
        }
        let level = if self.overwriting_master {
            LoggingLevel::Warn
        } else {
            LoggingLevel::Debug
        };
        log_at(
            level,
            &self.log_context(),
            &format!("destroying unused {what} on rebind: {ids:?}"),
        );
        for id in ids {
            if !unmanage(id) {
                debug!(%id, "already unmanaged");
            }
        }
    }

    fn finishing_up(&mut self, full: &FullMemento, applications: &[Arc<dyn Entity>]) -> Result<(), RebindError> {
        self.check_continuing_phase(FINAL_PHASE)?;
        if !self.is_empty {
            let summary = RebindSummary::collect(&self.scratch, applications.len());
            let context = self.log_context();
            let elapsed = self.timer.map(|timer| timer.elapsed());
            let message = summary.describe(self.mode, context.iteration, elapsed);
            let level = if self.should_log_rebinding() {
                LoggingLevel::Info
            } else {
                LoggingLevel::Debug
            };
            log_at(level, &context, &message);
        }
        self.log_rebinding(&format!(
            "rebind complete; apps: {:?}",
            full.application_ids()
        ));
        Ok(())
    }

    fn note_errors(&self, primary: Option<&RebindError>) {
        let errors = self.handler.errors();
        let warnings = self.handler.warnings();
        if primary.is_none() && errors.is_empty() && warnings.is_empty() {
            return;
        }
        let messages = primary
            .map(ToString::to_string)
            .into_iter()
            .chain(errors)
            .chain(warnings)
            .collect();
        self.manager.metrics.note_error(messages);
    }
}

/// Child ids keyed by the parent each object declares.
fn declared_children(
    objects: impl Iterator<Item = (String, Option<String>)>,
) -> IndexMap<String, Vec<String>> {
    let mut declared: IndexMap<String, Vec<String>> = IndexMap::new();
    for (id, parent) in objects {
        if let Some(parent) = parent {
            declared.entry(parent).or_default().push(id);
        }
    }
    declared
}

/// Children a parent lists itself, followed by those that only name it as their parent.
fn children_of<T: ?Sized + ManagedObject>(
    parent: &T,
    declared: &IndexMap<String, Vec<String>>,
    resolve: impl Fn(&str) -> Option<Arc<T>>,
) -> Vec<Arc<T>> {
    let parent_id = parent.id();
    let mut ids = parent.child_ids();
    for id in declared.get(&parent_id).into_iter().flatten() {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids.iter()
        .filter_map(|id| {
            let child = resolve(id);
            if child.is_none() {
                debug!(parent = %parent_id, child = %id, "child not available to manage");
            }
            child
        })
        .collect()
}

/// Counts reported when a pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RebindSummary {
    pub applications: usize,
    pub entities: usize,
    pub locations: usize,
    pub policies: usize,
    pub enrichers: usize,
    pub feeds: usize,
    pub catalog_items: usize,
}

impl RebindSummary {
    pub fn collect(scratch: &RebindScratchContext, applications: usize) -> Self {
        Self {
            applications,
            entities: scratch.count(ObjectKind::Entity),
            locations: scratch.count(ObjectKind::Location),
            policies: scratch.count(ObjectKind::Policy),
            enrichers: scratch.count(ObjectKind::Enricher),
            feeds: scratch.count(ObjectKind::Feed),
            catalog_items: scratch.count(ObjectKind::CatalogItem),
        }
    }

    fn describe(&self, mode: ManagementMode, iteration: Option<i64>, elapsed: Option<Duration>) -> String {
        let iteration = iteration
            .map(|count| format!(", iteration {count}"))
            .unwrap_or_default();
        let elapsed = elapsed
            .map(|elapsed| format!(" in {elapsed:?}"))
            .unwrap_or_default();
        format!(
            "rebind complete ({mode}{iteration}){elapsed}: {} app(s), {} entit(ies), {} location(s), {} polic(ies), {} enricher(s), {} feed(s), {} catalog item(s)",
            self.applications,
            self.entities,
            self.locations,
            self.policies,
            self.enrichers,
            self.feeds,
            self.catalog_items
        )
    }
}
