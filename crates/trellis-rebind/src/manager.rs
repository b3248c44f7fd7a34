//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};
use trellis_common::{AppConfig, CatalogLoadMode, FailureMode, ManagementMode, PersistenceFeatures};
use trellis_metrics::RebindMetrics;
use trellis_persistence::PersistenceStoreAccess;

use crate::catalog::FileCatalogSource;
use crate::error::RebindError;
use crate::handler::{DefaultExceptionHandler, RebindExceptionHandler};
use crate::iteration::RebindIteration;
use crate::management::ManagementContext;
use crate::object::Entity;
use crate::transition::{DefaultTransitionModes, TransitionModeStrategy};

/// Knobs a rebind pass reads; normally taken from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebindSettings {
    pub features: PersistenceFeatures,
    pub infer_catalog_item_on_rebind: bool,
    pub catalog_load_mode: CatalogLoadMode,
    pub failure_mode: FailureMode,
    pub dangling_ref_failure_mode: FailureMode,
}

impl Default for RebindSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RebindSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            features: config.persistence.features,
            infer_catalog_item_on_rebind: config.persistence.infer_catalog_item_on_rebind,
            catalog_load_mode: config.catalog.load_mode,
            failure_mode: config.rebind.failure_mode,
            dangling_ref_failure_mode: config.rebind.dangling_ref_failure_mode,
        }
    }
}

/// Runs rebind passes against one live manager, one at a time.
pub struct RebindManager {
    pub(crate) management: Arc<ManagementContext>,
    pub(crate) settings: RebindSettings,
    pub(crate) transitions: Arc<dyn TransitionModeStrategy>,
    pub(crate) metrics: RebindMetrics,
    permit: Mutex<()>,
    waiting: AtomicUsize,
    pub(crate) read_only_count: AtomicI64,
}

impl RebindManager {
    pub fn new(management: Arc<ManagementContext>, settings: RebindSettings, metrics: RebindMetrics) -> Self {
        let transitions = Arc::new(DefaultTransitionModes::new(management.node_id()));
        Self {
            management,
            settings,
            transitions,
            metrics,
            permit: Mutex::new(()),
            waiting: AtomicUsize::new(0),
            read_only_count: AtomicI64::new(0),
        }
    }

    /// Manager configured from `config`, including its default catalog source.
    pub fn from_config(management: Arc<ManagementContext>, config: &AppConfig, metrics: RebindMetrics) -> Self {
        if let Some(path) = &config.catalog.default_source {
            debug!(path = %path.display(), "using default catalog file");
            management
                .catalog()
                .set_default_source(Arc::new(FileCatalogSource::new(path.clone())));
        }
        Self::new(management, RebindSettings::from(config), metrics)
    }

    pub fn with_transition_strategy(mut self, transitions: Arc<dyn TransitionModeStrategy>) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn management(&self) -> &Arc<ManagementContext> {
        &self.management
    }

    pub fn settings(&self) -> &RebindSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &RebindMetrics {
        &self.metrics
    }

    /// Consecutive hot-proxy passes, including one in progress.
    pub fn read_only_rebind_count(&self) -> i64 {
        self.read_only_count.load(Ordering::SeqCst)
    }

    /// Passes blocked behind the one currently holding the permit.
    pub fn waiting_passes(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Blocks until no other pass is running.
    pub(crate) fn acquire_permit(&self) -> MutexGuard<'_, ()> {
        if let Some(permit) = self.permit.try_lock() {
            return permit;
        }
        self.waiting.fetch_add(1, Ordering::SeqCst);
        debug!(node = self.management.node_id(), "waiting for the running rebind pass");
        let permit = self.permit.lock();
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        permit
    }

    /// Handler built from the configured failure modes.
    pub fn default_handler(&self) -> DefaultExceptionHandler {
        DefaultExceptionHandler::new(
            self.settings.failure_mode,
            self.settings.dangling_ref_failure_mode,
        )
    }

    pub fn new_iteration<'a, H: RebindExceptionHandler>(
        &'a self,
        store: &'a dyn PersistenceStoreAccess,
        handler: &'a H,
        mode: ManagementMode,
    ) -> RebindIteration<'a, H> {
        RebindIteration::new(self, store, handler, mode)
    }

    /// One pass with the default handler.
    pub fn rebind(
        &self,
        store: &dyn PersistenceStoreAccess,
        mode: ManagementMode,
    ) -> Result<Vec<Arc<dyn Entity>>, RebindError> {
        let handler = self.default_handler();
        self.rebind_with_handler(store, &handler, mode)
    }

    /// One pass; afterwards the store is writable only if a master pass succeeded.
    pub fn rebind_with_handler<H: RebindExceptionHandler>(
        &self,
        store: &dyn PersistenceStoreAccess,
        handler: &H,
        mode: ManagementMode,
    ) -> Result<Vec<Arc<dyn Entity>>, RebindError> {
        if !mode.is_hot_proxy() {
            self.read_only_count.store(0, Ordering::SeqCst);
        }
        let result = self.new_iteration(store, handler, mode).run();
        let writable = result.is_ok() && mode.may_write_store();
        store.set_writable(writable);
        match &result {
            Ok(applications) => info!(
                node = self.management.node_id(),
                %mode,
                applications = applications.len(),
                writable,
                "rebind finished"
            ),
            Err(err) => debug!(node = self.management.node_id(), %mode, error = %err, "rebind did not complete"),
        }
        result
    }
}

impl std::fmt::Debug for RebindManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebindManager")
            .field("node", &self.management.node_id())
            .field("settings", &self.settings)
            .field("read_only_count", &self.read_only_rebind_count())
            .finish_non_exhaustive()
    }
}
