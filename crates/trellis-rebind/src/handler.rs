//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Per-object failure reporting for a rebind pass.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::{debug, warn};
use trellis_common::FailureMode;
use trellis_persistence::{ObjectKind, PersistenceError, PersistenceExceptionHandler};

use crate::context::RebindContext;
use crate::error::{ObjectError, RebindError};
use crate::object::LiveObject;

/// Receives every per-object failure of a pass and decides whether it continues.
///
/// Returning `Err` from a notification aborts the pass with that error.
pub trait RebindExceptionHandler: PersistenceExceptionHandler {
    fn on_start(&self, context: &RebindContext<'_>);

    fn on_create_failed(
        &self,
        kind: ObjectKind,
        id: &str,
        type_name: &str,
        error: &ObjectError,
    ) -> Result<(), RebindError>;

    fn on_not_found(&self, kind: ObjectKind, id: &str) -> Result<(), RebindError>;

    fn on_rebind_failed(
        &self,
        kind: ObjectKind,
        object: &LiveObject,
        error: &ObjectError,
    ) -> Result<(), RebindError>;

    fn on_manage_failed(
        &self,
        kind: ObjectKind,
        object: &LiveObject,
        error: &ObjectError,
    ) -> Result<(), RebindError>;

    /// End of a pass that reached its last phase.
    fn on_done(&self) -> Result<(), RebindError>;

    /// Turn the error that aborted a pass into the one raised to the caller.
    fn on_failed(&self, error: RebindError) -> RebindError;

    fn errors(&self) -> Vec<String>;

    fn warnings(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
struct HandlerState {
    errors: Vec<String>,
    warnings: Vec<String>,
    dangling_errors: usize,
    create_failed: HashSet<(ObjectKind, String)>,
}

/// Handler driven by two [`FailureMode`]s: one for object failures, one
/// for dangling references.
#[derive(Debug)]
pub struct DefaultExceptionHandler {
    failure_mode: FailureMode,
    dangling_mode: FailureMode,
    state: Mutex<HandlerState>,
}

impl DefaultExceptionHandler {
    pub fn new(failure_mode: FailureMode, dangling_mode: FailureMode) -> Self {
        Self {
            failure_mode,
            dangling_mode,
            state: Mutex::new(HandlerState::default()),
        }
    }

    fn record(&self, kind: ObjectKind, id: &str, error: ObjectError) -> Result<(), RebindError> {
        let message = format!("{kind} {id}: {error}");
        warn!(%kind, id, error = %error, "rebind problem");
        self.state.lock().errors.push(message);
        match self.failure_mode {
            FailureMode::FailFast => Err(RebindError::Object {
                kind,
                id: id.to_owned(),
                source: error,
            }),
            FailureMode::FailAtEnd | FailureMode::Continue => Ok(()),
        }
    }
}

impl Default for DefaultExceptionHandler {
    fn default() -> Self {
        Self::new(FailureMode::default(), FailureMode::Continue)
    }
}

impl PersistenceExceptionHandler for DefaultExceptionHandler {
    fn on_load_memento_failed(
        &self,
        kind: ObjectKind,
        message: &str,
        error: &PersistenceError,
    ) -> trellis_persistence::Result<()> {
        let message = format!("problem loading {message}: {error}");
        warn!(%kind, "{}", message);
        self.state.lock().errors.push(message.clone());
        match self.failure_mode {
            FailureMode::FailFast => Err(PersistenceError::Rejected(message)),
            _ => Ok(()),
        }
    }

    fn on_dangling_reference(&self, kind: ObjectKind, id: &str) -> trellis_persistence::Result<()> {
        let message = format!("no {kind} found with id {id}");
        match self.dangling_mode {
            FailureMode::FailFast => {
                self.state.lock().errors.push(message.clone());
                Err(PersistenceError::Rejected(message))
            }
            FailureMode::FailAtEnd => {
                warn!(%kind, id, "dangling reference");
                let mut state = self.state.lock();
                state.errors.push(message);
                state.dangling_errors += 1;
                Ok(())
            }
            FailureMode::Continue => {
                warn!(%kind, id, "dangling reference; continuing");
                self.state.lock().warnings.push(message);
                Ok(())
            }
        }
    }
}

impl RebindExceptionHandler for DefaultExceptionHandler {
    fn on_start(&self, context: &RebindContext<'_>) {
        debug!(read_only = context.is_read_only(), "rebind exception handler started");
        *self.state.lock() = HandlerState::default();
    }

    fn on_create_failed(
        &self,
        kind: ObjectKind,
        id: &str,
        type_name: &str,
        error: &ObjectError,
    ) -> Result<(), RebindError> {
        self.state.lock().create_failed.insert((kind, id.to_owned()));
        self.record(
            kind,
            id,
            ObjectError::Construct(format!("could not create {type_name}: {error}")),
        )
    }

    fn on_not_found(&self, kind: ObjectKind, id: &str) -> Result<(), RebindError> {
        if self.state.lock().create_failed.contains(&(kind, id.to_owned())) {
            debug!(%kind, id, "not found after failed creation; already reported");
            return Ok(());
        }
        self.record(
            kind,
            id,
            ObjectError::Reconstruct(format!("no {kind} found with id {id}")),
        )
    }

    fn on_rebind_failed(
        &self,
        kind: ObjectKind,
        object: &LiveObject,
        error: &ObjectError,
    ) -> Result<(), RebindError> {
        self.record(kind, &object.id(), error.clone())
    }

    fn on_manage_failed(
        &self,
        kind: ObjectKind,
        object: &LiveObject,
        error: &ObjectError,
    ) -> Result<(), RebindError> {
        self.record(kind, &object.id(), error.clone())
    }

    fn on_done(&self) -> Result<(), RebindError> {
        let state = self.state.lock();
        if !state.warnings.is_empty() {
            warn!(warnings = state.warnings.len(), "rebind completed with warnings");
        }
        let object_errors = state.errors.len() - state.dangling_errors;
        let fail = (self.failure_mode == FailureMode::FailAtEnd && object_errors > 0)
            || (self.dangling_mode == FailureMode::FailAtEnd && state.dangling_errors > 0);
        if fail {
            return Err(RebindError::Failed {
                message: format!("rebind failed with {} error(s)", state.errors.len()),
                errors: state.errors.clone(),
                warnings: state.warnings.clone(),
            });
        }
        Ok(())
    }

    fn on_failed(&self, error: RebindError) -> RebindError {
        if error.is_internal() || matches!(error, RebindError::Failed { .. }) {
            return error;
        }
        let state = self.state.lock();
        RebindError::Failed {
            message: format!("rebind failed: {error}"),
            errors: state.errors.clone(),
            warnings: state.warnings.clone(),
        }
    }

    fn errors(&self) -> Vec<String> {
        self.state.lock().errors.clone()
    }

    fn warnings(&self) -> Vec<String> {
        self.state.lock().warnings.clone()
    }
}
