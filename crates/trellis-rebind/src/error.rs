//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use trellis_persistence::{ObjectKind, PersistenceError};

/// Failure of a single object; reported to the exception handler, never fatal by itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    #[error("type {type_name} cannot be loaded{}", context_suffix(.context))]
    TypeNotFound {
        type_name: String,
        context: Option<String>,
    },
    #[error("catalog item {0} required for rebinding is not available")]
    CatalogItemNotFound(String),
    #[error("{kind} type {type_name} has no usable constructor")]
    NoConstructor { kind: ObjectKind, type_name: String },
    #[error("type {type_name} is a {actual}, not a {expected}")]
    KindMismatch {
        type_name: String,
        expected: ObjectKind,
        actual: ObjectKind,
    },
    #[error("construction failed: {0}")]
    Construct(String),
    #[error("reconstruction failed: {0}")]
    Reconstruct(String),
    #[error("management failed: {0}")]
    Manage(String),
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" via {context}"),
        None => String::new(),
    }
}

/// Error that aborts a rebind pass.
#[derive(Debug, thiserror::Error)]
pub enum RebindError {
    #[error("rebind iteration has already run; create a new instance for another pass")]
    AlreadyRun,
    #[error("phase mismatch: should be phase {expected} but is currently {actual}")]
    PhaseMismatch { expected: u8, actual: u8 },
    #[error("store access failed: {0}")]
    Store(#[from] PersistenceError),
    #[error("{kind} {id}: {source}")]
    Object {
        kind: ObjectKind,
        id: String,
        #[source]
        source: ObjectError,
    },
    #[error("default catalog could not be loaded: {0}")]
    DefaultCatalog(String),
    #[error("{message}")]
    Failed {
        message: String,
        errors: Vec<String>,
        warnings: Vec<String>,
    },
}

impl RebindError {
    /// Internal-logic faults bypass the per-object handler and are raised as is.
    pub fn is_internal(&self) -> bool {
        matches!(self, RebindError::AlreadyRun | RebindError::PhaseMismatch { .. })
    }
}
