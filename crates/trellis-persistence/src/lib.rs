//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Persisted representation of the managed object graph.
//!
//! A store hands out [`RawMementoData`] (one serialized payload per object),
//! from which a cheap [`MementoManifest`] is read first and the complete
//! [`FullMemento`] later, once live shells exist to resolve references.

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing persisted objects.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Reported when a stored object fails integrity verification.
    #[error("{kind} {id} failed integrity verification")]
    HashMismatch {
        /// Kind of the corrupted object.
        kind: ObjectKind,
        /// Identifier of the corrupted object.
        id: String,
    },
    /// The store has not been opened for writing.
    #[error("store {0} is read-only")]
    ReadOnly(String),
    /// A payload names an id different from the one it is stored under.
    #[error("{kind} stored as {stored} declares id {declared}")]
    IdMismatch {
        /// Kind of the object.
        kind: ObjectKind,
        /// Identifier the payload was stored under.
        stored: String,
        /// Identifier inside the payload.
        declared: String,
    },
    /// The exception handler refused to continue loading.
    #[error("loading aborted: {0}")]
    Rejected(String),
}

pub mod access;
pub mod codec;
pub mod file_store;
pub mod kind;
pub mod manifest;
pub mod memento;
pub mod memory;
pub mod raw;

pub use access::{LookupContext, PersistenceExceptionHandler, PersistenceStoreAccess};
pub use file_store::FileMementoStore;
pub use kind::ObjectKind;
pub use manifest::{EntityManifest, MementoManifest};
pub use memento::{CatalogItemMemento, FullMemento, Memento, TreeNode};
pub use memory::InMemoryStore;
pub use raw::RawMementoData;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_object() {
        let err = PersistenceError::HashMismatch {
            kind: ObjectKind::Policy,
            id: "p1".into(),
        };
        assert_eq!(format!("{err}"), "policy p1 failed integrity verification");
    }
}
