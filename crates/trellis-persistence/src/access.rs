//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use crate::codec;
use crate::kind::ObjectKind;
use crate::manifest::MementoManifest;
use crate::memento::FullMemento;
use crate::raw::RawMementoData;
use crate::{PersistenceError, Result};

/// Receives problems found while reading a store.
///
/// Returning an error stops the load; returning `Ok` skips the offending
/// object and carries on.
pub trait PersistenceExceptionHandler: Send + Sync {
    /// A payload could not be read or parsed.
    fn on_load_memento_failed(
        &self,
        kind: ObjectKind,
        message: &str,
        error: &PersistenceError,
    ) -> Result<()>;

    /// A memento refers to an object that the lookup context cannot resolve.
    fn on_dangling_reference(&self, kind: ObjectKind, id: &str) -> Result<()>;
}

/// Resolves ids against objects that already exist while mementos are read.
pub trait LookupContext {
    /// True when an object of `kind` with `id` is known.
    fn contains(&self, kind: ObjectKind, id: &str) -> bool;
}

/// Read access to a persisted management plane.
///
/// Only [`PersistenceStoreAccess::load_raw_data`] touches the medium; the
/// manifest and full mementos are decoded from the raw payloads.
pub trait PersistenceStoreAccess: Send + Sync {
    /// Human readable description of the medium, for logs.
    fn backing_store_description(&self) -> String;

    /// Read every payload from the medium.
    fn load_raw_data(&self, handler: &dyn PersistenceExceptionHandler) -> Result<RawMementoData>;

    /// Read ids, types, parents and catalog items from `raw`.
    fn load_manifest(
        &self,
        raw: &RawMementoData,
        handler: &dyn PersistenceExceptionHandler,
    ) -> Result<MementoManifest> {
        codec::decode_manifest(raw, handler)
    }

    /// Decode complete per-object state, checking references against `lookup`.
    fn load_full_mementos(
        &self,
        raw: &RawMementoData,
        lookup: &dyn LookupContext,
        handler: &dyn PersistenceExceptionHandler,
    ) -> Result<FullMemento> {
        codec::decode_full(raw, lookup, handler)
    }

    /// Whether writes to the medium are currently accepted.
    fn is_writable(&self) -> bool;

    /// Open or close the medium for writes.
    fn set_writable(&self, writable: bool);
}
