//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use crate::access::{PersistenceExceptionHandler, PersistenceStoreAccess};
use crate::kind::ObjectKind;
use crate::raw::RawMementoData;
use crate::{PersistenceError, Result};

/// Store held entirely in memory; used by tests and embedded nodes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    name: String,
    data: RwLock<RawMementoData>,
    writable: AtomicBool,
}

impl InMemoryStore {
    /// Empty, read-only store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Store preloaded with `data`.
    pub fn with_data(name: impl Into<String>, data: RawMementoData) -> Self {
        Self {
            name: name.into(),
            data: RwLock::new(data),
            writable: AtomicBool::new(false),
        }
    }

    /// Seed a payload regardless of the write gate.
    pub fn seed(&self, kind: ObjectKind, id: impl Into<String>, payload: impl Into<String>) {
        self.data.write().put(kind, id, payload);
    }

    /// Serialize and store `value`; rejected until writes are enabled.
    pub fn persist<T: Serialize>(&self, kind: ObjectKind, id: &str, value: &T) -> Result<()> {
        if !self.is_writable() {
            return Err(PersistenceError::ReadOnly(self.name.clone()));
        }
        let payload = serde_json::to_string(value)?;
        self.data.write().put(kind, id, payload);
        Ok(())
    }

    /// Remove `id`; rejected until writes are enabled.
    pub fn delete(&self, kind: ObjectKind, id: &str) -> Result<bool> {
        if !self.is_writable() {
            return Err(PersistenceError::ReadOnly(self.name.clone()));
        }
        Ok(self.data.write().remove(kind, id).is_some())
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> RawMementoData {
        self.data.read().clone()
    }
}

impl PersistenceStoreAccess for InMemoryStore {
    fn backing_store_description(&self) -> String {
        format!("in-memory store {}", self.name)
    }

    fn load_raw_data(&self, _handler: &dyn PersistenceExceptionHandler) -> Result<RawMementoData> {
        Ok(self.snapshot())
    }

    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memento::Memento;

    #[test]
    fn writes_wait_for_the_gate() {
        let store = InMemoryStore::new("unit");
        let memento = Memento::new("e1", "basic.Entity");

        let err = store.persist(ObjectKind::Entity, "e1", &memento).unwrap_err();
        assert!(matches!(err, PersistenceError::ReadOnly(_)));

        store.set_writable(true);
        store.persist(ObjectKind::Entity, "e1", &memento).unwrap();
        assert_eq!(store.snapshot().objects(ObjectKind::Entity).len(), 1);
        assert!(store.delete(ObjectKind::Entity, "e1").unwrap());
        assert!(store.snapshot().is_empty());
    }
}
