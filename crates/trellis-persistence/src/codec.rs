//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Decoding of raw payloads into manifests and full mementos.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::trace;

use crate::access::{LookupContext, PersistenceExceptionHandler};
use crate::kind::ObjectKind;
use crate::manifest::{EntityManifest, MementoManifest};
use crate::memento::{CatalogItemMemento, FullMemento, Memento};
use crate::raw::RawMementoData;
use crate::{PersistenceError, Result};

#[derive(Debug, Deserialize)]
struct LocationProbe {
    id: String,
    #[serde(rename = "type")]
    type_name: String,
}

trait Identified {
    fn declared_id(&self) -> &str;
}

impl Identified for EntityManifest {
    fn declared_id(&self) -> &str {
        &self.id
    }
}

impl Identified for LocationProbe {
    fn declared_id(&self) -> &str {
        &self.id
    }
}

impl Identified for Memento {
    fn declared_id(&self) -> &str {
        &self.id
    }
}

impl Identified for CatalogItemMemento {
    fn declared_id(&self) -> &str {
        &self.id
    }
}

/// Decode one payload; `Ok(None)` when the handler chose to skip it.
fn decode_one<T: DeserializeOwned + Identified>(
    kind: ObjectKind,
    id: &str,
    payload: &str,
    handler: &dyn PersistenceExceptionHandler,
) -> Result<Option<T>> {
    let decoded = serde_json::from_str::<T>(payload)
        .map_err(PersistenceError::from)
        .and_then(|value| {
            if value.declared_id() == id {
                Ok(value)
            } else {
                Err(PersistenceError::IdMismatch {
                    kind,
                    stored: id.to_owned(),
                    declared: value.declared_id().to_owned(),
                })
            }
        });
    match decoded {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            handler.on_load_memento_failed(kind, &format!("{kind} {id}"), &err)?;
            Ok(None)
        }
    }
}

/// Read the manifest: entity summaries, location types and catalog items.
pub fn decode_manifest(
    raw: &RawMementoData,
    handler: &dyn PersistenceExceptionHandler,
) -> Result<MementoManifest> {
    let mut manifest = MementoManifest::default();

    for (id, payload) in raw.objects(ObjectKind::Entity) {
        if let Some(entity) = decode_one::<EntityManifest>(ObjectKind::Entity, id, payload, handler)? {
            manifest.entities.insert(id.clone(), entity);
        }
    }
    for (id, payload) in raw.objects(ObjectKind::Location) {
        if let Some(location) =
            decode_one::<LocationProbe>(ObjectKind::Location, id, payload, handler)?
        {
            manifest.location_types.insert(id.clone(), location.type_name);
        }
    }
    for (id, payload) in raw.objects(ObjectKind::CatalogItem) {
        if let Some(item) =
            decode_one::<CatalogItemMemento>(ObjectKind::CatalogItem, id, payload, handler)?
        {
            manifest.catalog_items.insert(id.clone(), item);
        }
    }

    trace!(
        entities = manifest.entities.len(),
        locations = manifest.location_types.len(),
        catalog_items = manifest.catalog_items.len(),
        "decoded memento manifest"
    );
    Ok(manifest)
}

/// Decode every payload and report references `lookup` cannot resolve.
///
/// Entity and location references are checked; adjunct references are
/// resolved later, once adjuncts have been instantiated.
pub fn decode_full(
    raw: &RawMementoData,
    lookup: &dyn LookupContext,
    handler: &dyn PersistenceExceptionHandler,
) -> Result<FullMemento> {
    let mut full = FullMemento::default();

    for kind in ObjectKind::ALL {
        if kind == ObjectKind::CatalogItem {
            continue;
        }
        for (id, payload) in raw.objects(kind) {
            if let Some(memento) = decode_one::<Memento>(kind, id, payload, handler)? {
                if let Some(target) = full.of_kind_mut(kind) {
                    target.insert(id.clone(), memento);
                }
            }
        }
    }
    for (id, payload) in raw.objects(ObjectKind::CatalogItem) {
        if let Some(item) =
            decode_one::<CatalogItemMemento>(ObjectKind::CatalogItem, id, payload, handler)?
        {
            full.catalog_items.insert(id.clone(), item);
        }
    }

    for memento in full.entities.values() {
        check_refs(ObjectKind::Entity, memento.parent.iter(), lookup, handler)?;
        check_refs(ObjectKind::Entity, memento.children.iter(), lookup, handler)?;
        check_refs(ObjectKind::Location, memento.locations.iter(), lookup, handler)?;
        if let Some(item) = &memento.catalog_item_id {
            check_refs(ObjectKind::CatalogItem, std::iter::once(item), lookup, handler)?;
        }
    }
    for memento in full.locations.values() {
        check_refs(ObjectKind::Location, memento.parent.iter(), lookup, handler)?;
        check_refs(ObjectKind::Location, memento.children.iter(), lookup, handler)?;
    }

    Ok(full)
}

fn check_refs<'a>(
    kind: ObjectKind,
    ids: impl Iterator<Item = &'a String>,
    lookup: &dyn LookupContext,
    handler: &dyn PersistenceExceptionHandler,
) -> Result<()> {
    for id in ids {
        if !lookup.contains(kind, id) {
            handler.on_dangling_reference(kind, id)?;
        }
    }
    Ok(())
}
