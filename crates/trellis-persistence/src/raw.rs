//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use indexmap::IndexMap;

use crate::kind::ObjectKind;

/// Serialized payloads exactly as read from a store, one per object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMementoData {
    entities: IndexMap<String, String>,
    locations: IndexMap<String, String>,
    policies: IndexMap<String, String>,
    enrichers: IndexMap<String, String>,
    feeds: IndexMap<String, String>,
    catalog_items: IndexMap<String, String>,
}

impl RawMementoData {
    /// Payloads of one kind, keyed by id.
    pub fn objects(&self, kind: ObjectKind) -> &IndexMap<String, String> {
        match kind {
            ObjectKind::Entity => &self.entities,
            ObjectKind::Location => &self.locations,
            ObjectKind::Policy => &self.policies,
            ObjectKind::Enricher => &self.enrichers,
            ObjectKind::Feed => &self.feeds,
            ObjectKind::CatalogItem => &self.catalog_items,
        }
    }

    fn objects_mut(&mut self, kind: ObjectKind) -> &mut IndexMap<String, String> {
        match kind {
            ObjectKind::Entity => &mut self.entities,
            ObjectKind::Location => &mut self.locations,
            ObjectKind::Policy => &mut self.policies,
            ObjectKind::Enricher => &mut self.enrichers,
            ObjectKind::Feed => &mut self.feeds,
            ObjectKind::CatalogItem => &mut self.catalog_items,
        }
    }

    /// Insert or replace the payload for `id`.
    pub fn put(&mut self, kind: ObjectKind, id: impl Into<String>, payload: impl Into<String>) {
        self.objects_mut(kind).insert(id.into(), payload.into());
    }

    /// Remove the payload for `id`, returning it.
    pub fn remove(&mut self, kind: ObjectKind, id: &str) -> Option<String> {
        self.objects_mut(kind).shift_remove(id)
    }

    /// Total number of payloads across all kinds.
    pub fn len(&self) -> usize {
        ObjectKind::ALL
            .iter()
            .map(|kind| self.objects(*kind).len())
            .sum()
    }

    /// True when no payload of any kind is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
