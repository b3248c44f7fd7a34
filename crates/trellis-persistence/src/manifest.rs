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
use serde::Deserialize;

use crate::memento::{CatalogItemMemento, TreeNode};

/// Lightweight summary of a persisted entity, read before full deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityManifest {
    /// Entity identifier.
    pub id: String,
    /// Declared implementation type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicit catalog provenance, if persisted.
    #[serde(default)]
    pub catalog_item_id: Option<String>,
    /// Parent entity, absent for applications.
    #[serde(default)]
    pub parent: Option<String>,
}

impl EntityManifest {
    /// Manifest for `id` of type `type_name` with no parent and no provenance.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            catalog_item_id: None,
            parent: None,
        }
    }

    /// Builder-style parent assignment.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder-style catalog provenance.
    pub fn with_catalog_item(mut self, catalog_item_id: impl Into<String>) -> Self {
        self.catalog_item_id = Some(catalog_item_id.into());
        self
    }
}

impl TreeNode for EntityManifest {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// Summary of everything in a store: ids, types, parents and catalog items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MementoManifest {
    /// Entity summaries keyed by id.
    pub entities: IndexMap<String, EntityManifest>,
    /// Location id to declared type.
    pub location_types: IndexMap<String, String>,
    /// Catalog items are small enough to be read whole at this stage.
    pub catalog_items: IndexMap<String, CatalogItemMemento>,
}

impl MementoManifest {
    /// True when the store holds no entities, locations or catalog items.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.location_types.is_empty() && self.catalog_items.is_empty()
    }

    /// Ids of the persisted catalog items.
    pub fn catalog_item_ids(&self) -> Vec<&str> {
        self.catalog_items.keys().map(String::as_str).collect()
    }
}
