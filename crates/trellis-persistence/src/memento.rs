//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::ObjectKind;

/// Anything that sits in a parent/child hierarchy keyed by id.
pub trait TreeNode {
    /// Identifier of this node.
    fn id(&self) -> &str;
    /// Identifier of the parent node, if any.
    fn parent_id(&self) -> Option<&str>;
}

/// Persisted snapshot of one entity, location, policy, enricher or feed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memento {
    /// Identifier, unique within its kind.
    pub id: String,
    /// Declared implementation type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Catalog entry that produced the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_item_id: Option<String>,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Parent entity or location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Child ids, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Configuration values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    /// Runtime attributes (entity sensors, adjunct state).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    /// Locations an entity is deployed to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    /// Policy ids attached to an entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    /// Enricher ids attached to an entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enrichers: Vec<String>,
    /// Feed ids attached to an entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feeds: Vec<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Value>,
}

impl Memento {
    /// Minimal memento with an id and declared type.
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            ..Self::default()
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

    /// Builder-style configuration entry.
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Ids of adjuncts of `kind` referenced by this (entity) memento.
    pub fn adjunct_ids(&self, kind: ObjectKind) -> &[String] {
        match kind {
            ObjectKind::Policy => &self.policies,
            ObjectKind::Enricher => &self.enrichers,
            ObjectKind::Feed => &self.feeds,
            _ => &[],
        }
    }
}

impl TreeNode for Memento {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// Persisted catalog entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemMemento {
    /// Identifier, conventionally `symbolic_name:version`.
    pub id: String,
    /// Implementation type of the catalog item itself.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Name the item is registered under.
    pub symbolic_name: String,
    /// Item version.
    pub version: String,
    /// Type this item deploys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_type: Option<String>,
    /// Bundles whose types this item can load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<String>,
    /// Deployment plan, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the item is hidden from new deployments.
    #[serde(default)]
    pub deprecated: bool,
}

impl CatalogItemMemento {
    /// Entry `symbolic_name:version` implemented by `type_name`.
    pub fn new(
        symbolic_name: impl Into<String>,
        version: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let symbolic_name = symbolic_name.into();
        let version = version.into();
        Self {
            id: format!("{symbolic_name}:{version}"),
            type_name: type_name.into(),
            symbolic_name,
            version,
            ..Self::default()
        }
    }
}

/// Complete per-object state of a persisted management plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullMemento {
    /// Entity mementos, in store order.
    pub entities: IndexMap<String, Memento>,
    /// Location mementos, in store order.
    pub locations: IndexMap<String, Memento>,
    /// Policy mementos.
    pub policies: IndexMap<String, Memento>,
    /// Enricher mementos.
    pub enrichers: IndexMap<String, Memento>,
    /// Feed mementos.
    pub feeds: IndexMap<String, Memento>,
    /// Catalog item mementos.
    pub catalog_items: IndexMap<String, CatalogItemMemento>,
}

impl FullMemento {
    /// Mementos of a non-catalog kind.
    pub fn of_kind(&self, kind: ObjectKind) -> Option<&IndexMap<String, Memento>> {
        match kind {
            ObjectKind::Entity => Some(&self.entities),
            ObjectKind::Location => Some(&self.locations),
            ObjectKind::Policy => Some(&self.policies),
            ObjectKind::Enricher => Some(&self.enrichers),
            ObjectKind::Feed => Some(&self.feeds),
            ObjectKind::CatalogItem => None,
        }
    }

    pub(crate) fn of_kind_mut(&mut self, kind: ObjectKind) -> Option<&mut IndexMap<String, Memento>> {
        match kind {
            ObjectKind::Entity => Some(&mut self.entities),
            ObjectKind::Location => Some(&mut self.locations),
            ObjectKind::Policy => Some(&mut self.policies),
            ObjectKind::Enricher => Some(&mut self.enrichers),
            ObjectKind::Feed => Some(&mut self.feeds),
            ObjectKind::CatalogItem => None,
        }
    }

    /// Top-level applications: entities without a parent.
    pub fn application_ids(&self) -> Vec<String> {
        self.entities
            .values()
            .filter(|memento| memento.parent.is_none())
            .map(|memento| memento.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_camel_case_payload() {
        let memento: Memento = serde_json::from_value(json!({
            "id": "e1",
            "type": "basic.Entity",
            "catalogItemId": "app:1.0",
            "parent": "app",
            "policies": ["p1"],
            "unknownField": 3
        }))
        .unwrap();
        assert_eq!(memento.type_name, "basic.Entity");
        assert_eq!(memento.catalog_item_id.as_deref(), Some("app:1.0"));
        assert_eq!(memento.parent_id(), Some("app"));
        assert_eq!(memento.adjunct_ids(ObjectKind::Policy), ["p1".to_owned()]);
        assert!(memento.adjunct_ids(ObjectKind::Location).is_empty());
    }

    #[test]
    fn applications_are_parentless_entities() {
        let mut full = FullMemento::default();
        full.entities
            .insert("child".into(), Memento::new("child", "t").with_parent("app"));
        full.entities.insert("app".into(), Memento::new("app", "t"));
        assert_eq!(full.application_ids(), vec!["app".to_owned()]);
    }

    #[test]
    fn catalog_item_id_joins_name_and_version() {
        let item = CatalogItemMemento::new("db", "1.2", "catalog.Item");
        assert_eq!(item.id, "db:1.2");
    }
}
