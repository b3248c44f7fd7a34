//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Live object model.
//!
//! Every kind shares [`ManagedObject`]; kind-specific behaviour lives in the
//! sub-traits. [`LiveObject`] is the tagged form the rebind pipeline moves
//! around so that one code path serves all six kinds.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use trellis_persistence::{CatalogItemMemento, Memento, ObjectKind};

use crate::context::RebindContext;
use crate::error::ObjectError;
use crate::transition::ManagementTransitionMode;

/// Identity and management state common to every live object.
///
/// Implementations use interior mutability: shells are shared (`Arc`) as soon
/// as they are created and populated afterwards.
pub trait ManagedObject: Send + Sync + fmt::Debug {
    fn id(&self) -> String;

    /// Overwrite the id; used when a constructor could not be given one.
    fn assign_id(&self, id: &str);

    fn type_name(&self) -> &str;

    fn catalog_item_id(&self) -> Option<String>;

    fn set_catalog_item_id(&self, catalog_item_id: Option<String>);

    fn is_read_only(&self) -> bool;

    fn set_read_only(&self, read_only: bool);

    /// Children managed together with this object.
    fn child_ids(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once the live manager has registered the object.
    fn on_managed(&self, _mode: ManagementTransitionMode) -> Result<(), ObjectError> {
        Ok(())
    }

    /// Called after the live manager has dropped the object.
    fn on_unmanaged(&self, _mode: ManagementTransitionMode) {}
}

/// Application or child entity.
pub trait Entity: ManagedObject {
    fn reconstruct(&self, context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError>;

    fn parent_id(&self) -> Option<String>;

    fn location_ids(&self) -> Vec<String>;

    fn display_name(&self) -> Option<String>;

    fn config(&self, key: &str) -> Option<Value>;

    fn attribute(&self, key: &str) -> Option<Value>;

    /// Attach a policy, enricher or feed; the adjunct starts observing this entity.
    fn add_adjunct(&self, kind: ObjectKind, adjunct: Arc<dyn Adjunct>) -> Result<(), ObjectError>;

    fn adjuncts(&self, kind: ObjectKind) -> Vec<Arc<dyn Adjunct>>;
}

/// Deployment target.
pub trait Location: ManagedObject {
    fn reconstruct(&self, context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError>;

    fn parent_id(&self) -> Option<String>;

    fn display_name(&self) -> Option<String>;

    fn config(&self, key: &str) -> Option<Value>;
}

/// Policy, enricher or feed.
pub trait Adjunct: ManagedObject {
    fn reconstruct(&self, context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError>;

    /// Bind to the owning entity.
    fn attach(&self, entity_id: &str) -> Result<(), ObjectError>;

    fn entity_id(&self) -> Option<String>;

    fn config(&self, key: &str) -> Option<Value>;
}

/// Catalog entry.
pub trait CatalogItem: ManagedObject {
    fn reconstruct(&self, memento: &CatalogItemMemento) -> Result<(), ObjectError>;

    fn symbolic_name(&self) -> String;

    fn version(&self) -> String;

    /// Bundles whose types this item can load.
    fn libraries(&self) -> Vec<String>;

    fn registered_type(&self) -> Option<String>;
}

/// A live object of any kind.
#[derive(Debug, Clone)]
pub enum LiveObject {
    Entity(Arc<dyn Entity>),
    Location(Arc<dyn Location>),
    Policy(Arc<dyn Adjunct>),
    Enricher(Arc<dyn Adjunct>),
    Feed(Arc<dyn Adjunct>),
    CatalogItem(Arc<dyn CatalogItem>),
}

macro_rules! each_kind {
    ($object:expr, $bound:ident => $body:expr) => {
        match $object {
            LiveObject::Entity($bound) => $body,
            LiveObject::Location($bound) => $body,
            LiveObject::Policy($bound) => $body,
            LiveObject::Enricher($bound) => $body,
            LiveObject::Feed($bound) => $body,
            LiveObject::CatalogItem($bound) => $body,
        }
    };
}

impl LiveObject {
    /// Wrap an adjunct under the tag for `kind`.
    pub fn adjunct(kind: ObjectKind, adjunct: Arc<dyn Adjunct>) -> Option<Self> {
        match kind {
            ObjectKind::Policy => Some(LiveObject::Policy(adjunct)),
            ObjectKind::Enricher => Some(LiveObject::Enricher(adjunct)),
            ObjectKind::Feed => Some(LiveObject::Feed(adjunct)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            LiveObject::Entity(_) => ObjectKind::Entity,
            LiveObject::Location(_) => ObjectKind::Location,
            LiveObject::Policy(_) => ObjectKind::Policy,
            LiveObject::Enricher(_) => ObjectKind::Enricher,
            LiveObject::Feed(_) => ObjectKind::Feed,
            LiveObject::CatalogItem(_) => ObjectKind::CatalogItem,
        }
    }

    pub fn id(&self) -> String {
        each_kind!(self, object => object.id())
    }

    pub fn assign_id(&self, id: &str) {
        each_kind!(self, object => object.assign_id(id))
    }

    pub fn type_name(&self) -> &str {
        each_kind!(self, object => object.type_name())
    }

    pub fn catalog_item_id(&self) -> Option<String> {
        each_kind!(self, object => object.catalog_item_id())
    }

    pub fn set_catalog_item_id(&self, catalog_item_id: Option<String>) {
        each_kind!(self, object => object.set_catalog_item_id(catalog_item_id))
    }

    pub fn is_read_only(&self) -> bool {
        each_kind!(self, object => object.is_read_only())
    }

    pub fn set_read_only(&self, read_only: bool) {
        each_kind!(self, object => object.set_read_only(read_only))
    }

    /// Populate the shell from a memento of a non-catalog kind.
    pub fn reconstruct(&self, context: &RebindContext<'_>, memento: &Memento) -> Result<(), ObjectError> {
        match self {
            LiveObject::Entity(entity) => entity.reconstruct(context, memento),
            LiveObject::Location(location) => location.reconstruct(context, memento),
            LiveObject::Policy(adjunct) | LiveObject::Enricher(adjunct) | LiveObject::Feed(adjunct) => {
                adjunct.reconstruct(context, memento)
            }
            LiveObject::CatalogItem(_) => Err(ObjectError::Reconstruct(
                "catalog items are reconstructed from catalog mementos".into(),
            )),
        }
    }

    pub fn as_entity(&self) -> Option<&Arc<dyn Entity>> {
        match self {
            LiveObject::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_location(&self) -> Option<&Arc<dyn Location>> {
        match self {
            LiveObject::Location(location) => Some(location),
            _ => None,
        }
    }

    pub fn as_adjunct(&self) -> Option<&Arc<dyn Adjunct>> {
        match self {
            LiveObject::Policy(adjunct) | LiveObject::Enricher(adjunct) | LiveObject::Feed(adjunct) => {
                Some(adjunct)
            }
            _ => None,
        }
    }

    pub fn as_catalog_item(&self) -> Option<&Arc<dyn CatalogItem>> {
        match self {
            LiveObject::CatalogItem(item) => Some(item),
            _ => None,
        }
    }
}

impl fmt::Display for LiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind(), self.id(), self.type_name())
    }
}
