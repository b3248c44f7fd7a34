//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every kind of object that takes part in persistence and rebind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Application or child entity.
    Entity,
    /// Deployment target.
    Location,
    /// Adjunct that acts on an entity.
    Policy,
    /// Adjunct that derives entity attributes.
    Enricher,
    /// Adjunct that polls external state into an entity.
    Feed,
    /// Catalog entry describing a deployable type.
    CatalogItem,
}

impl ObjectKind {
    /// All kinds, in the order their directories are scanned.
    pub const ALL: [ObjectKind; 6] = [
        ObjectKind::Entity,
        ObjectKind::Location,
        ObjectKind::Policy,
        ObjectKind::Enricher,
        ObjectKind::Feed,
        ObjectKind::CatalogItem,
    ];

    /// Lower-case, human readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Entity => "entity",
            ObjectKind::Location => "location",
            ObjectKind::Policy => "policy",
            ObjectKind::Enricher => "enricher",
            ObjectKind::Feed => "feed",
            ObjectKind::CatalogItem => "catalog item",
        }
    }

    /// Directory a file-backed store keeps this kind in.
    pub fn directory(self) -> &'static str {
        match self {
            ObjectKind::Entity => "entities",
            ObjectKind::Location => "locations",
            ObjectKind::Policy => "policies",
            ObjectKind::Enricher => "enrichers",
            ObjectKind::Feed => "feeds",
            ObjectKind::CatalogItem => "catalog",
        }
    }

    /// Policies, enrichers and feeds.
    pub fn is_adjunct(self) -> bool {
        matches!(
            self,
            ObjectKind::Policy | ObjectKind::Enricher | ObjectKind::Feed
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
