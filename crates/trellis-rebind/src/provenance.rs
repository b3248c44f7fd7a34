//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Inference of the catalog item an entity was created from, for entities
//! persisted without one.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, trace};
use trellis_persistence::EntityManifest;

use crate::catalog::{Catalog, DEFAULT_VERSION};
use crate::object::ManagedObject;
use crate::types::TypeRegistry;

/// Resolves catalog provenance against the live catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogProvenanceResolver<'a> {
    catalog: &'a Catalog,
    types: &'a TypeRegistry,
    infer: bool,
}

impl<'a> CatalogProvenanceResolver<'a> {
    /// With `infer` off only an explicit catalog item id is returned.
    pub fn new(catalog: &'a Catalog, types: &'a TypeRegistry, infer: bool) -> Self {
        Self {
            catalog,
            types,
            infer,
        }
    }

    /// Catalog item id for `manifest`, first match wins:
    ///
    /// 1. the manifest's own id;
    /// 2. the nearest ancestor's id, returned even if it no longer resolves;
    /// 3. a catalog item named after the type of the entity or an ancestor, at
    ///    [`DEFAULT_VERSION`];
    /// 4. nothing, when the type loads from the classpath;
    /// 5. the first catalog item whose libraries can load the type.
    pub fn resolve(
        &self,
        manifests: &IndexMap<String, EntityManifest>,
        manifest: &EntityManifest,
    ) -> Option<String> {
        if let Some(explicit) = &manifest.catalog_item_id {
            return Some(explicit.clone());
        }
        if !self.infer {
            return None;
        }

        let ancestry = ancestry(manifests, manifest);

        if let Some(ancestor_id) = ancestry.iter().find_map(|node| node.catalog_item_id.as_deref()) {
            return match self.catalog.get_optional_version(ancestor_id) {
                Some(item) => Some(item.id()),
                None => {
                    debug!(entity = %manifest.id, catalog_item = ancestor_id, "inherited catalog item not in catalog; keeping reference");
                    Some(ancestor_id.to_owned())
                }
            };
        }

        for node in &ancestry {
            if let Some(item) = self.catalog.get_versioned(&node.type_name, DEFAULT_VERSION) {
                trace!(entity = %manifest.id, catalog_item = %item.id(), "catalog item matched by type");
                return Some(item.id());
            }
        }

        if self.types.classpath().can_load(&manifest.type_name) {
            return None;
        }

        let found = self.catalog.items().into_iter().find(|item| {
            self.types
                .with_libraries(item.id(), item.libraries())
                .can_load(&manifest.type_name)
        });
        match found {
            Some(item) => Some(item.id()),
            None => {
                debug!(entity = %manifest.id, type_name = %manifest.type_name, "no catalog item can load entity type");
                None
            }
        }
    }
}

/// `manifest` followed by its ancestors, nearest first, stopping at a cycle.
fn ancestry<'m>(
    manifests: &'m IndexMap<String, EntityManifest>,
    manifest: &'m EntityManifest,
) -> Vec<&'m EntityManifest> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    let mut cursor = Some(manifest);
    while let Some(node) = cursor {
        if !seen.insert(node.id.as_str()) {
            break;
        }
        chain.push(node);
        cursor = node.parent.as_deref().and_then(|parent| manifests.get(parent));
    }
    chain
}
