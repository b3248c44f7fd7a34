//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Creation of empty shells for persisted objects.
//!
//! A type is resolved through the catalog item it came from when one is
//! known, otherwise from the classpath. Construction prefers the canonical
//! factory and falls back to legacy constructor shapes.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use trellis_persistence::{CatalogItemMemento, Memento, ObjectKind};

use crate::context::RebindScratchContext;
use crate::error::ObjectError;
use crate::management::ManagementContext;
use crate::object::LiveObject;
use crate::types::{ConstructorArgs, Flags, ShellSpec, TypeDescriptor};

/// Builds shells and pre-registers them with the live manager.
#[derive(Debug, Clone, Copy)]
pub struct ObjectInstantiator<'a> {
    management: &'a ManagementContext,
    infer_catalog_item: bool,
}

impl<'a> ObjectInstantiator<'a> {
    pub fn new(management: &'a ManagementContext, infer_catalog_item: bool) -> Self {
        Self {
            management,
            infer_catalog_item,
        }
    }

    pub fn new_entity(
        &self,
        scratch: &RebindScratchContext,
        id: &str,
        type_name: &str,
        catalog_item_id: Option<&str>,
    ) -> Result<LiveObject, ObjectError> {
        let descriptor = self.load(ObjectKind::Entity, type_name, catalog_item_id, scratch)?;
        let mut flags = Flags::new();
        flags.insert("id".into(), Value::from(id));
        let candidates = vec![
            ConstructorArgs::Flags(flags.clone()),
            ConstructorArgs::FlagsAndParent(flags, None),
            ConstructorArgs::Parent(None),
            ConstructorArgs::NoArgs,
        ];
        let object = self.construct(ObjectKind::Entity, &descriptor, id, candidates)?;
        self.finish(object, id, catalog_item_id)
    }

    pub fn new_location(
        &self,
        scratch: &RebindScratchContext,
        id: &str,
        type_name: &str,
    ) -> Result<LiveObject, ObjectError> {
        let descriptor = self.load(ObjectKind::Location, type_name, None, scratch)?;
        let mut flags = Flags::new();
        flags.insert("id".into(), Value::from(id));
        flags.insert("deferConstructionChecks".into(), Value::Bool(true));
        let object = self.construct(
            ObjectKind::Location,
            &descriptor,
            id,
            vec![ConstructorArgs::Flags(flags)],
        )?;
        self.finish(object, id, None)
    }

    /// Policy, enricher or feed shell for `memento`.
    pub fn new_adjunct(
        &self,
        scratch: &RebindScratchContext,
        kind: ObjectKind,
        memento: &Memento,
    ) -> Result<LiveObject, ObjectError> {
        let catalog_item_id = memento.catalog_item_id.as_deref();
        let descriptor = self.load(kind, &memento.type_name, catalog_item_id, scratch)?;
        let candidates = match kind {
            ObjectKind::Policy | ObjectKind::Enricher => {
                let mut flags = memento.config.clone();
                flags.insert("id".into(), Value::from(memento.id.as_str()));
                flags.insert("deferConstructionChecks".into(), Value::Bool(true));
                flags.insert("noConstructionInit".into(), Value::Bool(true));
                vec![ConstructorArgs::Flags(flags)]
            }
            _ => Vec::new(),
        };
        let object = self.construct(kind, &descriptor, &memento.id, candidates)?;
        self.finish(object, &memento.id, catalog_item_id)
    }

    /// Catalog items load from the classpath only.
    pub fn new_catalog_item(&self, memento: &CatalogItemMemento) -> Result<LiveObject, ObjectError> {
        let descriptor = self
            .management
            .types()
            .classpath()
            .load(&memento.type_name)
            .ok_or_else(|| ObjectError::TypeNotFound {
                type_name: memento.type_name.clone(),
                context: None,
            })?;
        check_kind(&descriptor, ObjectKind::CatalogItem)?;
        let object = self.construct(
            ObjectKind::CatalogItem,
            &descriptor,
            &memento.id,
            vec![ConstructorArgs::NoArgs],
        )?;
        self.finish(object, &memento.id, None)
    }

    /// Resolve `type_name` for a new shell of `kind`.
    pub fn load(
        &self,
        kind: ObjectKind,
        type_name: &str,
        catalog_item_id: Option<&str>,
        scratch: &RebindScratchContext,
    ) -> Result<Arc<TypeDescriptor>, ObjectError> {
        let types = self.management.types();
        let descriptor = match catalog_item_id {
            Some(catalog_item_id) => {
                let item = scratch
                    .catalog_item(catalog_item_id)
                    .or_else(|| self.management.catalog().get_optional_version(catalog_item_id))
                    .ok_or_else(|| ObjectError::CatalogItemNotFound(catalog_item_id.to_owned()))?;
                let label = format!("catalog item {}", item.id());
                let context = types.with_libraries(label.clone(), item.libraries());
                context.load(type_name).ok_or(ObjectError::TypeNotFound {
                    type_name: type_name.to_owned(),
                    context: Some(label),
                })?
            }
            None => match types.classpath().load(type_name) {
                Some(descriptor) => descriptor,
                None => {
                    warn!(%kind, type_name, "no catalog item recorded and type is not on the classpath");
                    if !self.infer_catalog_item {
                        return Err(ObjectError::TypeNotFound {
                            type_name: type_name.to_owned(),
                            context: None,
                        });
                    }
                    self.management
                        .catalog()
                        .items()
                        .into_iter()
                        .find_map(|item| {
                            types
                                .with_libraries(item.id(), item.libraries())
                                .load(type_name)
                        })
                        .ok_or_else(|| ObjectError::TypeNotFound {
                            type_name: type_name.to_owned(),
                            context: None,
                        })?
                }
            },
        };
        check_kind(&descriptor, kind)?;
        Ok(descriptor)
    }

    fn construct(
        &self,
        kind: ObjectKind,
        descriptor: &TypeDescriptor,
        id: &str,
        candidates: Vec<ConstructorArgs>,
    ) -> Result<LiveObject, ObjectError> {
        if let Some(factory) = descriptor.canonical_factory() {
            return factory(&ShellSpec {
                id,
                type_name: descriptor.name(),
            });
        }
        for args in candidates {
            let shape = args.shape();
            if let Some(result) = descriptor.construct_legacy(args) {
                warn!(%kind, id, type_name = descriptor.name(), ?shape, "using deprecated legacy constructor");
                return result;
            }
        }
        Err(ObjectError::NoConstructor {
            kind,
            type_name: descriptor.name().to_owned(),
        })
    }

    fn finish(
        &self,
        object: LiveObject,
        id: &str,
        catalog_item_id: Option<&str>,
    ) -> Result<LiveObject, ObjectError> {
        object.assign_id(id);
        if let Some(catalog_item_id) = catalog_item_id {
            object.set_catalog_item_id(Some(catalog_item_id.to_owned()));
        }
        self.management.pre_manage(&object);
        debug!(kind = %object.kind(), id, type_name = object.type_name(), "created shell");
        Ok(object)
    }
}

fn check_kind(descriptor: &TypeDescriptor, expected: ObjectKind) -> Result<(), ObjectError> {
    if descriptor.kind() == expected {
        Ok(())
    } else {
        Err(ObjectError::KindMismatch {
            type_name: descriptor.name().to_owned(),
            expected,
            actual: descriptor.kind(),
        })
    }
}
