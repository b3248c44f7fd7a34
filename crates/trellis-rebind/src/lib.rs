//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Rebind engine.
//!
//! Rebuilds the live graph of applications, entities, locations, adjuncts
//! and catalog items from a persisted store, so a management node can
//! restart, take over from a failed master, or follow one as a hot standby.
//! [`RebindManager`] serialises passes; each pass is a [`RebindIteration`].

pub mod basic;
pub mod catalog;
pub mod context;
pub mod error;
pub mod handler;
pub mod instantiator;
pub mod iteration;
pub mod management;
pub mod manager;
pub mod object;
pub mod provenance;
pub mod sorter;
pub mod transition;
pub mod types;

pub use catalog::{Catalog, DefaultCatalogSource, FileCatalogSource, StaticCatalogSource, DEFAULT_VERSION};
pub use context::{RebindContext, RebindScratchContext};
pub use error::{ObjectError, RebindError};
pub use handler::{DefaultExceptionHandler, RebindExceptionHandler};
pub use instantiator::ObjectInstantiator;
pub use iteration::{RebindIteration, RebindSummary};
pub use management::{ManagementContext, ObjectRegistry};
pub use manager::{RebindManager, RebindSettings};
pub use object::{Adjunct, CatalogItem, Entity, LiveObject, Location, ManagedObject};
pub use provenance::CatalogProvenanceResolver;
pub use sorter::sort_parent_first;
pub use transition::{DefaultTransitionModes, ManagementTransitionMode, TransitionModeStrategy};
pub use types::{ConstructorArgs, ConstructorShape, Flags, ShellSpec, TypeDescriptor, TypeRegistry};
