//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Type registry: maps declared type names to construction recipes.
//!
//! Types registered directly are on the "classpath" and load from anywhere.
//! Types registered in a bundle load only through a catalog item that lists
//! the bundle among its libraries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use trellis_persistence::ObjectKind;

use crate::error::ObjectError;
use crate::object::LiveObject;

/// Construction flags handed to legacy constructors.
pub type Flags = BTreeMap<String, Value>;

/// Canonical factory: builds an empty shell for the given id.
pub type Factory = Arc<dyn Fn(&ShellSpec<'_>) -> Result<LiveObject, ObjectError> + Send + Sync>;

/// Legacy constructor accepting one of the shapes it declares.
pub type LegacyConstructor = Arc<dyn Fn(ConstructorArgs) -> Result<LiveObject, ObjectError> + Send + Sync>;

/// What a canonical factory is told about the shell it builds.
#[derive(Debug, Clone, Copy)]
pub struct ShellSpec<'a> {
    pub id: &'a str,
    pub type_name: &'a str,
}

/// Argument shapes a legacy constructor may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructorShape {
    Flags,
    FlagsAndParent,
    Parent,
    NoArgs,
}

/// Arguments for one legacy constructor call.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructorArgs {
    Flags(Flags),
    FlagsAndParent(Flags, Option<String>),
    Parent(Option<String>),
    NoArgs,
}

impl ConstructorArgs {
    pub fn shape(&self) -> ConstructorShape {
        match self {
            ConstructorArgs::Flags(_) => ConstructorShape::Flags,
            ConstructorArgs::FlagsAndParent(..) => ConstructorShape::FlagsAndParent,
            ConstructorArgs::Parent(_) => ConstructorShape::Parent,
            ConstructorArgs::NoArgs => ConstructorShape::NoArgs,
        }
    }

    pub fn flags(&self) -> Option<&Flags> {
        match self {
            ConstructorArgs::Flags(flags) | ConstructorArgs::FlagsAndParent(flags, _) => Some(flags),
            _ => None,
        }
    }

    /// The `id` flag, when the shape carries flags.
    pub fn id(&self) -> Option<&str> {
        self.flags()
            .and_then(|flags| flags.get("id"))
            .and_then(Value::as_str)
    }
}

/// Everything needed to build shells of one type.
pub struct TypeDescriptor {
    name: String,
    kind: ObjectKind,
    canonical: Option<Factory>,
    legacy: Option<(Vec<ConstructorShape>, LegacyConstructor)>,
}

impl TypeDescriptor {
    /// Type with a canonical no-argument factory.
    pub fn canonical<F>(name: impl Into<String>, kind: ObjectKind, factory: F) -> Self
    where
        F: Fn(&ShellSpec<'_>) -> Result<LiveObject, ObjectError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            canonical: Some(Arc::new(factory)),
            legacy: None,
        }
    }

    /// Type only constructible through legacy constructor shapes.
    pub fn legacy<F>(
        name: impl Into<String>,
        kind: ObjectKind,
        shapes: impl IntoIterator<Item = ConstructorShape>,
        constructor: F,
    ) -> Self
    where
        F: Fn(ConstructorArgs) -> Result<LiveObject, ObjectError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            canonical: None,
            legacy: Some((shapes.into_iter().collect(), Arc::new(constructor))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn canonical_factory(&self) -> Option<&Factory> {
        self.canonical.as_ref()
    }

    pub fn supports(&self, shape: ConstructorShape) -> bool {
        self.legacy
            .as_ref()
            .is_some_and(|(shapes, _)| shapes.contains(&shape))
    }

    /// Call the legacy constructor; `None` when `args` has an unsupported shape.
    pub fn construct_legacy(&self, args: ConstructorArgs) -> Option<Result<LiveObject, ObjectError>> {
        let (shapes, constructor) = self.legacy.as_ref()?;
        if !shapes.contains(&args.shape()) {
            return None;
        }
        Some(constructor(args))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("canonical", &self.canonical.is_some())
            .field(
                "legacy_shapes",
                &self.legacy.as_ref().map(|(shapes, _)| shapes),
            )
            .finish()
    }
}

/// Known types, on the classpath or inside named bundles.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    classpath: IndexMap<String, Arc<TypeDescriptor>>,
    bundles: IndexMap<String, IndexMap<String, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `descriptor` loadable from anywhere.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.classpath
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        self
    }

    /// Make `descriptor` loadable only through catalog items listing `bundle`.
    pub fn register_in_bundle(&mut self, bundle: &str, descriptor: TypeDescriptor) -> &mut Self {
        self.bundles
            .entry(bundle.to_owned())
            .or_default()
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        self
    }

    /// Context that sees classpath types only.
    pub fn classpath(&self) -> LoadingContext<'_> {
        LoadingContext {
            registry: self,
            libraries: Vec::new(),
            label: None,
        }
    }

    /// Context that sees `libraries` first, then the classpath.
    pub fn with_libraries(&self, label: impl Into<String>, libraries: Vec<String>) -> LoadingContext<'_> {
        LoadingContext {
            registry: self,
            libraries,
            label: Some(label.into()),
        }
    }
}

/// A view of the registry through a set of libraries.
#[derive(Debug, Clone)]
pub struct LoadingContext<'a> {
    registry: &'a TypeRegistry,
    libraries: Vec<String>,
    label: Option<String>,
}

impl LoadingContext<'_> {
    pub fn load(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.libraries
            .iter()
            .filter_map(|library| self.registry.bundles.get(library))
            .find_map(|bundle| bundle.get(type_name))
            .or_else(|| self.registry.classpath.get(type_name))
            .cloned()
    }

    pub fn can_load(&self, type_name: &str) -> bool {
        self.load(type_name).is_some()
    }

    /// Name of what this context was built from, for error messages.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
