//! ---
//! trellis_section: "01-core-functionality"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Rebind engine for the managed-object graph."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Management-wide catalog of deployable types.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;
use trellis_persistence::CatalogItemMemento;

use crate::basic::BasicCatalogItem;
use crate::object::CatalogItem;

/// Version assumed when a reference names no version.
pub const DEFAULT_VERSION: &str = "0.0.0.SNAPSHOT";

/// Where the catalog comes from when it is not restored from persisted state.
pub trait DefaultCatalogSource: Send + Sync {
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<Arc<dyn CatalogItem>>>;
}

/// Fixed list of catalog entries.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    items: Vec<CatalogItemMemento>,
}

impl StaticCatalogSource {
    pub fn new(items: Vec<CatalogItemMemento>) -> Self {
        Self { items }
    }
}

impl DefaultCatalogSource for StaticCatalogSource {
    fn describe(&self) -> String {
        format!("{} built-in catalog item(s)", self.items.len())
    }

    fn load(&self) -> Result<Vec<Arc<dyn CatalogItem>>> {
        Ok(self
            .items
            .iter()
            .map(|memento| Arc::new(BasicCatalogItem::from_memento(memento)) as Arc<dyn CatalogItem>)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<CatalogItemMemento>,
}

/// Catalog entries read from a TOML (`[[items]]`) or JSON file.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DefaultCatalogSource for FileCatalogSource {
    fn describe(&self) -> String {
        format!("catalog file {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<Arc<dyn CatalogItem>>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read catalog {}", self.path.display()))?;
        let file: CatalogFile = match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("invalid catalog JSON in {}", self.path.display()))?,
            _ => toml::from_str(&contents)
                .with_context(|| format!("invalid catalog TOML in {}", self.path.display()))?,
        };
        StaticCatalogSource::new(file.items).load()
    }
}

/// Catalog items known to the live manager, keyed by `symbolic_name:version`.
#[derive(Default)]
pub struct Catalog {
    items: RwLock<IndexMap<String, Arc<dyn CatalogItem>>>,
    default_source: RwLock<Option<Arc<dyn DefaultCatalogSource>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default_source(&self, source: Arc<dyn DefaultCatalogSource>) {
        *self.default_source.write() = Some(source);
    }

    pub fn register(&self, item: Arc<dyn CatalogItem>) {
        self.items.write().insert(item.id(), item);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn CatalogItem>> {
        self.items.read().get(id).cloned()
    }

    /// Item `symbolic_name` at `version`.
    ///
    /// At [`DEFAULT_VERSION`] the most recently registered version of the
    /// symbolic name is accepted when no snapshot entry exists.
    pub fn get_versioned(&self, symbolic_name: &str, version: &str) -> Option<Arc<dyn CatalogItem>> {
        let items = self.items.read();
        if let Some(item) = items.get(&format!("{symbolic_name}:{version}")) {
            return Some(item.clone());
        }
        if version != DEFAULT_VERSION {
            return None;
        }
        items
            .values()
            .rev()
            .find(|item| item.symbolic_name() == symbolic_name)
            .cloned()
    }

    /// Resolve `id`, which may or may not carry a `:version` suffix.
    pub fn get_optional_version(&self, id: &str) -> Option<Arc<dyn CatalogItem>> {
        if let Some(item) = self.get(id) {
            return Some(item);
        }
        match id.split_once(':') {
            Some((symbolic_name, version)) => self.get_versioned(symbolic_name, version),
            None => self.get_versioned(id, DEFAULT_VERSION),
        }
    }

    pub fn items(&self) -> Vec<Arc<dyn CatalogItem>> {
        self.items.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Replace every item with `items`.
    pub fn reset(&self, items: impl IntoIterator<Item = Arc<dyn CatalogItem>>) {
        let replacement: IndexMap<_, _> = items.into_iter().map(|item| (item.id(), item)).collect();
        debug!(items = replacement.len(), "resetting catalog");
        *self.items.write() = replacement;
    }

    /// Replace every item with the contents of the default source.
    ///
    /// Without a configured source the catalog ends up empty.
    pub fn reset_to_default(&self) -> Result<usize> {
        let source = self.default_source.read().clone();
        let items = match source {
            Some(source) => source
                .load()
                .with_context(|| format!("loading {}", source.describe()))?,
            None => {
                debug!("no default catalog source configured");
                Vec::new()
            }
        };
        let count = items.len();
        self.reset(items);
        Ok(count)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("items", &self.items.read().keys().collect::<Vec<_>>())
            .field("default_source", &self.default_source.read().as_ref().map(|s| s.describe()))
            .finish()
    }
}
