//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Persistence abstractions and storage bindings."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---
//! Directory-backed store: one directory per object kind, one JSON
//! envelope per object.
//!
//! ```text
//! <root>/entities/<id>.json
//! <root>/locations/<id>.json
//! <root>/catalog/<id>.json
//! ```
//!
//! Each envelope carries a SHA-256 of its payload; files that fail the check
//! are reported to the exception handler and skipped.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::access::{PersistenceExceptionHandler, PersistenceStoreAccess};
use crate::kind::ObjectKind;
use crate::raw::RawMementoData;
use crate::{PersistenceError, Result};

/// Current envelope version.
pub const ENVELOPE_VERSION: u16 = 1;

const EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    version: u16,
    written_at: DateTime<Utc>,
    hash: String,
    memento: Value,
}

/// File-system backed [`PersistenceStoreAccess`].
#[derive(Debug)]
pub struct FileMementoStore {
    root: PathBuf,
    writable: AtomicBool,
}

impl FileMementoStore {
    /// Open a store rooted at `root`. Nothing is created until the first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writable: AtomicBool::new(false),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, kind: ObjectKind, id: &str) -> PathBuf {
        self.root
            .join(kind.directory())
            .join(format!("{id}.{EXTENSION}"))
    }

    /// Serialize `value` into the envelope for `id`.
    ///
    /// Fails with [`PersistenceError::ReadOnly`] until writes are enabled.
    pub fn persist<T: Serialize>(&self, kind: ObjectKind, id: &str, value: &T) -> Result<()> {
        if !self.is_writable() {
            return Err(PersistenceError::ReadOnly(self.root.display().to_string()));
        }
        let path = self.path_for(kind, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let memento = serde_json::to_value(value)?;
        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            written_at: Utc::now(),
            hash: compute_hash(&memento)?,
            memento,
        };

        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(&serde_json::to_vec_pretty(&envelope)?)?;
        writer.flush()?;
        debug!(%kind, id, path = %path.display(), "persisted memento");
        Ok(())
    }

    /// Delete the envelope for `id`, returning whether it existed.
    pub fn delete(&self, kind: ObjectKind, id: &str) -> Result<bool> {
        if !self.is_writable() {
            return Err(PersistenceError::ReadOnly(self.root.display().to_string()));
        }
        let path = self.path_for(kind, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn read_envelope(&self, kind: ObjectKind, id: &str, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if compute_hash(&envelope.memento)? != envelope.hash {
            return Err(PersistenceError::HashMismatch {
                kind,
                id: id.to_owned(),
            });
        }
        Ok(serde_json::to_string(&envelope.memento)?)
    }
}

impl PersistenceStoreAccess for FileMementoStore {
    fn backing_store_description(&self) -> String {
        format!("file store at {}", self.root.display())
    }

    fn load_raw_data(&self, handler: &dyn PersistenceExceptionHandler) -> Result<RawMementoData> {
        let mut raw = RawMementoData::default();
        for kind in ObjectKind::ALL {
            let dir = self.root.join(kind.directory());
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let err = PersistenceError::Io(err.into());
                        handler.on_load_memento_failed(
                            kind,
                            &format!("unreadable entry in {}", dir.display()),
                            &err,
                        )?;
                        continue;
                    }
                };
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION)
                {
                    continue;
                }
                let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    warn!(path = %path.display(), "skipping memento with non-utf8 name");
                    continue;
                };
                match self.read_envelope(kind, id, path) {
                    Ok(payload) => raw.put(kind, id, payload),
                    Err(err) => {
                        handler.on_load_memento_failed(kind, &format!("{kind} {id}"), &err)?;
                    }
                }
            }
        }
        debug!(store = %self.root.display(), objects = raw.len(), "loaded raw memento data");
        Ok(raw)
    }

    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }
}

fn compute_hash(memento: &Value) -> Result<String> {
    let serialized = serde_json::to_vec(memento)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    Ok(hex::encode(hasher.finalize()))
}
