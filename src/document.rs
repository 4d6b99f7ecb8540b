//! The persisted JSON document.
//!
//! On disk the document is a single JSON object with one key per collection,
//! each holding an array of record objects:
//!
//! ```json
//! { "debitos": [ { "debito_id": "...", "created_at": "2023-01-05" } ] }
//! ```
//!
//! It is always read and written whole. Collections keep the order in which
//! they appear in the file.

use crate::error::{Result, StoreError};
use crate::types::{CollectionSpec, Record};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// In-memory image of the whole document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    collections: IndexMap<String, Vec<Record>>,
}

impl Document {
    /// A document holding an empty array for every given collection.
    pub fn with_collections(specs: &[CollectionSpec]) -> Self {
        let mut document = Self::default();
        for spec in specs {
            document.ensure_collection(&spec.name);
        }
        document
    }

    /// Add `name` as an empty collection if absent. Returns whether it was added.
    pub fn ensure_collection(&mut self, name: &str) -> bool {
        if self.collections.contains_key(name) {
            return false;
        }
        self.collections.insert(name.to_string(), Vec::new());
        true
    }

    /// Records of a collection, empty if the collection does not exist.
    pub fn collection(&self, name: &str) -> &[Record] {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn collection_mut(&mut self, name: &str) -> &mut Vec<Record> {
        self.collections.entry(name.to_string()).or_default()
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Load a document from `path`. A blank file is an empty document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| StoreError::InvalidFormat(e.to_string()))
    }

    /// Write the whole document to `path`.
    ///
    /// The bytes go to a sibling temp file first, which is synced and then
    /// renamed over `path`, so readers never observe a partial document.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let encoded = serde_json::to_vec_pretty(self)?;

        let tmp_path = sibling(path, "tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&encoded)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, path)?;

        // Make the rename durable where the platform allows opening directories.
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        tracing::debug!(path = %path.display(), bytes = encoded.len(), "document persisted");
        Ok(())
    }
}

/// `<path>.<suffix>`, next to `path`.
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
