//! Main Store struct owning the document and its file.

use crate::document::{sibling, Document};
use crate::error::{Result, StoreError};
use crate::types::{
    today, CollectionSpec, Record, StoreStats, CREATED_AT_FIELD, DEFAULT_ID_FIELD,
};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Path of the JSON document.
    pub path: PathBuf,

    /// Collections served by this store.
    pub collections: Vec<CollectionSpec>,

    /// Whether to create the document if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./pagueDB.json"),
            collections: vec![CollectionSpec::debitos()],
            create_if_missing: true,
        }
    }
}

/// The record store.
///
/// Reads are answered from the in-memory document. Every mutation runs
/// against a copy of the document, persists the copy in full, and only then
/// replaces the in-memory image, so a failed write leaves nothing behind.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Last persisted document.
    document: RwLock<Document>,

    /// Serializes mutations.
    write_lock: Mutex<()>,
}

impl Store {
    /// Open an existing document or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        if config.path.exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::NotInitialized(config.path.display().to_string()))
        }
    }

    /// Create a new document holding every configured collection, empty.
    pub fn create(config: StoreConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_file = Self::acquire_lock(&config.path)?;

        let document = Document::with_collections(&config.collections);
        document.save(&config.path)?;

        tracing::info!(path = %config.path.display(), "created document");

        Ok(Self {
            config,
            _lock_file: lock_file,
            document: RwLock::new(document),
            write_lock: Mutex::new(()),
        })
    }

    /// Open an existing document. Configured collections missing from the
    /// file are added empty and persisted.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let lock_file = Self::acquire_lock(&config.path)?;

        let mut document = Document::load(&config.path)?;

        let mut added = false;
        for spec in &config.collections {
            added |= document.ensure_collection(&spec.name);
        }
        if added {
            document.save(&config.path)?;
        }

        tracing::info!(
            path = %config.path.display(),
            records = document.record_count(),
            "opened document"
        );

        Ok(Self {
            config,
            _lock_file: lock_file,
            document: RwLock::new(document),
            write_lock: Mutex::new(()),
        })
    }

    // --- Collections ---

    /// Configured collections, in configuration order.
    pub fn collections(&self) -> &[CollectionSpec] {
        &self.config.collections
    }

    /// Look up a configured collection.
    pub fn spec(&self, collection: &str) -> Option<&CollectionSpec> {
        self.config.collections.iter().find(|s| s.name == collection)
    }

    fn require_spec(&self, collection: &str) -> Result<&CollectionSpec> {
        self.spec(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    fn id_field(&self, collection: &str) -> &str {
        self.spec(collection)
            .map(|s| s.id_field.as_str())
            .unwrap_or(DEFAULT_ID_FIELD)
    }

    // --- Record Operations ---

    /// All records of a collection in insertion order.
    pub fn list(&self, collection: &str) -> Vec<Record> {
        self.document.read().collection(collection).to_vec()
    }

    /// First record whose identity equals `id`.
    pub fn find_by_id(&self, collection: &str, id: &str) -> Option<Record> {
        let id_field = self.id_field(collection);
        self.document
            .read()
            .collection(collection)
            .iter()
            .find(|r| r.has_id(id_field, id))
            .cloned()
    }

    /// Create a record from caller fields.
    ///
    /// The generated identity (and `created_at`, when tracked) come first in
    /// the record and override caller values for the same keys.
    pub fn create_record(&self, collection: &str, fields: Map<String, Value>) -> Result<Record> {
        let spec = self.require_spec(collection)?.clone();

        let record = self.mutate(|document| {
            let records = document.collection_mut(&spec.name);

            let id = loop {
                let candidate = spec.id_strategy.generate();
                if !records.iter().any(|r| r.has_id(&spec.id_field, candidate.as_str())) {
                    break candidate;
                }
            };

            let mut record = Record::default();
            record.insert(spec.id_field.clone(), Value::String(id.0));
            if spec.track_created_at {
                record.insert(CREATED_AT_FIELD, Value::String(today()));
            }
            for (key, value) in fields {
                if key == spec.id_field || (spec.track_created_at && key == CREATED_AT_FIELD) {
                    continue;
                }
                record.insert(key, value);
            }

            records.push(record.clone());
            (record, true)
        })?;

        tracing::debug!(
            collection,
            id = record.id(&spec.id_field).unwrap_or_default(),
            "record created"
        );
        Ok(record)
    }

    /// Shallow-merge `partial` into the record with identity `id`.
    ///
    /// Returns `None` without touching storage when no record matches.
    pub fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<Option<Record>> {
        let spec = self.require_spec(collection)?.clone();

        let updated = self.mutate(|document| {
            let records = document.collection_mut(&spec.name);
            match records.iter_mut().find(|r| r.has_id(&spec.id_field, id)) {
                Some(record) => {
                    record.merge(partial, &spec.id_field);
                    (Some(record.clone()), true)
                }
                None => (None, false),
            }
        })?;

        tracing::debug!(collection, id, found = updated.is_some(), "record updated");
        Ok(updated)
    }

    /// Remove the first record with identity `id`.
    ///
    /// The document is persisted either way. Returns whether a record was
    /// removed; absence is not an error.
    pub fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        let spec = self.require_spec(collection)?.clone();

        let removed = self.mutate(|document| {
            let records = document.collection_mut(&spec.name);
            let removed = match records.iter().position(|r| r.has_id(&spec.id_field, id)) {
                Some(index) => {
                    records.remove(index);
                    true
                }
                None => false,
            };
            (removed, true)
        })?;

        tracing::debug!(collection, id, removed, "record deleted");
        Ok(removed)
    }

    /// Records whose `created_at` lies in `[start, end]`, compared as
    /// `YYYY-MM-DD` strings. Records without a string `created_at` never match.
    pub fn filter_by_date_range(&self, collection: &str, start: &str, end: &str) -> Vec<Record> {
        self.document
            .read()
            .collection(collection)
            .iter()
            .filter(|r| {
                r.created_at()
                    .map(|at| start <= at && at <= end)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    // --- Misc ---

    /// Record counts per collection and document size.
    pub fn stats(&self) -> StoreStats {
        let document = self.document.read();
        let collections = document
            .collection_names()
            .map(|name| (name.to_string(), document.collection(name).len()))
            .collect();

        StoreStats {
            collections,
            record_count: document.record_count(),
            file_size_bytes: fs::metadata(&self.config.path).ok().map(|m| m.len()),
        }
    }

    /// Get the document path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // --- Private Helpers ---

    /// Run `f` on a copy of the document. When it reports a change, persist the
    /// copy and make it current.
    fn mutate<T>(&self, f: impl FnOnce(&mut Document) -> (T, bool)) -> Result<T> {
        let _lock = self.write_lock.lock();

        let mut next = self.document.read().clone();
        let (out, changed) = f(&mut next);

        if changed {
            if let Err(e) = next.save(&self.config.path) {
                tracing::error!(path = %self.config.path.display(), error = %e, "persist failed");
                return Err(e);
            }
            *self.document.write() = next;
        }

        Ok(out)
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(sibling(path, "lock"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }
}
