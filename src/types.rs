//! Core types for the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Field stamped with the creation date for collections that track it.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Identity field used when a collection does not configure one.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Format of `created_at` stamps. Fixed width and zero padded, so string
/// order equals calendar order.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a date stamp for `created_at`.
pub fn date_stamp(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Today's date stamp (UTC).
pub fn today() -> String {
    date_stamp(Utc::now())
}

/// Identity of a record within its collection.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How identities are generated for a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Short random token over the URL-safe nanoid alphabet.
    #[default]
    NanoId,
    /// Hyphenated UUIDv4.
    Uuid,
}

/// Description of one collection served by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Top-level key in the document, also the route prefix.
    pub name: String,

    /// Field holding the record identity.
    #[serde(default = "default_id_field")]
    pub id_field: String,

    #[serde(default)]
    pub id_strategy: IdStrategy,

    /// Stamp `created_at` on create.
    #[serde(default)]
    pub track_created_at: bool,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

impl CollectionSpec {
    /// A collection keyed by `id` with nanoid identities and no timestamp.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: default_id_field(),
            id_strategy: IdStrategy::NanoId,
            track_created_at: false,
        }
    }

    /// The debt collection: `debito_id` UUIDs plus a `created_at` stamp.
    pub fn debitos() -> Self {
        Self::new("debitos")
            .with_id_field("debito_id")
            .with_id_strategy(IdStrategy::Uuid)
            .tracking_created_at()
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn tracking_created_at(mut self) -> Self {
        self.track_created_at = true;
        self
    }
}

/// A single record: a JSON object with an open field set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Identity value, if the field holds a string.
    pub fn id<'a>(&'a self, id_field: &str) -> Option<&'a str> {
        self.0.get(id_field).and_then(Value::as_str)
    }

    pub fn has_id(&self, id_field: &str, id: &str) -> bool {
        self.id(id_field) == Some(id)
    }

    pub fn created_at(&self) -> Option<&str> {
        self.0.get(CREATED_AT_FIELD).and_then(Value::as_str)
    }

    /// Shallow merge: keys in `partial` overwrite or extend this record,
    /// everything else is left alone. The identity field is never touched.
    pub fn merge(&mut self, partial: Map<String, Value>, id_field: &str) {
        for (key, value) in partial {
            if key == id_field {
                continue;
            }
            self.0.insert(key, value);
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Record(fields)
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StoreStats {
    /// Record count per collection.
    pub collections: BTreeMap<String, usize>,
    pub record_count: usize,
    /// Size of the document on disk, when it can be read.
    pub file_size_bytes: Option<u64>,
}
