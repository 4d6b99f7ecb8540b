//! # Pague Direto
//!
//! REST API for debt and negotiation records, kept in a single JSON
//! document on disk.
//!
//! ## Core Concepts
//!
//! - **Document**: one JSON object, one array of records per collection
//! - **Records**: open JSON objects carrying a server-generated identity
//! - **Store**: owns the document; every mutation rewrites the file whole
//! - **Routes**: the same CRUD and date-range routes for every collection
//!
//! ## Example
//!
//! ```ignore
//! use pague_direto::{CollectionSpec, Store, StoreConfig};
//!
//! let store = Store::open_or_create(StoreConfig {
//!     path: "./pagueDB.json".into(),
//!     collections: vec![CollectionSpec::debitos()],
//!     ..Default::default()
//! })?;
//!
//! let record = store.create_record("debitos", serde_json::from_value(json!({
//!     "usuario_nome": "Teste",
//!     "cobranca_valor": 900.50
//! }))?)?;
//!
//! let january = store.filter_by_date_range("debitos", "2023-01-01", "2023-01-31");
//! ```

pub mod document;
pub mod error;
pub mod http;
pub mod ids;
pub mod logger;
pub mod server;
pub mod settings;
pub mod store;
pub mod types;

// Re-exports
pub use document::Document;
pub use error::{Result, StoreError};
pub use settings::Settings;
pub use store::{Store, StoreConfig};
pub use types::*;
