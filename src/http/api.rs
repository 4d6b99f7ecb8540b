//! Bodies exchanged with clients besides records themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of every non-2xx reply.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StatusResponseBody {
    pub version: String,
    /// Record count per collection.
    pub collections: BTreeMap<String, usize>,
    pub record_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
}
