//! Identity generation.

use crate::types::{IdStrategy, RecordId};
use uuid::Uuid;

/// Length of nanoid-style identities.
pub const NANOID_LENGTH: usize = 8;

impl IdStrategy {
    /// Generate a fresh identity.
    pub fn generate(self) -> RecordId {
        match self {
            IdStrategy::NanoId => RecordId(nanoid::nanoid!(NANOID_LENGTH)),
            IdStrategy::Uuid => RecordId(Uuid::new_v4().to_string()),
        }
    }
}
