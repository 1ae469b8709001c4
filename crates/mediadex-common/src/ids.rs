//! Typed ID wrappers for type safety across mediadex.
//!
//! Newtype wrappers around UUIDs prevent mixing identifiers, e.g. passing a
//! `FolderId` where a `ShowId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a TV show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(Uuid);

impl ShowId {
    /// Generate a new random show ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShowId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ShowId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ShowId> for Uuid {
    fn from(id: ShowId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ShowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a watched folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(Uuid);

impl FolderId {
    /// Generate a new random folder ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FolderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<FolderId> for Uuid {
    fn from(id: FolderId) -> Self {
        id.0
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
