//! Data models
//!
//! Rust structs representing account-store documents and session rows.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account Record
// =============================================================================

/// One persisted profile document per user.
///
/// `email` is the join key to the session principal and is unique in the
/// store. `username` is the public route key; it is assumed unique but not
/// enforced. JSON output uses camelCase to match the public API shape.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Store document id
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    /// Free text, defaults to empty
    pub description: String,
    pub thumb_url: String,
    /// Locale code (e.g. "en")
    pub locale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Session
// =============================================================================

/// Server-side session record.
///
/// The signed cookie carries the principal; this row is what logout
/// deletes, so a replayed cookie stops authenticating once it is gone.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
