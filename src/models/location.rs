//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place a post can be tagged with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: i64,
    pub name: String,
    /// Unpublished locations are simply not shown next to their posts
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for creating or updating a location
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInput {
    pub name: String,
    pub is_published: bool,
}
