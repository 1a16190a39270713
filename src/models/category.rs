//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A thematic category posts are filed under.
///
/// Unpublishing a category hides every post in it from public listings
/// without touching the posts themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL identifier: latin letters, digits, hyphen and underscore
    pub slug: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for creating or updating a category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}
