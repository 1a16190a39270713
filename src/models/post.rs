//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post.
///
/// `pub_date` may lie in the future; such a post stays out of public
/// listings until that moment passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Path relative to the media root, e.g. `posts_images/<uuid>.png`
    pub image: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// The parts of a category a post listing needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

/// The parts of a location a post listing needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSummary {
    pub name: String,
    pub is_published: bool,
}

/// Post joined with its author, category, location and comment count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category: Option<CategorySummary>,
    pub location: Option<LocationSummary>,
    /// Published comments only
    pub comment_count: i64,
}

/// Validated fields written by the post form
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
}

/// Which posts a listing query may return.
///
/// Every listing in the application goes through one of these scopes; the
/// repository turns each into a WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Publicly visible posts
    Published,
    /// Publicly visible posts of one category
    PublishedInCategory(i64),
    /// Posts of one author; hidden ones only when `include_hidden`
    ByAuthor { author_id: i64, include_hidden: bool },
    /// Everything, for the admin pages
    All,
}
