//! Data models
//!
//! Database entities (User, Session, Category, Location, Post, Comment), the
//! validated inputs written by forms, and pagination types.

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{Category, CategoryInput};
pub use comment::{Comment, CommentWithAuthor};
pub use location::{Location, LocationInput};
pub use pagination::{InvalidPage, ListParams, PageInfo, PagedResult};
pub use post::{CategorySummary, LocationSummary, Post, PostInput, PostScope, PostWithMeta};
pub use session::Session;
pub use user::{UpdateProfileInput, User, UserRole};
