//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They run
//! form validation that needs the database, apply the visibility and
//! authorization rules, and translate repository failures into typed errors.

pub mod authorization;
pub mod category;
pub mod comment;
pub mod location;
pub mod media;
pub mod password;
pub mod post;
pub mod user;
pub mod visibility;

pub use authorization::{author_only, Access, Authored};
pub use category::{CategoryService, CategoryServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use location::{LocationService, LocationServiceError};
pub use media::{ImageUpload, MediaStore};
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use user::{UserService, UserServiceError};
pub use visibility::{can_view, is_publicly_visible};
