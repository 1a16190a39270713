//! Author-only access policy for posts and comments

use crate::models::{Comment, CommentWithAuthor, Post, PostWithMeta, User};

/// Anything that records who wrote it
pub trait Authored {
    fn author_id(&self) -> i64;
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for PostWithMeta {
    fn author_id(&self) -> i64 {
        self.post.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for CommentWithAuthor {
    fn author_id(&self) -> i64 {
        self.comment.author_id
    }
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

impl Access {
    pub fn is_granted(self) -> bool {
        self == Access::Granted
    }
}

/// Only the logged-in author of `entity` may change it.
///
/// Admins get no exception here; they moderate through the admin pages.
pub fn author_only<E: Authored + ?Sized>(viewer: Option<&User>, entity: &E) -> Access {
    match viewer {
        Some(user) if user.id == entity.author_id() => Access::Granted,
        _ => Access::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use chrono::Utc;
    use proptest::prelude::*;

    fn user(id: i64, role: UserRole) -> User {
        let mut user = User::new(format!("user{}", id), String::new(), "h".into(), role);
        user.id = id;
        user
    }

    fn comment(author_id: i64) -> Comment {
        Comment {
            id: 1,
            text: "hi".into(),
            is_published: true,
            created_at: Utc::now(),
            author_id,
            post_id: 1,
        }
    }

    #[test]
    fn test_anonymous_is_denied() {
        assert_eq!(author_only(None, &comment(1)), Access::Denied);
    }

    #[test]
    fn test_admin_is_not_the_author() {
        let admin = user(2, UserRole::Admin);
        assert_eq!(author_only(Some(&admin), &comment(1)), Access::Denied);
        assert!(author_only(Some(&admin), &comment(2)).is_granted());
    }

    proptest! {
        #[test]
        fn prop_granted_iff_viewer_is_author(viewer_id in 1i64..50, author_id in 1i64..50) {
            let viewer = user(viewer_id, UserRole::Author);
            let access = author_only(Some(&viewer), &comment(author_id));
            prop_assert_eq!(access.is_granted(), viewer_id == author_id);
        }
    }
}
