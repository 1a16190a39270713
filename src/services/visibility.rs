//! Publication visibility rules
//!
//! The same rule exists twice: as the predicates below and as the SQL scope
//! in [`crate::db::repositories::post::PUBLICLY_VISIBLE`]. The property test
//! at the bottom keeps the two in agreement.

use chrono::{DateTime, Utc};

use crate::models::{Post, PostWithMeta, User};

/// Whether anybody may see `post` at `now`.
///
/// `category_published` is the publication flag of the post's category, or
/// `None` when the post has no category. Posts without a category are never
/// public.
pub fn is_publicly_visible(post: &Post, category_published: Option<bool>, now: DateTime<Utc>) -> bool {
    post.is_published && post.pub_date <= now && category_published == Some(true)
}

/// Whether `viewer` may open the detail page of `post`.
///
/// Authors always see their own posts, hidden or scheduled.
pub fn can_view(viewer: Option<&User>, post: &PostWithMeta, now: DateTime<Utc>) -> bool {
    if viewer.is_some_and(|user| user.id == post.post.author_id) {
        return true;
    }
    is_publicly_visible(
        &post.post,
        post.category.as_ref().map(|c| c.is_published),
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::test_fixtures;
    use crate::db::repositories::{PostRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CategorySummary, ListParams, PostScope, UserRole};
    use chrono::Duration;
    use proptest::prelude::*;

    fn post(is_published: bool, pub_date: DateTime<Utc>) -> Post {
        Post {
            id: 1,
            title: "T".into(),
            text: "body".into(),
            pub_date,
            image: None,
            is_published,
            created_at: pub_date,
            author_id: 7,
            location_id: None,
            category_id: Some(1),
        }
    }

    fn with_meta(post: Post, category_published: Option<bool>) -> PostWithMeta {
        PostWithMeta {
            post,
            author_username: "author".into(),
            category: category_published.map(|is_published| CategorySummary {
                title: "News".into(),
                slug: "news".into(),
                is_published,
            }),
            location: None,
            comment_count: 0,
        }
    }

    #[test]
    fn test_public_requires_all_three_conditions() {
        let now = Utc::now();
        let past = now - Duration::hours(1);
        let future = now + Duration::hours(1);

        assert!(is_publicly_visible(&post(true, past), Some(true), now));
        assert!(is_publicly_visible(&post(true, now), Some(true), now));
        assert!(!is_publicly_visible(&post(false, past), Some(true), now));
        assert!(!is_publicly_visible(&post(true, future), Some(true), now));
        assert!(!is_publicly_visible(&post(true, past), Some(false), now));
        assert!(!is_publicly_visible(&post(true, past), None, now));
    }

    #[test]
    fn test_author_sees_own_hidden_post() {
        let now = Utc::now();
        let hidden = with_meta(post(false, now + Duration::days(1)), Some(false));

        let mut author = User::new("author".into(), String::new(), "h".into(), UserRole::Author);
        author.id = 7;
        let mut other = User::new("other".into(), String::new(), "h".into(), UserRole::Admin);
        other.id = 8;

        assert!(can_view(Some(&author), &hidden, now));
        assert!(!can_view(Some(&other), &hidden, now));
        assert!(!can_view(None, &hidden, now));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// The public listing contains a post exactly when the predicate
        /// says it is publicly visible.
        #[test]
        fn prop_sql_scope_matches_predicate(
            is_published in any::<bool>(),
            offset_minutes in -600i64..600,
            category_state in prop_oneof![Just(None), Just(Some(true)), Just(Some(false))],
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let pool = create_test_pool().await.expect("Failed to create test pool");
                migrations::run_migrations(&pool).await.expect("Failed to run migrations");

                let author = test_fixtures::user(&pool, "author").await;
                let category_id = match category_state {
                    Some(published) => Some(test_fixtures::category(&pool, "news", published).await),
                    None => None,
                };

                let now = Utc::now();
                let pub_date = now + Duration::minutes(offset_minutes);
                let repo = SqlxPostRepository::new(pool);
                let created = repo
                    .create(author.id, &test_fixtures::post_input("Hello", pub_date, category_id))
                    .await
                    .expect("create should succeed");
                repo.set_published(created.id, is_published).await.expect("toggle should succeed");
                let stored = repo.get_by_id(created.id).await.unwrap().unwrap();

                let listed = repo
                    .list(PostScope::Published, now, &ListParams::new(1, 10))
                    .await
                    .expect("list should succeed");

                let expected = is_publicly_visible(&stored, category_state, now);
                prop_assert_eq!(listed.iter().any(|p| p.post.id == created.id), expected);
                prop_assert_eq!(
                    repo.count(PostScope::Published, now).await.unwrap(),
                    i64::from(expected)
                );
                Ok(())
            });
            result?;
        }
    }
}
