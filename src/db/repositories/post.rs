//! Post repository
//!
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Listing queries are always restricted by a [`PostScope`]; the WHERE clause
//! for each scope is built in [`scope_filter`].

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    CategorySummary, ListParams, LocationSummary, Post, PostInput, PostScope, PostWithMeta,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::database::HasArguments;
use sqlx::query::Query;
use sqlx::{Database, Encode, MySql, Row, Sqlite, Type};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    /// Raw lookup, no visibility rules applied
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Lookup with author, category, location and comment count
    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Overwrite the form-editable fields of a post
    async fn update(&self, id: i64, input: &PostInput) -> Result<Option<Post>>;

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool>;

    /// Delete a post together with its comments
    async fn delete(&self, id: i64) -> Result<bool>;

    /// One page of a scope, newest `pub_date` first, ties broken by title
    async fn list(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        params: &ListParams,
    ) -> Result<Vec<PostWithMeta>>;

    /// Total size of a scope
    async fn count(&self, scope: PostScope, now: DateTime<Utc>) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str =
    "id, title, text, pub_date, image, is_published, created_at, author_id, location_id, category_id";

const SELECT_WITH_META: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.image, p.is_published, p.created_at,
           p.author_id, p.location_id, p.category_id,
           u.username AS author_username,
           c.title AS category_title, c.slug AS category_slug,
           c.is_published AS category_is_published,
           l.name AS location_name, l.is_published AS location_is_published,
           (SELECT COUNT(*) FROM comments cm
             WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const COUNT_FROM: &str = r#"
    SELECT COUNT(*)
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

/// Public visibility: published, due, and filed under a published category.
/// A post without a category never matches because `c.is_published` is NULL.
pub const PUBLICLY_VISIBLE: &str =
    "p.is_published = 1 AND p.pub_date <= ? AND c.is_published = 1";

/// A value bound into a scope's WHERE clause
#[derive(Debug, Clone, Copy)]
enum ScopeArg {
    Id(i64),
    Now(DateTime<Utc>),
}

/// WHERE clause (over aliases `p` and `c`) and bind values for a scope
fn scope_filter(scope: PostScope, now: DateTime<Utc>) -> (String, Vec<ScopeArg>) {
    match scope {
        PostScope::Published => (PUBLICLY_VISIBLE.to_string(), vec![ScopeArg::Now(now)]),
        PostScope::PublishedInCategory(category_id) => (
            format!("{} AND p.category_id = ?", PUBLICLY_VISIBLE),
            vec![ScopeArg::Now(now), ScopeArg::Id(category_id)],
        ),
        PostScope::ByAuthor {
            author_id,
            include_hidden: true,
        } => ("p.author_id = ?".to_string(), vec![ScopeArg::Id(author_id)]),
        PostScope::ByAuthor {
            author_id,
            include_hidden: false,
        } => (
            format!("p.author_id = ? AND {}", PUBLICLY_VISIBLE),
            vec![ScopeArg::Id(author_id), ScopeArg::Now(now)],
        ),
        PostScope::All => ("1 = 1".to_string(), Vec::new()),
    }
}

fn bind_scope<'q, DB>(
    mut query: Query<'q, DB, <DB as HasArguments<'q>>::Arguments>,
    args: &[ScopeArg],
) -> Query<'q, DB, <DB as HasArguments<'q>>::Arguments>
where
    DB: Database,
    i64: Encode<'q, DB> + Type<DB>,
    DateTime<Utc>: Encode<'q, DB> + Type<DB>,
{
    for arg in args {
        query = match *arg {
            ScopeArg::Id(id) => query.bind(id),
            ScopeArg::Now(now) => query.bind(now),
        };
    }
    query
}

fn list_sql(filter: &str) -> String {
    format!(
        "{} WHERE {} ORDER BY p.pub_date DESC, p.title ASC, p.id DESC LIMIT ? OFFSET ?",
        SELECT_WITH_META, filter
    )
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        let sql = r#"
            INSERT INTO posts (title, text, pub_date, image, is_published, created_at,
                               author_id, location_id, category_id)
            VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?)
        "#;
        let created_at = Utc::now();

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.pub_date)
                .bind(&input.image)
                .bind(created_at)
                .bind(author_id)
                .bind(input.location_id)
                .bind(input.category_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create post")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.title)
                .bind(&input.text)
                .bind(input.pub_date)
                .bind(&input.image)
                .bind(created_at)
                .bind(author_id)
                .bind(input.location_id)
                .bind(input.category_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create post")?
                .last_insert_id() as i64,
        };

        Ok(Post {
            id,
            title: input.title.clone(),
            text: input.text.clone(),
            pub_date: input.pub_date,
            image: input.image.clone(),
            is_published: true,
            created_at,
            author_id,
            location_id: input.location_id,
            category_id: input.category_id,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_mysql).transpose()
            }
        }
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let sql = format!("{} WHERE p.id = ?", SELECT_WITH_META);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get post with meta")?;
                row.as_ref().map(row_to_post_with_meta_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get post with meta")?;
                row.as_ref().map(row_to_post_with_meta_mysql).transpose()
            }
        }
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<Option<Post>> {
        let sql = r#"
            UPDATE posts
            SET title = ?, text = ?, pub_date = ?, image = ?, location_id = ?, category_id = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.text)
                    .bind(input.pub_date)
                    .bind(&input.image)
                    .bind(input.location_id)
                    .bind(input.category_id)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.text)
                    .bind(input.pub_date)
                    .bind(&input.image)
                    .bind(input.location_id)
                    .bind(input.category_id)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update post")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool> {
        let sql = "UPDATE posts SET is_published = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to change post visibility")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to change post visibility")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        params: &ListParams,
    ) -> Result<Vec<PostWithMeta>> {
        let (filter, args) = scope_filter(scope, now);
        let sql = list_sql(&filter);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_scope(sqlx::query::<Sqlite>(&sql), &args)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list posts")?
                .iter()
                .map(row_to_post_with_meta_sqlite)
                .collect(),
            DatabaseDriver::Mysql => bind_scope(sqlx::query::<MySql>(&sql), &args)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list posts")?
                .iter()
                .map(row_to_post_with_meta_mysql)
                .collect(),
        }
    }

    async fn count(&self, scope: PostScope, now: DateTime<Utc>) -> Result<i64> {
        let (filter, args) = scope_filter(scope, now);
        let sql = format!("{} WHERE {}", COUNT_FROM, filter);

        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => bind_scope(sqlx::query::<Sqlite>(&sql), &args)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count posts")?
                .try_get::<i64, _>(0)?,
            DatabaseDriver::Mysql => bind_scope(sqlx::query::<MySql>(&sql), &args)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count posts")?
                .try_get::<i64, _>(0)?,
        };
        Ok(count)
    }
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        image: row.try_get("image")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        author_id: row.try_get("author_id")?,
        location_id: row.try_get("location_id")?,
        category_id: row.try_get("category_id")?,
    })
}

fn row_to_post_with_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithMeta> {
    let category_slug: Option<String> = row.try_get("category_slug")?;
    let category = match category_slug {
        Some(slug) => Some(CategorySummary {
            title: row.try_get("category_title")?,
            slug,
            is_published: row.try_get("category_is_published")?,
        }),
        None => None,
    };
    let location_name: Option<String> = row.try_get("location_name")?;
    let location = match location_name {
        Some(name) => Some(LocationSummary {
            name,
            is_published: row.try_get("location_is_published")?,
        }),
        None => None,
    };

    Ok(PostWithMeta {
        post: row_to_post_sqlite(row)?,
        author_username: row.try_get("author_username")?,
        category,
        location,
        comment_count: row.try_get("comment_count")?,
    })
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        image: row.try_get("image")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        author_id: row.try_get("author_id")?,
        location_id: row.try_get("location_id")?,
        category_id: row.try_get("category_id")?,
    })
}

fn row_to_post_with_meta_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithMeta> {
    let category_slug: Option<String> = row.try_get("category_slug")?;
    let category = match category_slug {
        Some(slug) => Some(CategorySummary {
            title: row.try_get("category_title")?,
            slug,
            is_published: row.try_get("category_is_published")?,
        }),
        None => None,
    };
    let location_name: Option<String> = row.try_get("location_name")?;
    let location = match location_name {
        Some(name) => Some(LocationSummary {
            name,
            is_published: row.try_get("location_is_published")?,
        }),
        None => None,
    };

    Ok(PostWithMeta {
        post: row_to_post_mysql(row)?,
        author_username: row.try_get("author_username")?,
        category,
        location,
        comment_count: row.try_get("comment_count")?,
    })
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    //! Shared seeding helpers for tests that need posts in the database

    use super::*;
    use crate::db::repositories::{
        CategoryRepository, SqlxCategoryRepository, SqlxUserRepository, UserRepository,
    };
    use crate::models::{CategoryInput, User, UserRole};

    pub async fn user(pool: &DynDatabasePool, username: &str) -> User {
        SqlxUserRepository::new(pool.clone())
            .create(&User::new(username.into(), String::new(), "hash".into(), UserRole::Author))
            .await
            .expect("Failed to create user")
    }

    pub async fn category(pool: &DynDatabasePool, slug: &str, is_published: bool) -> i64 {
        SqlxCategoryRepository::new(pool.clone())
            .create(&CategoryInput {
                title: slug.to_uppercase(),
                description: String::new(),
                slug: slug.into(),
                is_published,
            })
            .await
            .expect("Failed to create category")
            .id
    }

    pub fn post_input(title: &str, pub_date: DateTime<Utc>, category_id: Option<i64>) -> PostInput {
        PostInput {
            title: title.into(),
            text: format!("{} body", title),
            pub_date,
            location_id: None,
            category_id,
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (pool.clone(), SqlxPostRepository::new(pool))
    }

    fn titles(posts: &[PostWithMeta]) -> Vec<&str> {
        posts.iter().map(|p| p.post.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_and_get_with_meta() {
        let (pool, repo) = setup().await;
        let author = user(&pool, "writer").await;
        let news = category(&pool, "news", true).await;

        let now = Utc::now();
        let post = repo
            .create(author.id, &post_input("Hello", now, Some(news)))
            .await
            .unwrap();
        assert!(post.is_published);

        let meta = repo.get_with_meta(post.id).await.unwrap().unwrap();
        assert_eq!(meta.post.title, "Hello");
        assert_eq!(meta.author_username, "writer");
        assert_eq!(meta.category.as_ref().unwrap().slug, "news");
        assert!(meta.location.is_none());
        assert_eq!(meta.comment_count, 0);
    }

    #[tokio::test]
    async fn test_published_scope_filters() {
        let (pool, repo) = setup().await;
        let author = user(&pool, "writer").await;
        let open = category(&pool, "open", true).await;
        let closed = category(&pool, "closed", false).await;
        let now = Utc::now();
        let hour = Duration::hours(1);

        repo.create(author.id, &post_input("visible", now - hour, Some(open))).await.unwrap();
        repo.create(author.id, &post_input("future", now + hour, Some(open))).await.unwrap();
        repo.create(author.id, &post_input("hidden category", now - hour, Some(closed))).await.unwrap();
        repo.create(author.id, &post_input("no category", now - hour, None)).await.unwrap();
        let unpublished = repo
            .create(author.id, &post_input("unpublished", now - hour, Some(open)))
            .await
            .unwrap();
        repo.set_published(unpublished.id, false).await.unwrap();

        let params = ListParams::new(1, 10);
        let public = repo.list(PostScope::Published, now, &params).await.unwrap();
        assert_eq!(titles(&public), vec!["visible"]);
        assert_eq!(repo.count(PostScope::Published, now).await.unwrap(), 1);

        let own = PostScope::ByAuthor { author_id: author.id, include_hidden: true };
        assert_eq!(repo.count(own, now).await.unwrap(), 5);

        let others_view = PostScope::ByAuthor { author_id: author.id, include_hidden: false };
        assert_eq!(repo.count(others_view, now).await.unwrap(), 1);

        assert_eq!(repo.count(PostScope::All, now).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_category_scope() {
        let (pool, repo) = setup().await;
        let author = user(&pool, "writer").await;
        let a = category(&pool, "a", true).await;
        let b = category(&pool, "b", true).await;
        let past = Utc::now() - Duration::minutes(5);

        repo.create(author.id, &post_input("in a", past, Some(a))).await.unwrap();
        repo.create(author.id, &post_input("in b", past, Some(b))).await.unwrap();

        let posts = repo
            .list(PostScope::PublishedInCategory(a), Utc::now(), &ListParams::new(1, 10))
            .await
            .unwrap();
        assert_eq!(titles(&posts), vec!["in a"]);
    }

    #[tokio::test]
    async fn test_ordering_and_paging() {
        let (pool, repo) = setup().await;
        let author = user(&pool, "writer").await;
        let cat = category(&pool, "cat", true).await;
        let base = Utc::now() - Duration::days(1);

        repo.create(author.id, &post_input("b-old", base, Some(cat))).await.unwrap();
        repo.create(author.id, &post_input("z-new", base + Duration::hours(2), Some(cat))).await.unwrap();
        repo.create(author.id, &post_input("a-new", base + Duration::hours(2), Some(cat))).await.unwrap();

        let now = Utc::now();
        let first = repo.list(PostScope::Published, now, &ListParams::new(1, 2)).await.unwrap();
        assert_eq!(titles(&first), vec!["a-new", "z-new"]);

        let second = repo.list(PostScope::Published, now, &ListParams::new(2, 2)).await.unwrap();
        assert_eq!(titles(&second), vec!["b-old"]);
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_flag() {
        let (pool, repo) = setup().await;
        let author = user(&pool, "writer").await;
        let post = repo.create(author.id, &post_input("draft", Utc::now(), None)).await.unwrap();
        repo.set_published(post.id, false).await.unwrap();

        let mut input = post_input("final", Utc::now(), None);
        input.image = Some("posts_images/x.png".into());
        let updated = repo.update(post.id, &input).await.unwrap().unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(updated.image.as_deref(), Some("posts_images/x.png"));
        assert_eq!(updated.author_id, author.id);
        assert!(!updated.is_published);
    }

    #[tokio::test]
    async fn test_delete() {
        let (pool, repo) = setup().await;
        let author = user(&pool, "writer").await;
        let post = repo.create(author.id, &post_input("gone", Utc::now(), None)).await.unwrap();

        assert!(repo.delete(post.id).await.unwrap());
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
        assert!(!repo.delete(post.id).await.unwrap());
    }
}
