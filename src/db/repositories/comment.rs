//! Comment repository
//!
//! - `CommentRepository` trait defining the interface for comment data access
//! - `SqlxCommentRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, author_id: i64, post_id: i64, text: &str) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Whole thread of a post in `(created_at, text)` order, hidden comments
    /// included
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>>;

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Every comment, newest first, for the admin pages
    async fn list_all(&self, params: &ListParams) -> Result<Vec<CommentWithAuthor>>;

    async fn count_all(&self) -> Result<i64>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_COLUMNS: &str = "id, text, is_published, created_at, author_id, post_id";

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT cm.id, cm.text, cm.is_published, cm.created_at, cm.author_id, cm.post_id,
           u.username AS author_username
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, author_id: i64, post_id: i64, text: &str) -> Result<Comment> {
        let sql = "INSERT INTO comments (text, is_published, created_at, author_id, post_id) VALUES (?, 1, ?, ?, ?)";
        let created_at = Utc::now();

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(text)
                .bind(created_at)
                .bind(author_id)
                .bind(post_id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(text)
                .bind(created_at)
                .bind(author_id)
                .bind(post_id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            text: text.to_string(),
            is_published: true,
            created_at,
            author_id,
            post_id,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get comment by ID")?;
                row.as_ref().map(row_to_comment_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get comment by ID")?;
                row.as_ref().map(row_to_comment_mysql).transpose()
            }
        }
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!(
            "{} WHERE cm.post_id = ? ORDER BY cm.created_at ASC, cm.text ASC, cm.id ASC",
            SELECT_WITH_AUTHOR
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(post_id)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(row_to_comment_with_author_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(post_id)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(row_to_comment_with_author_mysql)
                .collect(),
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update comment")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn set_published(&self, id: i64, is_published: bool) -> Result<bool> {
        let sql = "UPDATE comments SET is_published = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to change comment visibility")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(is_published)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to change comment visibility")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_all(&self, params: &ListParams) -> Result<Vec<CommentWithAuthor>> {
        let sql = format!(
            "{} ORDER BY cm.created_at DESC, cm.id DESC LIMIT ? OFFSET ?",
            SELECT_WITH_AUTHOR
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(row_to_comment_with_author_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list comments")?
                .iter()
                .map(row_to_comment_with_author_mysql)
                .collect(),
        }
    }

    async fn count_all(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM comments";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql).fetch_one(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql).fetch_one(self.pool.mysql()?).await,
        }
        .context("Failed to count comments")?;
        Ok(count)
    }
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        author_id: row.try_get("author_id")?,
        post_id: row.try_get("post_id")?,
    })
}

fn row_to_comment_with_author_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<CommentWithAuthor> {
    Ok(CommentWithAuthor {
        comment: row_to_comment_sqlite(row)?,
        author_username: row.try_get("author_username")?,
    })
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
        author_id: row.try_get("author_id")?,
        post_id: row.try_get("post_id")?,
    })
}

fn row_to_comment_with_author_mysql(row: &sqlx::mysql::MySqlRow) -> Result<CommentWithAuthor> {
    Ok(CommentWithAuthor {
        comment: row_to_comment_mysql(row)?,
        author_username: row.try_get("author_username")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::test_fixtures::{post_input, user};
    use crate::db::repositories::{PostRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository, i64, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = user(&pool, "writer").await;
        let post = SqlxPostRepository::new(pool.clone())
            .create(author.id, &post_input("Post", Utc::now(), None))
            .await
            .unwrap();
        (pool.clone(), SqlxCommentRepository::new(pool), author.id, post.id)
    }

    #[tokio::test]
    async fn test_thread_order() {
        let (_pool, repo, author_id, post_id) = setup().await;
        repo.create(author_id, post_id, "first").await.unwrap();
        repo.create(author_id, post_id, "second").await.unwrap();
        repo.create(author_id, post_id, "third").await.unwrap();

        let thread = repo.list_for_post(post_id).await.unwrap();
        let texts: Vec<_> = thread.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(thread.iter().all(|c| c.author_username == "writer"));
    }

    #[tokio::test]
    async fn test_same_timestamp_sorted_by_text() {
        let (pool, repo, author_id, post_id) = setup().await;
        let created_at = Utc::now();
        for text in ["charlie", "alpha", "bravo"] {
            sqlx::query(
                "INSERT INTO comments (text, is_published, created_at, author_id, post_id) \
                 VALUES (?, 1, ?, ?, ?)",
            )
            .bind(text)
            .bind(created_at)
            .bind(author_id)
            .bind(post_id)
            .execute(pool.sqlite().unwrap())
            .await
            .unwrap();
        }

        let thread = repo.list_for_post(post_id).await.unwrap();
        let texts: Vec<_> = thread.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "bravo", "charlie"]);
    }

    #[tokio::test]
    async fn test_hidden_comment_stays_in_thread_and_count() {
        let (pool, repo, author_id, post_id) = setup().await;
        let reader = user(&pool, "reader").await;
        let hidden = repo.create(reader.id, post_id, "hidden").await.unwrap();
        repo.create(author_id, post_id, "shown").await.unwrap();
        repo.set_published(hidden.id, false).await.unwrap();

        let thread = repo.list_for_post(post_id).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert!(!thread[0].comment.is_published);

        let meta = SqlxPostRepository::new(pool)
            .get_with_meta(post_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.comment_count, 2);
    }

    #[tokio::test]
    async fn test_update_text_keeps_created_at() {
        let (_pool, repo, author_id, post_id) = setup().await;
        let comment = repo.create(author_id, post_id, "typo").await.unwrap();

        let updated = repo.update_text(comment.id, "fixed").await.unwrap().unwrap();
        assert_eq!(updated.text, "fixed");
        assert_eq!(updated.created_at, comment.created_at);
    }

    #[tokio::test]
    async fn test_delete_and_admin_listing() {
        let (_pool, repo, author_id, post_id) = setup().await;
        let a = repo.create(author_id, post_id, "a").await.unwrap();
        repo.create(author_id, post_id, "b").await.unwrap();

        assert_eq!(repo.count_all().await.unwrap(), 2);
        assert!(repo.delete(a.id).await.unwrap());
        assert!(repo.get_by_id(a.id).await.unwrap().is_none());

        let all = repo.list_all(&ListParams::new(1, 10)).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].comment.text, "b");
    }
}
