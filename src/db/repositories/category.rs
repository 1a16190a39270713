//! Category repository
//!
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, input: &CategoryInput) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Look a category up by slug, published or not
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// All categories ordered by title
    async fn list(&self) -> Result<Vec<Category>>;

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>>;

    /// Delete a category; posts in it keep existing without a category.
    /// Returns false when there was nothing to delete.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Whether another category (not `except_id`) already uses `slug`
    async fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CategoryInput) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_category_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get category by ID")?;
                row.as_ref().map(row_to_category_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get category by ID")?;
                row.as_ref().map(row_to_category_mysql).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get category by slug")?;
                row.as_ref().map(row_to_category_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get category by slug")?;
                row.as_ref().map(row_to_category_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!("SELECT {} FROM categories ORDER BY title, id", CATEGORY_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list categories")?
                .iter()
                .map(row_to_category_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list categories")?
                .iter()
                .map(row_to_category_mysql)
                .collect(),
        }
    }

    async fn update(&self, id: i64, input: &CategoryInput) -> Result<Option<Category>> {
        let sql = "UPDATE categories SET title = ?, description = ?, slug = ?, is_published = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.slug)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update category")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.slug)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update category")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM categories WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM categories WHERE slug = ? AND (? IS NULL OR id != ?)";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar(sql)
                    .bind(slug)
                    .bind(except_id)
                    .bind(except_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar(sql)
                    .bind(slug)
                    .bind(except_id)
                    .bind(except_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to check category slug")?;
        Ok(count > 0)
    }
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

async fn create_category_sqlite(pool: &SqlitePool, input: &CategoryInput) -> Result<Category> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at,
    })
}

async fn create_category_mysql(pool: &MySqlPool, input: &CategoryInput) -> Result<Category> {
    let created_at = Utc::now();
    let result = sqlx::query(
        "INSERT INTO categories (title, description, slug, is_published, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at,
    })
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: row.try_get("slug")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: row.try_get("slug")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}
