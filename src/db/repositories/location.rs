//! Location repository
//!
//! - `LocationRepository` trait defining the interface for location data access
//! - `SqlxLocationRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Location, LocationInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn create(&self, input: &LocationInput) -> Result<Location>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// All locations ordered by name
    async fn list(&self) -> Result<Vec<Location>>;

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Option<Location>>;

    /// Delete a location; posts tagged with it lose the tag.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &LocationInput) -> Result<Location> {
        let sql = "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)";
        let created_at = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(created_at)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create location")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&input.name)
                .bind(input.is_published)
                .bind(created_at)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create location")?
                .last_insert_id() as i64,
        };

        Ok(Location {
            id,
            name: input.name.clone(),
            is_published: input.is_published,
            created_at,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        let sql = format!("SELECT {} FROM locations WHERE id = ?", LOCATION_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get location by ID")?;
                row.as_ref().map(row_to_location_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get location by ID")?;
                row.as_ref().map(row_to_location_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<Location>> {
        let sql = format!("SELECT {} FROM locations ORDER BY name, id", LOCATION_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list locations")?
                .iter()
                .map(row_to_location_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list locations")?
                .iter()
                .map(row_to_location_mysql)
                .collect(),
        }
    }

    async fn update(&self, id: i64, input: &LocationInput) -> Result<Option<Location>> {
        let sql = "UPDATE locations SET name = ?, is_published = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update location")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&input.name)
                    .bind(input.is_published)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update location")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM locations WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to delete location")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to delete location")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Location> {
    Ok(Location {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Location> {
    Ok(Location {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_published: row.try_get("is_published")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxLocationRepository {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxLocationRepository::new(pool)
    }

    #[tokio::test]
    async fn test_location_crud() {
        let repo = setup_test_repo().await;
        let moscow = repo
            .create(&LocationInput { name: "Moscow".into(), is_published: true })
            .await
            .unwrap();
        repo.create(&LocationInput { name: "Kazan".into(), is_published: false })
            .await
            .unwrap();

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Kazan", "Moscow"]);

        let updated = repo
            .update(moscow.id, &LocationInput { name: "Moskva".into(), is_published: false })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Moskva");
        assert!(!updated.is_published);

        assert!(repo.delete(moscow.id).await.unwrap());
        assert!(repo.get_by_id(moscow.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_location() {
        let repo = setup_test_repo().await;
        let result = repo
            .update(42, &LocationInput { name: "Nowhere".into(), is_published: true })
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
