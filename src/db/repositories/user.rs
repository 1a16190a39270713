//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{UpdateProfileInput, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; the returned copy carries the database id
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Overwrite the profile fields of a user
    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<Option<User>>;

    /// Whether another user (not `except_id`) already uses `username`
    async fn username_taken(&self, username: &str, except_id: Option<i64>) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.sqlite()?, username).await
            }
            DatabaseDriver::Mysql => get_user_by_username_mysql(self.pool.mysql()?, username).await,
        }
    }

    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                update_profile_sqlite(pool, id, input).await?;
                get_user_by_id_sqlite(pool, id).await
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                update_profile_mysql(pool, id, input).await?;
                get_user_by_id_mysql(pool, id).await
            }
        }
    }

    async fn username_taken(&self, username: &str, except_id: Option<i64>) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                username_taken_sqlite(self.pool.sqlite()?, username, except_id).await
            }
            DatabaseDriver::Mysql => {
                username_taken_mysql(self.pool.mysql()?, username, except_id).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM users";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql).fetch_one(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql).fetch_one(self.pool.mysql()?).await,
        }
        .context("Failed to count users")?;
        Ok(count)
    }
}

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, role, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn update_profile_sqlite(pool: &SqlitePool, id: i64, input: &UpdateProfileInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, first_name = ?, last_name = ?, email = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update user profile")?;

    Ok(())
}

async fn username_taken_sqlite(
    pool: &SqlitePool,
    username: &str,
    except_id: Option<i64>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? AND (? IS NULL OR id != ?)",
    )
    .bind(username)
    .bind(except_id)
    .bind(except_id)
    .fetch_one(pool)
    .await
    .context("Failed to check username")?;

    Ok(count > 0)
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role: role.parse::<UserRole>()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, first_name, last_name, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn update_profile_mysql(pool: &MySqlPool, id: i64, input: &UpdateProfileInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, first_name = ?, last_name = ?, email = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update user profile")?;

    Ok(())
}

async fn username_taken_mysql(
    pool: &MySqlPool,
    username: &str,
    except_id: Option<i64>,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? AND (? IS NULL OR id != ?)",
    )
    .bind(username)
    .bind(except_id)
    .bind(except_id)
    .fetch_one(pool)
    .await
    .context("Failed to check username")?;

    Ok(count > 0)
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role: role.parse::<UserRole>()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn new_user(username: &str) -> User {
        User::new(username.into(), format!("{}@example.com", username), "hash".into(), UserRole::Author)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_user("alice")).await.unwrap();
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.role, UserRole::Author);

        let by_name = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        assert!(repo.get_by_username("bob").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let repo = setup_test_repo().await;
        repo.create(&new_user("alice")).await.unwrap();
        assert!(repo.create(&new_user("alice")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = setup_test_repo().await;
        let user = repo.create(&new_user("alice")).await.unwrap();

        let input = UpdateProfileInput {
            username: "alice2".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            email: String::new(),
        };
        let updated = repo.update_profile(user.id, &input).await.unwrap().unwrap();

        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.first_name, "Alice");
        assert_eq!(updated.last_name, "Liddell");
        assert_eq!(updated.email, "");
        assert_eq!(updated.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_username_taken_excludes_self() {
        let repo = setup_test_repo().await;
        let alice = repo.create(&new_user("alice")).await.unwrap();
        repo.create(&new_user("bob")).await.unwrap();

        assert!(repo.username_taken("alice", None).await.unwrap());
        assert!(!repo.username_taken("alice", Some(alice.id)).await.unwrap());
        assert!(repo.username_taken("bob", Some(alice.id)).await.unwrap());
        assert!(!repo.username_taken("carol", None).await.unwrap());
    }
}
