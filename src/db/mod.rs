//! Database layer
//!
//! SQLite is the default backend; MySQL is selected through
//! `database.driver` in the configuration. Everything above this module talks
//! to a [`DynDatabasePool`] and the repository traits in [`repositories`].
//!
//! ```ignore
//! use blogicum::config::DatabaseConfig;
//! use blogicum::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
