pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, pool_from_url, DbPool};
pub use repositories::PgMembershipRepository;

use anyhow::Result;
use std::sync::Arc;

/// Database service combining all repositories
pub struct Database {
    pub memberships: Arc<PgMembershipRepository>,
    pool: DbPool,
}

impl Database {
    /// Create a new database service from a connection pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            memberships: Arc::new(PgMembershipRepository::new(pool.clone())),
            pool,
        }
    }

    /// Create a new database service from configuration
    pub async fn from_config(config: &config::DatabaseConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self::new(pool))
    }

    /// Connect to the database named by `TEST_DATABASE_URL` and migrate it.
    ///
    /// Returns `None` when the variable is unset so integration tests can skip.
    pub async fn from_test_env() -> Result<Option<Self>> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            return Ok(None);
        };
        let database = Self::new(pool_from_url(&database_url, 4)?);
        database.run_migrations().await?;
        Ok(Some(database))
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run(&self.pool).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
