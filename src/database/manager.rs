use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::database::memory::MemoryCatalogueStore;
use crate::database::postgres::PgCatalogueStore;
use crate::database::store::{CatalogueStore, StoreError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Build the store implementation selected by configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn CatalogueStore>, StoreError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory catalogue store");
            Ok(Arc::new(MemoryCatalogueStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = connect(config).await?;
            migrate(&pool).await?;
            Ok(Arc::new(PgCatalogueStore::new(pool)))
        }
    }
}

/// Create the Postgres connection pool
pub async fn connect(config: &StorageConfig) -> Result<PgPool, StoreError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not configured".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(url)
        .await?;

    info!("Created database pool (max {} connections)", config.max_connections);
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))?;
    info!("Database migrations applied");
    Ok(())
}
