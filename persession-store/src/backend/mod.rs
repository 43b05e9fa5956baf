//! Document store backends

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryDocumentStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDocumentStore;

use persession_core::{config_error, DocumentStore, SessionResult, StorageBackend, StorageConfig};
use std::sync::Arc;

/// Build the backend named by the storage configuration
pub async fn connect(config: &StorageConfig) -> SessionResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryDocumentStore::new())),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                config_error!("The sqlite backend requires a database URL", "backend")
            })?;
            Ok(Arc::new(SqliteDocumentStore::connect(url).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => Err(config_error!(
            "This build does not include the sqlite backend",
            "backend"
        )),
    }
}
