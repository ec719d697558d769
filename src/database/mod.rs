pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreKind};

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;
pub use store::{StoreError, UserStore};

/// Build the store selected by configuration. Postgres stores get their
/// schema created on first use.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn UserStore>, StoreError> {
    match config.store {
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory user store; data is lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
        StoreKind::Postgres => {
            let store = PgUserStore::connect(config).await?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}
