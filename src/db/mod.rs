use crate::config::{AppConfig, StoreBackend};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

pub mod firebase;
pub mod memory;
pub mod paths;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Write side of the real-time database.
pub trait RemoteStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Appends `value` under `collection` and returns the generated key.
    fn push<'a>(&'a self, collection: &'a str, value: &'a Value) -> BoxFuture<'a, StoreResult<String>>;

    /// Atomically adds one to the counter at `path`, treating a missing
    /// counter as zero. Returns the new value.
    fn increment<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StoreResult<i64>>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    Decode(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub fn init_store(config: &AppConfig) -> StoreResult<Arc<dyn RemoteStore>> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Firebase => {
            let url = config.firebase_database_url.as_deref().ok_or_else(|| {
                StoreError::Config("FIREBASE_DATABASE_URL is not set".to_string())
            })?;
            let credential = config.firebase_credential.clone().ok_or_else(|| {
                StoreError::Config(
                    "Set FIREBASE_ACCESS_TOKEN or FIREBASE_DATABASE_SECRET".to_string(),
                )
            })?;
            Ok(Arc::new(FirebaseStore::new(url, credential)?))
        }
    }
}
