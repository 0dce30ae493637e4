//! Persistence for the two response collections and the derived snapshot.
//!
//! Two interchangeable backends sit behind one trait: flat JSON files on
//! disk (the default) and a Redis document store (selected when `REDIS_URL`
//! is configured). Collections are append-only and every record id is
//! unique, including under concurrent submissions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    config::Config,
    error::AppError,
    model::{PersistedSnapshot, Population, Response, Snapshot},
};

pub mod file;
pub mod redis;

pub use file::FileStore;
pub use redis::RedisStore;

#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Full insertion-ordered contents of one collection.
    async fn load(&self, population: Population) -> Result<Vec<Response>, AppError>;

    /// Appends one record and returns the collection's new length.
    async fn append(&self, population: Population, response: &Response) -> Result<u64, AppError>;

    /// Record counts as (students, professors).
    async fn counts(&self) -> Result<(u64, u64), AppError>;

    /// Fresh identifier, unique across both collections.
    async fn next_id(&self) -> Result<u64, AppError>;

    async fn load_snapshot(&self) -> Result<Option<PersistedSnapshot>, AppError>;

    /// Replaces the persisted snapshot wholesale, never patches it.
    async fn store_snapshot(&self, snapshot: &Snapshot) -> Result<PersistedSnapshot, AppError>;
}

pub async fn connect(config: &Config) -> Result<Arc<dyn SurveyStore>, AppError> {
    match &config.redis_url {
        Some(url) => {
            info!("Using redis store");
            Ok(Arc::new(RedisStore::connect(url).await?))
        }
        None => {
            info!("Using file store at {}", config.data_dir.display());
            Ok(Arc::new(FileStore::init(&config.data_dir)?))
        }
    }
}
