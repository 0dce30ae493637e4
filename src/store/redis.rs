//! # Redis store
//!
//! Document-store backend, used when `REDIS_URL` is configured.
//!
//! - One list per collection holding JSON documents, `RPUSH` keeps insertion
//!   order and makes appends atomic
//! - Ids from `INCR` on a counter key, unique without any client-side lock
//! - Snapshot under a plain string key, replaced with a single `SET`

use std::time::Duration;

use chrono::Utc;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::{
    error::AppError,
    model::{PersistedSnapshot, Population, Response, Snapshot},
};

use super::SurveyStore;

const STUDENTS_KEY: &str = "survey:students";
const PROFESSORS_KEY: &str = "survey:professors";
const SNAPSHOT_KEY: &str = "survey:analysis";
const ID_KEY: &str = "survey:next-id";

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self { connection })
    }

    fn key(population: Population) -> &'static str {
        match population {
            Population::Students => STUDENTS_KEY,
            Population::Professors => PROFESSORS_KEY,
        }
    }
}

#[async_trait::async_trait]
impl SurveyStore for RedisStore {
    async fn load(&self, population: Population) -> Result<Vec<Response>, AppError> {
        let mut connection = self.connection.clone();
        let raw: Vec<String> = connection.lrange(Self::key(population), 0, -1).await?;
        raw.iter()
            .map(|document| serde_json::from_str(document).map_err(AppError::from))
            .collect()
    }

    async fn append(&self, population: Population, response: &Response) -> Result<u64, AppError> {
        let mut connection = self.connection.clone();
        let document = serde_json::to_string(response)?;
        let length: u64 = connection.rpush(Self::key(population), document).await?;
        Ok(length)
    }

    async fn counts(&self) -> Result<(u64, u64), AppError> {
        let mut connection = self.connection.clone();
        let students: u64 = connection.llen(STUDENTS_KEY).await?;
        let professors: u64 = connection.llen(PROFESSORS_KEY).await?;
        Ok((students, professors))
    }

    async fn next_id(&self) -> Result<u64, AppError> {
        let mut connection = self.connection.clone();
        let id: u64 = connection.incr(ID_KEY, 1).await?;
        Ok(id)
    }

    async fn load_snapshot(&self) -> Result<Option<PersistedSnapshot>, AppError> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection.get(SNAPSHOT_KEY).await?;
        match raw {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    async fn store_snapshot(&self, snapshot: &Snapshot) -> Result<PersistedSnapshot, AppError> {
        let persisted = PersistedSnapshot {
            snapshot: snapshot.clone(),
            last_updated: Utc::now(),
        };

        let mut connection = self.connection.clone();
        let document = serde_json::to_string(&persisted)?;
        let _: () = connection.set(SNAPSHOT_KEY, document).await?;

        Ok(persisted)
    }
}
