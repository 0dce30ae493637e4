//! # Flat-file store
//!
//! The default backend: each collection is one pretty-printed JSON array on
//! disk, the snapshot a single JSON document next to them.
//!
//! ## Layout
//!
//! - `student-results.json`, `professor-results.json`: append-only arrays of
//!   records, insertion ordered
//! - `combined-analysis.json`: last persisted snapshot
//!
//! ## Invariants
//!
//! - Appends are read-modify-write over the whole array, serialized behind a
//!   per-collection mutex so near-simultaneous submissions cannot drop each
//!   other's write
//! - Ids come from an atomic counter seeded past the largest persisted id,
//!   so restarts never reissue one
//! - All writes land in a temp file first and are renamed into place, the
//!   snapshot is replaced whole or not at all
//! - Startup seeds missing files and resets unreadable ones to empty

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    error::AppError,
    model::{PersistedSnapshot, Population, Response, Snapshot},
};

use super::SurveyStore;

const STUDENTS_FILE: &str = "student-results.json";
const PROFESSORS_FILE: &str = "professor-results.json";
const SNAPSHOT_FILE: &str = "combined-analysis.json";

pub struct FileStore {
    collection_files: [PathBuf; 2],
    snapshot_file: PathBuf,
    next_id: AtomicU64,
    write_locks: [Mutex<()>; 2],
    snapshot_lock: Mutex<()>,
}

impl FileStore {
    pub fn init(data_dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(data_dir)?;

        let collection_files = [
            data_dir.join(STUDENTS_FILE),
            data_dir.join(PROFESSORS_FILE),
        ];

        let mut max_id = 0;
        for path in &collection_files {
            let records = ensure_collection_file(path)?;
            max_id = records.iter().map(|r| r.id).fold(max_id, u64::max);
        }

        Ok(Self {
            collection_files,
            snapshot_file: data_dir.join(SNAPSHOT_FILE),
            next_id: AtomicU64::new(max_id + 1),
            write_locks: [Mutex::new(()), Mutex::new(())],
            snapshot_lock: Mutex::new(()),
        })
    }

    fn collection_file(&self, population: Population) -> &Path {
        &self.collection_files[population.index()]
    }
}

#[async_trait::async_trait]
impl SurveyStore for FileStore {
    async fn load(&self, population: Population) -> Result<Vec<Response>, AppError> {
        read_records(self.collection_file(population)).await
    }

    async fn append(&self, population: Population, response: &Response) -> Result<u64, AppError> {
        let _guard = self.write_locks[population.index()].lock().await;

        let path = self.collection_file(population);
        let mut records = read_records(path).await?;
        records.push(response.clone());
        write_json_atomic(path, &records).await?;

        Ok(records.len() as u64)
    }

    async fn counts(&self) -> Result<(u64, u64), AppError> {
        let students = read_records(self.collection_file(Population::Students)).await?;
        let professors = read_records(self.collection_file(Population::Professors)).await?;
        Ok((students.len() as u64, professors.len() as u64))
    }

    async fn next_id(&self) -> Result<u64, AppError> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn load_snapshot(&self) -> Result<Option<PersistedSnapshot>, AppError> {
        let content = match tokio::fs::read_to_string(&self.snapshot_file).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Discarding unreadable snapshot file: {e}");
                Ok(None)
            }
        }
    }

    async fn store_snapshot(&self, snapshot: &Snapshot) -> Result<PersistedSnapshot, AppError> {
        let persisted = PersistedSnapshot {
            snapshot: snapshot.clone(),
            last_updated: Utc::now(),
        };

        let _guard = self.snapshot_lock.lock().await;
        write_json_atomic(&self.snapshot_file, &persisted).await?;

        Ok(persisted)
    }
}

fn ensure_collection_file(path: &Path) -> Result<Vec<Response>, AppError> {
    match fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => {
            match serde_json::from_str(&content) {
                Ok(records) => return Ok(records),
                Err(e) => warn!("Resetting unreadable {}: {e}", path.display()),
            }
        }
        Ok(_) => warn!("Seeding empty {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    fs::write(path, serde_json::to_vec_pretty(&Vec::<Response>::new())?)?;
    Ok(Vec::new())
}

async fn read_records(path: &Path) -> Result<Vec<Response>, AppError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, sync::Arc};

    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn sample_response(id: u64) -> Response {
        let Value::Object(answers) = json!({"major": "CS", "satisfactionLevel": "high"}) else {
            unreachable!();
        };
        Response {
            id,
            submitted_at: Utc::now(),
            origin: "test".to_string(),
            completion_time: json!(10),
            submitted: true,
            answers,
        }
    }

    #[tokio::test]
    async fn append_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::init(dir.path()).unwrap();

        let response = sample_response(store.next_id().await.unwrap());
        let total = store.append(Population::Students, &response).await.unwrap();
        assert_eq!(total, 1);

        let records = store.load(Population::Students).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, response.id);
        assert_eq!(records[0].answers["major"], json!("CS"));
        assert_eq!(store.counts().await.unwrap(), (1, 0));
    }

    #[tokio::test]
    async fn collections_are_separate() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::init(dir.path()).unwrap();

        let response = sample_response(store.next_id().await.unwrap());
        store
            .append(Population::Professors, &response)
            .await
            .unwrap();

        assert!(store.load(Population::Students).await.unwrap().is_empty());
        assert_eq!(store.load(Population::Professors).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_submissions_all_persist_with_unique_ids() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::init(dir.path()).unwrap());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = store.next_id().await.unwrap();
                let response = sample_response(id);
                store.append(Population::Students, &response).await.unwrap();
                id
            }));
        }

        let mut issued = HashSet::new();
        for handle in handles {
            issued.insert(handle.await.unwrap());
        }
        assert_eq!(issued.len(), 16);

        let records = store.load(Population::Students).await.unwrap();
        assert_eq!(records.len(), 16);
        let persisted: HashSet<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(persisted.len(), 16);
    }

    #[tokio::test]
    async fn id_counter_resumes_past_persisted_records() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::init(dir.path()).unwrap();
            for _ in 0..3 {
                let response = sample_response(store.next_id().await.unwrap());
                store.append(Population::Students, &response).await.unwrap();
            }
        }

        let store = FileStore::init(dir.path()).unwrap();
        assert_eq!(store.next_id().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn unreadable_collection_file_is_reset() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STUDENTS_FILE), "not json at all").unwrap();

        let store = FileStore::init(dir.path()).unwrap();
        assert!(store.load(Population::Students).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_roundtrips_and_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::init(dir.path()).unwrap();
        assert!(store.load_snapshot().await.unwrap().is_none());

        let snapshot = crate::analysis::Aggregator::new(crate::analysis::AnalysisSchema::default())
            .compute(&[sample_response(1)], &[]);
        store.store_snapshot(&snapshot).await.unwrap();

        let loaded = store.load_snapshot().await.unwrap().unwrap();
        assert_eq!(loaded.snapshot, snapshot);
    }
}
