use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::ExamId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// Only I/O-level failures appear here. A payload that is corrupt or has the
/// wrong shape is reported by `ProgressStore::load` as "no progress".
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Key-value contract for serialized progress documents, one per exam.
///
/// Writes replace the whole document; there is no field-level update and no
/// version check, so the last writer wins.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the raw stored document for an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_payload(&self, exam_id: &ExamId) -> Result<Option<String>, StorageError>;

    /// Store the document for an exam, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn put_payload(
        &self,
        exam_id: &ExamId,
        payload: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Remove the document for an exam. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_payload(&self, exam_id: &ExamId) -> Result<bool, StorageError>;

    /// Exams that currently have a stored document, in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_exam_ids(&self) -> Result<Vec<ExamId>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    payloads: Arc<Mutex<BTreeMap<ExamId, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_payload(&self, exam_id: &ExamId) -> Result<Option<String>, StorageError> {
        let guard = self
            .payloads
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(exam_id).cloned())
    }

    async fn put_payload(
        &self,
        exam_id: &ExamId,
        payload: &str,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .payloads
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(exam_id.clone(), payload.to_owned());
        Ok(())
    }

    async fn delete_payload(&self, exam_id: &ExamId) -> Result<bool, StorageError> {
        let mut guard = self
            .payloads
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(exam_id).is_some())
    }

    async fn list_exam_ids(&self) -> Result<Vec<ExamId>, StorageError> {
        let guard = self
            .payloads
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}

/// Progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;

    #[tokio::test]
    async fn in_memory_round_trips_and_deletes() {
        let repo = InMemoryRepository::new();
        let exam = ExamId::new("sample").unwrap();

        assert_eq!(repo.get_payload(&exam).await.unwrap(), None);
        repo.put_payload(&exam, "{\"a\":1}", fixed_now()).await.unwrap();
        repo.put_payload(&exam, "{\"a\":2}", fixed_now()).await.unwrap();
        assert_eq!(
            repo.get_payload(&exam).await.unwrap().as_deref(),
            Some("{\"a\":2}")
        );
        assert_eq!(repo.list_exam_ids().await.unwrap(), vec![exam.clone()]);

        assert!(repo.delete_payload(&exam).await.unwrap());
        assert!(!repo.delete_payload(&exam).await.unwrap());
        assert!(repo.list_exam_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let repo = InMemoryRepository::new();
        let other = repo.clone();
        let exam = ExamId::new("shared").unwrap();
        repo.put_payload(&exam, "{}", fixed_now()).await.unwrap();
        assert!(other.get_payload(&exam).await.unwrap().is_some());
    }
}
