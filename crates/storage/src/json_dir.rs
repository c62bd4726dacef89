//! Directory of JSON documents, one `<exam_id>.json` file per exam.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::ExamId;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::repository::{ProgressRepository, Storage, StorageError};

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonDirRepository {
    root: PathBuf,
}

impl JsonDirRepository {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the document for `exam_id`.
    #[must_use]
    pub fn path_for(&self, exam_id: &ExamId) -> PathBuf {
        self.root.join(format!("{exam_id}.{EXTENSION}"))
    }

    fn temp_path_for(&self, exam_id: &ExamId) -> PathBuf {
        self.root.join(format!(".{exam_id}.{EXTENSION}.tmp"))
    }
}

#[async_trait]
impl ProgressRepository for JsonDirRepository {
    async fn get_payload(&self, exam_id: &ExamId) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(exam_id)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put_payload(
        &self,
        exam_id: &ExamId,
        payload: &str,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;

        // Write beside the target and rename so readers never see a torn file.
        let temp = self.temp_path_for(exam_id);
        let target = self.path_for(exam_id);
        if let Err(err) = write_then_rename(&temp, &target, payload).await {
            match fs::remove_file(&temp).await {
                Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                    warn!(path = %temp.display(), error = %cleanup, "could not remove temp file");
                }
                _ => {}
            }
            return Err(err.into());
        }
        debug!(path = %target.display(), bytes = payload.len(), "wrote progress document");
        Ok(())
    }

    async fn delete_payload(&self, exam_id: &ExamId) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(exam_id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_exam_ids(&self) -> Result<Vec<ExamId>, StorageError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            // Temp files and foreign names are skipped, not reported.
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| ExamId::new(s).ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

async fn write_then_rename(temp: &Path, target: &Path, payload: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(temp).await?;
    file.write_all(payload.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp, target).await
}

impl Storage {
    /// Build a `Storage` writing one JSON file per exam under `root`.
    #[must_use]
    pub fn json_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            progress: Arc::new(JsonDirRepository::new(root)),
        }
    }
}
