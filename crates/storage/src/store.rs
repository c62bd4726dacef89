use std::sync::Arc;

use exam_core::Validation;
use exam_core::model::{ExamId, ExamProgress};
use exam_core::schema;
use tracing::{debug, info, warn};

use crate::repository::{ProgressRepository, Storage, StorageError};

/// Typed `load`/`save`/`clear` over a raw `ProgressRepository`.
///
/// `load` never fails because of what is stored: empty, unparsable or
/// schema-invalid documents come back as `None`. Backend failures still
/// surface as `StorageError`.
#[derive(Clone)]
pub struct ProgressStore {
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(repo: Arc<dyn ProgressRepository>) -> Self {
        Self { repo }
    }

    /// Load the stored record for `exam_id`, if a usable one exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend cannot be read.
    pub async fn load(&self, exam_id: &ExamId) -> Result<Option<ExamProgress>, StorageError> {
        let Some(payload) = self.repo.get_payload(exam_id).await? else {
            debug!(%exam_id, "no stored progress");
            return Ok(None);
        };

        let progress = match schema::validate_str(&payload) {
            Validation::Current(progress) => progress,
            Validation::Migrated(progress) => {
                info!(%exam_id, "migrated legacy progress record");
                progress
            }
            Validation::Invalid(reason) => {
                warn!(%exam_id, %reason, "discarding unusable stored progress");
                return Ok(None);
            }
        };

        if progress.exam_id() != exam_id {
            warn!(
                %exam_id,
                stored = %progress.exam_id(),
                "discarding progress stored under another exam id"
            );
            return Ok(None);
        }
        Ok(Some(progress))
    }

    /// Overwrite the stored record with `progress`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub async fn save(&self, progress: &ExamProgress) -> Result<(), StorageError> {
        let payload = serde_json::to_string(progress)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.repo
            .put_payload(progress.exam_id(), &payload, progress.updated_at())
            .await?;
        debug!(
            exam_id = %progress.exam_id(),
            next_session = %progress.next_session_number(),
            "saved progress"
        );
        Ok(())
    }

    /// Delete the stored record. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    pub async fn clear(&self, exam_id: &ExamId) -> Result<bool, StorageError> {
        let existed = self.repo.delete_payload(exam_id).await?;
        info!(%exam_id, existed, "cleared progress");
        Ok(existed)
    }

    /// Exams with a stored document, usable or not.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn exam_ids(&self) -> Result<Vec<ExamId>, StorageError> {
        self.repo.list_exam_ids().await
    }
}

impl Storage {
    #[must_use]
    pub fn store(&self) -> ProgressStore {
        ProgressStore::new(Arc::clone(&self.progress))
    }
}
