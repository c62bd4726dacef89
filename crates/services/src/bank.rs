use std::path::Path;

use exam_core::model::QuestionBank;
use tracing::info;

use crate::error::ProgressServiceError;

/// Read and validate a question bank document from disk.
///
/// # Errors
///
/// Returns `ProgressServiceError::BankRead` if the file cannot be read and
/// `ProgressServiceError::Core` if the document is malformed or breaks an
/// authoring rule.
pub async fn load_bank(path: &Path) -> Result<QuestionBank, ProgressServiceError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ProgressServiceError::BankRead {
            path: path.to_path_buf(),
            source,
        })?;
    let bank = QuestionBank::from_json(&raw).map_err(exam_core::Error::from)?;
    info!(
        exam_id = %bank.exam_id,
        version = %bank.version,
        questions = bank.total_questions(),
        "loaded question bank"
    );
    Ok(bank)
}
