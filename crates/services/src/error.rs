//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use exam_core::model::{ChoiceId, QuestionId};
use storage::StorageError;

/// Errors emitted by `ProgressService` and bank loading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("question {0} is not in the question bank")]
    UnknownQuestion(QuestionId),
    #[error("question {question} has no choice {choice}")]
    UnknownChoice {
        question: QuestionId,
        choice: ChoiceId,
    },
    #[error("no choice selected for question {0}")]
    EmptySelection(QuestionId),
    #[error("failed to read question bank {}: {source}", .path.display())]
    BankRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Core(#[from] exam_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
