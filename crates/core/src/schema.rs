//! Schema gate for persisted progress payloads.
//!
//! Two shapes are recognised:
//! - current: `examId`, `version`, `nextSessionNumber`, `sessionHistory`,
//!   `cumulative` (plus an optional `currentSession`);
//! - legacy: a single `questions` map of lifetime per-question progress with
//!   no sessions. It is migrated by [`migrate_legacy`].
//!
//! Anything else, or anything that breaks the record invariants, is
//! `Validation::Invalid`. Callers treat invalid payloads as "no progress".

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{
    CumulativeQuestionProgress, ExamId, ExamProgress, QuestionId, QuestionResult, SessionNumber,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload matches neither the current nor the legacy progress shape")]
    UnknownShape,

    #[error("field `{field}` is missing or is not {expected}")]
    Field {
        field: &'static str,
        expected: &'static str,
    },

    #[error("payload does not deserialize as progress: {0}")]
    Shape(String),

    #[error("nextSessionNumber {next} is not above session {seen}")]
    SessionNumberBehind { next: u32, seen: u32 },

    #[error("session number {0} appears more than once")]
    DuplicateSession(u32),

    #[error("archived session {0} has no completion timestamp")]
    ArchivedWithoutCompletion(u32),

    #[error("active session {0} already has a completion timestamp")]
    ActiveWithCompletion(u32),

    #[error("question {question}: {reason}")]
    Counters {
        question: QuestionId,
        reason: &'static str,
    },
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Outcome of validating an arbitrary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Already in the current shape.
    Current(ExamProgress),
    /// Legacy shape, converted to the current one.
    Migrated(ExamProgress),
    Invalid(SchemaError),
}

impl Validation {
    /// The usable record, if any.
    #[must_use]
    pub fn into_progress(self) -> Option<ExamProgress> {
        match self {
            Self::Current(progress) | Self::Migrated(progress) => Some(progress),
            Self::Invalid(_) => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

impl From<Result<ExamProgress, SchemaError>> for Validation {
    fn from(result: Result<ExamProgress, SchemaError>) -> Self {
        match result {
            Ok(progress) => Self::Current(progress),
            Err(err) => Self::Invalid(err),
        }
    }
}

//
// ─── ENTRY POINTS ──────────────────────────────────────────────────────────────
//

/// Parse and validate a raw stored payload.
#[must_use]
pub fn validate_str(payload: &str) -> Validation {
    if payload.trim().is_empty() {
        return Validation::Invalid(SchemaError::Empty);
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => validate(&value),
        Err(err) => Validation::Invalid(SchemaError::Json(err.to_string())),
    }
}

/// Validate an already-parsed payload.
#[must_use]
pub fn validate(value: &Value) -> Validation {
    let Some(object) = value.as_object() else {
        return Validation::Invalid(SchemaError::NotAnObject);
    };

    if is_current_shape(object) {
        validate_current(object, value).into()
    } else if object.contains_key("questions") {
        match migrate_legacy(value) {
            Ok(progress) => Validation::Migrated(progress),
            Err(err) => Validation::Invalid(err),
        }
    } else {
        Validation::Invalid(SchemaError::UnknownShape)
    }
}

/// Check the record invariants that serde alone cannot express.
///
/// # Errors
///
/// Returns the first violated invariant.
pub fn check_invariants(progress: &ExamProgress) -> Result<(), SchemaError> {
    let next = progress.next_session_number();
    let mut seen = HashSet::new();
    let sessions = progress
        .current_session()
        .into_iter()
        .chain(progress.session_history());

    for session in sessions {
        let number = session.session_number();
        if number >= next {
            return Err(SchemaError::SessionNumberBehind {
                next: next.value(),
                seen: number.value(),
            });
        }
        if !seen.insert(number) {
            return Err(SchemaError::DuplicateSession(number.value()));
        }
        for (question, entry) in session.questions() {
            if entry.correct_attempts > entry.attempts || entry.attempts == 0 {
                return Err(SchemaError::Counters {
                    question: question.clone(),
                    reason: "session attempts are inconsistent",
                });
            }
        }
    }

    if let Some(active) = progress.current_session().filter(|s| s.is_completed()) {
        return Err(SchemaError::ActiveWithCompletion(active.session_number().value()));
    }

    if let Some(unfinished) = progress
        .session_history()
        .iter()
        .find(|s| !s.is_completed())
    {
        return Err(SchemaError::ArchivedWithoutCompletion(
            unfinished.session_number().value(),
        ));
    }

    for (question, entry) in progress.cumulative() {
        check_cumulative(question, entry)?;
    }
    Ok(())
}

//
// ─── CURRENT SHAPE ─────────────────────────────────────────────────────────────
//

fn is_current_shape(object: &Map<String, Value>) -> bool {
    ["nextSessionNumber", "sessionHistory", "cumulative"]
        .iter()
        .any(|key| object.contains_key(*key))
}

fn validate_current(
    object: &Map<String, Value>,
    value: &Value,
) -> Result<ExamProgress, SchemaError> {
    require(object, "examId", Value::is_string, "a string")?;
    require(object, "version", Value::is_string, "a string")?;
    require(object, "nextSessionNumber", Value::is_number, "a number")?;
    require(object, "sessionHistory", Value::is_array, "an array")?;
    require(object, "cumulative", Value::is_object, "an object")?;

    let progress =
        ExamProgress::deserialize(value).map_err(|err| SchemaError::Shape(err.to_string()))?;
    check_invariants(&progress)?;
    Ok(progress)
}

fn require(
    object: &Map<String, Value>,
    field: &'static str,
    kind: fn(&Value) -> bool,
    expected: &'static str,
) -> Result<(), SchemaError> {
    match object.get(field) {
        Some(value) if kind(value) => Ok(()),
        _ => Err(SchemaError::Field { field, expected }),
    }
}

fn check_cumulative(
    question: &QuestionId,
    entry: &CumulativeQuestionProgress,
) -> Result<(), SchemaError> {
    let reason = if entry.total_correct > entry.total_attempts {
        Some("totalCorrect exceeds totalAttempts")
    } else if (entry.last_result == QuestionResult::Unanswered) != (entry.total_attempts == 0) {
        Some("lastResult disagrees with totalAttempts")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SchemaError::Counters {
            question: question.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

//
// ─── LEGACY SHAPE ──────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyProgress {
    exam_id: ExamId,
    version: String,
    updated_at: DateTime<Utc>,
    questions: BTreeMap<QuestionId, LegacyQuestionProgress>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyQuestionProgress {
    last_result: QuestionResult,
    #[serde(default)]
    answered_at: Option<DateTime<Utc>>,
    attempts: u32,
    correct_attempts: u32,
    #[serde(default)]
    is_flagged_for_review: bool,
}

impl From<LegacyQuestionProgress> for CumulativeQuestionProgress {
    fn from(legacy: LegacyQuestionProgress) -> Self {
        Self {
            last_result: legacy.last_result,
            last_answered_at: legacy.answered_at,
            total_attempts: legacy.attempts,
            total_correct: legacy.correct_attempts,
            is_flagged_for_review: legacy.is_flagged_for_review,
        }
    }
}

/// Convert a legacy single-map record into the current shape.
///
/// Per-question lifetime counters carry over into `cumulative`; the legacy
/// format had no sessions, so history is empty and numbering starts at 1.
///
/// # Errors
///
/// Returns `SchemaError` if the value is not a well-formed legacy record or
/// the converted record breaks an invariant.
pub fn migrate_legacy(value: &Value) -> Result<ExamProgress, SchemaError> {
    let legacy =
        LegacyProgress::deserialize(value).map_err(|err| SchemaError::Shape(err.to_string()))?;

    let progress = ExamProgress {
        exam_id: legacy.exam_id,
        version: legacy.version,
        updated_at: legacy.updated_at,
        next_session_number: SessionNumber::FIRST,
        current_session: None,
        session_history: Vec::new(),
        cumulative: legacy
            .questions
            .into_iter()
            .map(|(id, q)| (id, CumulativeQuestionProgress::from(q)))
            .collect(),
    };
    check_invariants(&progress)?;
    Ok(progress)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
