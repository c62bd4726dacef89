use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ChoiceId, ExamId, QuestionId, SessionNumber};

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Outcome of a single attempt at a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerResult {
    Correct,
    Incorrect,
}

impl AnswerResult {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Lifetime state of a question: like `AnswerResult` plus "never answered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionResult {
    Correct,
    Incorrect,
    #[default]
    Unanswered,
}

impl From<AnswerResult> for QuestionResult {
    fn from(result: AnswerResult) -> Self {
        match result {
            AnswerResult::Correct => Self::Correct,
            AnswerResult::Incorrect => Self::Incorrect,
        }
    }
}

//
// ─── PER-QUESTION RECORDS ──────────────────────────────────────────────────────
//

/// Progress on one question within one session.
///
/// Only exists once the question was answered at least once in that session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuestionProgress {
    pub last_result: AnswerResult,
    pub answered_at: DateTime<Utc>,
    pub attempts: u32,
    pub correct_attempts: u32,
    #[serde(default)]
    pub selected_choice_ids: Vec<ChoiceId>,
}

/// Progress on one question across every session of the record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeQuestionProgress {
    pub last_result: QuestionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_answered_at: Option<DateTime<Utc>>,
    pub total_attempts: u32,
    pub total_correct: u32,
    pub is_flagged_for_review: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One study session, active or archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub(crate) session_number: SessionNumber,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) last_page: Option<u32>,
    #[serde(default)]
    pub(crate) questions: BTreeMap<QuestionId, SessionQuestionProgress>,
}

impl SessionProgress {
    /// The first page of a session, used when no page was recorded.
    pub const FIRST_PAGE: u32 = 1;

    pub(crate) fn open(session_number: SessionNumber, now: DateTime<Utc>) -> Self {
        Self {
            session_number,
            started_at: now,
            updated_at: now,
            completed_at: None,
            last_page: Some(Self::FIRST_PAGE),
            questions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn session_number(&self) -> SessionNumber {
        self.session_number
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn last_page(&self) -> Option<u32> {
        self.last_page
    }

    #[must_use]
    pub fn questions(&self) -> &BTreeMap<QuestionId, SessionQuestionProgress> {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&SessionQuestionProgress> {
        self.questions.get(id)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

//
// ─── ROOT RECORD ───────────────────────────────────────────────────────────────
//

/// Everything persisted for one exam: the active session, archived sessions
/// (most recent first) and the lifetime per-question record.
///
/// State transitions take the record by value and hand back the next one; see
/// the `lifecycle` and `recorder` modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamProgress {
    pub(crate) exam_id: ExamId,
    pub(crate) version: String,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) next_session_number: SessionNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current_session: Option<SessionProgress>,
    pub(crate) session_history: Vec<SessionProgress>,
    pub(crate) cumulative: BTreeMap<QuestionId, CumulativeQuestionProgress>,
}

impl ExamProgress {
    /// A fresh record with no sessions and no answers.
    #[must_use]
    pub fn new(exam_id: ExamId, version: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            exam_id,
            version: version.into(),
            updated_at: now,
            next_session_number: SessionNumber::FIRST,
            current_session: None,
            session_history: Vec::new(),
            cumulative: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    /// Version string of the question bank this record was built against.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn next_session_number(&self) -> SessionNumber {
        self.next_session_number
    }

    #[must_use]
    pub fn current_session(&self) -> Option<&SessionProgress> {
        self.current_session.as_ref()
    }

    #[must_use]
    pub fn has_active_session(&self) -> bool {
        self.current_session.is_some()
    }

    #[must_use]
    pub fn session_history(&self) -> &[SessionProgress] {
        &self.session_history
    }

    #[must_use]
    pub fn archived_session(&self, number: SessionNumber) -> Option<&SessionProgress> {
        self.session_history
            .iter()
            .find(|s| s.session_number == number)
    }

    #[must_use]
    pub fn cumulative(&self) -> &BTreeMap<QuestionId, CumulativeQuestionProgress> {
        &self.cumulative
    }

    #[must_use]
    pub fn cumulative_for(&self, id: &QuestionId) -> Option<&CumulativeQuestionProgress> {
        self.cumulative.get(id)
    }

    /// Number the active session is using, or the one the next start will use.
    #[must_use]
    pub fn display_session_number(&self) -> SessionNumber {
        self.current_session
            .as_ref()
            .map_or(self.next_session_number, |s| s.session_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn fresh_record_serializes_with_camel_case_fields() {
        let progress = ExamProgress::new(ExamId::new("sample").unwrap(), "v1", fixed_now());
        let value = serde_json::to_value(&progress).unwrap();

        assert_eq!(value["examId"], "sample");
        assert_eq!(value["version"], "v1");
        assert_eq!(value["nextSessionNumber"], 1);
        assert_eq!(value["sessionHistory"], serde_json::json!([]));
        assert_eq!(value["cumulative"], serde_json::json!({}));
        assert!(value.get("currentSession").is_none());
    }

    #[test]
    fn cumulative_default_is_unanswered() {
        let entry = CumulativeQuestionProgress::default();
        assert_eq!(entry.last_result, QuestionResult::Unanswered);
        assert_eq!(entry.total_attempts, 0);
        assert!(!entry.is_flagged_for_review);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["lastResult"], "unanswered");
        assert!(value.get("lastAnsweredAt").is_none());
    }

    #[test]
    fn display_number_tracks_active_session() {
        let progress = ExamProgress::new(ExamId::new("sample").unwrap(), "v1", fixed_now());
        assert_eq!(progress.display_session_number(), SessionNumber::FIRST);

        let progress = progress.start_session(fixed_now());
        assert_eq!(progress.display_session_number(), SessionNumber::FIRST);
        assert_eq!(progress.next_session_number(), SessionNumber::new(2));
    }
}
