use chrono::{DateTime, Utc};

use exam_core::model::{CumulativeQuestionProgress, QuestionId, SessionNumber, SessionProgress};
use exam_core::stats::{ProgressStats, session_stats};

/// Presentation-agnostic list item for an archived session.
///
/// No pre-formatted strings; the caller formats timestamps and rates.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHistoryItem {
    pub session_number: SessionNumber,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: ProgressStats,
}

impl SessionHistoryItem {
    #[must_use]
    pub fn from_session(session: &SessionProgress, total_questions: usize) -> Self {
        Self {
            session_number: session.session_number(),
            started_at: session.started_at(),
            completed_at: session.completed_at(),
            stats: session_stats(session, total_questions),
        }
    }
}

/// A question waiting for review, with its lifetime record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub question_id: QuestionId,
    pub progress: CumulativeQuestionProgress,
}
