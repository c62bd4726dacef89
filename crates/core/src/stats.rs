//! Read-only metrics over a progress snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{
    AnswerResult, CumulativeQuestionProgress, ExamProgress, QuestionId, QuestionResult,
    SessionProgress,
};

/// Counts and accuracy for one scope (a session, or the whole record).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub answered_count: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub unanswered_count: usize,
    pub flagged_count: usize,
    /// Percentage in `0.0..=100.0`.
    pub correct_rate: f64,
}

/// Active-session stats (if a session is active) next to lifetime stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombinedStats {
    pub session: Option<ProgressStats>,
    pub cumulative: ProgressStats,
}

/// Stats for one session, active or archived.
///
/// The flagged count equals the incorrect count: sessions do not store flags.
#[must_use]
pub fn session_stats(session: &SessionProgress, total_questions: usize) -> ProgressStats {
    let answered_count = session.questions().len();
    let correct_count = session
        .questions()
        .values()
        .filter(|q| q.last_result == AnswerResult::Correct)
        .count();
    let incorrect_count = answered_count - correct_count;

    ProgressStats {
        answered_count,
        correct_count,
        incorrect_count,
        unanswered_count: total_questions.saturating_sub(answered_count),
        flagged_count: incorrect_count,
        correct_rate: percentage(correct_count as u64, answered_count as u64),
    }
}

/// Lifetime stats. Accuracy is weighted by attempts, not by questions.
#[must_use]
pub fn cumulative_stats(
    cumulative: &BTreeMap<QuestionId, CumulativeQuestionProgress>,
    total_questions: usize,
) -> ProgressStats {
    let mut stats = ProgressStats::default();
    let mut total_attempts = 0_u64;
    let mut total_correct = 0_u64;

    for entry in cumulative.values() {
        total_attempts += u64::from(entry.total_attempts);
        total_correct += u64::from(entry.total_correct);
        if entry.is_flagged_for_review {
            stats.flagged_count += 1;
        }
        if entry.total_attempts == 0 {
            continue;
        }
        stats.answered_count += 1;
        match entry.last_result {
            QuestionResult::Correct => stats.correct_count += 1,
            QuestionResult::Incorrect => stats.incorrect_count += 1,
            QuestionResult::Unanswered => {}
        }
    }

    stats.unanswered_count = total_questions.saturating_sub(stats.answered_count);
    stats.correct_rate = percentage(total_correct, total_attempts);
    stats
}

#[must_use]
pub fn combined_stats(progress: &ExamProgress, total_questions: usize) -> CombinedStats {
    CombinedStats {
        session: progress
            .current_session()
            .map(|s| session_stats(s, total_questions)),
        cumulative: cumulative_stats(progress.cumulative(), total_questions),
    }
}

/// Questions due for review: flagged, or last answered incorrectly.
pub fn review_question_ids(progress: &ExamProgress) -> impl Iterator<Item = &QuestionId> {
    progress
        .cumulative()
        .iter()
        .filter(|(_, c)| c.is_flagged_for_review || c.last_result == QuestionResult::Incorrect)
        .map(|(id, _)| id)
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
