//! Answer recording into the active session and the lifetime record.

use chrono::{DateTime, Utc};

use crate::model::{
    AnswerResult, ChoiceId, CumulativeQuestionProgress, ExamProgress, QuestionId, QuestionResult,
    SessionProgress, SessionQuestionProgress,
};

/// Optional inputs to [`ExamProgress::record_answer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerOptions {
    /// Choices picked on this attempt. `None` keeps the previous selection.
    pub selected_choice_ids: Option<Vec<ChoiceId>>,
    /// Explicit review flag, overriding the result-driven policy.
    pub flag_override: Option<bool>,
}

impl AnswerOptions {
    #[must_use]
    pub fn with_selection(selected: Vec<ChoiceId>) -> Self {
        Self {
            selected_choice_ids: Some(selected),
            flag_override: None,
        }
    }

    #[must_use]
    pub fn flagged(mut self, flag: bool) -> Self {
        self.flag_override = Some(flag);
        self
    }
}

impl SessionProgress {
    fn record(
        &mut self,
        question_id: &QuestionId,
        result: AnswerResult,
        selected: Option<Vec<ChoiceId>>,
        now: DateTime<Utc>,
    ) {
        let previous = self.questions.remove(question_id);
        let (attempts, correct_attempts, previous_selection) = match previous {
            Some(p) => (p.attempts, p.correct_attempts, p.selected_choice_ids),
            None => (0, 0, Vec::new()),
        };

        let entry = SessionQuestionProgress {
            last_result: result,
            answered_at: now,
            attempts: attempts.saturating_add(1),
            correct_attempts: correct_attempts.saturating_add(u32::from(result.is_correct())),
            selected_choice_ids: selected.unwrap_or(previous_selection),
        };
        self.questions.insert(question_id.clone(), entry);
        self.updated_at = now;
    }
}

impl CumulativeQuestionProgress {
    fn record(&mut self, result: AnswerResult, flag_override: Option<bool>, now: DateTime<Utc>) {
        self.last_result = QuestionResult::from(result);
        self.last_answered_at = Some(now);
        self.total_attempts = self.total_attempts.saturating_add(1);
        // Saturation on attempts must never let correct overtake it.
        self.total_correct = self
            .total_correct
            .saturating_add(u32::from(result.is_correct()))
            .min(self.total_attempts);
        self.is_flagged_for_review = match (flag_override, result) {
            (Some(flag), _) => flag,
            (None, AnswerResult::Incorrect) => true,
            (None, AnswerResult::Correct) => self.is_flagged_for_review,
        };
    }
}

impl ExamProgress {
    /// Record one attempt at `question_id`, starting a session if none is active.
    ///
    /// Incorrect answers flag the question for review; correct answers leave the
    /// flag as it was. `options.flag_override` wins over both.
    #[must_use]
    pub fn record_answer(
        self,
        question_id: &QuestionId,
        result: AnswerResult,
        options: AnswerOptions,
        now: DateTime<Utc>,
    ) -> Self {
        let mut progress = self.ensure_active_session(now);
        if let Some(session) = progress.current_session.as_mut() {
            session.record(question_id, result, options.selected_choice_ids, now);
        }
        progress
            .cumulative
            .entry(question_id.clone())
            .or_default()
            .record(result, options.flag_override, now);
        progress.updated_at = now;
        progress
    }

    /// Set the review flag without touching any counter. Works for questions
    /// that were never answered.
    #[must_use]
    pub fn set_review_flag(
        mut self,
        question_id: &QuestionId,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> Self {
        self.cumulative
            .entry(question_id.clone())
            .or_default()
            .is_flagged_for_review = flagged;
        self.updated_at = now;
        self
    }

    /// Flip the review flag; an untouched question becomes flagged.
    #[must_use]
    pub fn toggle_review_flag(self, question_id: &QuestionId, now: DateTime<Utc>) -> Self {
        let flagged = self
            .cumulative
            .get(question_id)
            .is_some_and(|c| c.is_flagged_for_review);
        self.set_review_flag(question_id, !flagged, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamId, SessionNumber};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn fresh() -> ExamProgress {
        ExamProgress::new(ExamId::new("sample").unwrap(), "v1", fixed_now())
    }

    fn q(id: &str) -> QuestionId {
        QuestionId::new(id).unwrap()
    }

    fn choices(raw: &[&str]) -> Vec<ChoiceId> {
        raw.iter().map(|s| ChoiceId::new(*s).unwrap()).collect()
    }

    #[test]
    fn answering_starts_a_session_implicitly() {
        let progress = fresh().record_answer(
            &q("q1"),
            AnswerResult::Correct,
            AnswerOptions::default(),
            fixed_now(),
        );
        let session = progress.current_session().unwrap();
        assert_eq!(session.session_number(), SessionNumber::FIRST);
        assert_eq!(session.question(&q("q1")).unwrap().attempts, 1);
    }

    #[test]
    fn session_entry_counts_attempts_and_keeps_latest() {
        let t1 = fixed_now();
        let t2 = fixed_now() + Duration::minutes(1);
        let progress = fresh()
            .start_session(t1)
            .record_answer(
                &q("q1"),
                AnswerResult::Incorrect,
                AnswerOptions::with_selection(choices(&["A"])),
                t1,
            )
            .record_answer(
                &q("q1"),
                AnswerResult::Correct,
                AnswerOptions::with_selection(choices(&["B"])),
                t2,
            );

        let entry = progress.current_session().unwrap().question(&q("q1")).unwrap();
        assert_eq!(entry.attempts, 2);
        assert_eq!(entry.correct_attempts, 1);
        assert_eq!(entry.last_result, AnswerResult::Correct);
        assert_eq!(entry.answered_at, t2);
        assert_eq!(entry.selected_choice_ids, choices(&["B"]));
        assert_eq!(progress.current_session().unwrap().updated_at(), t2);
        assert_eq!(progress.updated_at(), t2);
    }

    #[test]
    fn omitted_selection_keeps_previous_choices() {
        let progress = fresh()
            .record_answer(
                &q("q1"),
                AnswerResult::Incorrect,
                AnswerOptions::with_selection(choices(&["C"])),
                fixed_now(),
            )
            .record_answer(
                &q("q1"),
                AnswerResult::Incorrect,
                AnswerOptions::default(),
                fixed_now(),
            );
        let entry = progress.current_session().unwrap().question(&q("q1")).unwrap();
        assert_eq!(entry.selected_choice_ids, choices(&["C"]));
    }

    #[test]
    fn incorrect_flags_and_correct_does_not_clear() {
        let progress = fresh()
            .record_answer(&q("q1"), AnswerResult::Incorrect, AnswerOptions::default(), fixed_now())
            .record_answer(&q("q1"), AnswerResult::Correct, AnswerOptions::default(), fixed_now());

        let entry = progress.cumulative_for(&q("q1")).unwrap();
        assert!(entry.is_flagged_for_review);
        assert_eq!(entry.last_result, QuestionResult::Correct);
        assert_eq!(entry.total_attempts, 2);
        assert_eq!(entry.total_correct, 1);

        let cleared = progress.set_review_flag(&q("q1"), false, fixed_now());
        assert!(!cleared.cumulative_for(&q("q1")).unwrap().is_flagged_for_review);
    }

    #[test]
    fn flag_override_beats_result_policy() {
        let progress = fresh().record_answer(
            &q("q1"),
            AnswerResult::Incorrect,
            AnswerOptions::default().flagged(false),
            fixed_now(),
        );
        assert!(!progress.cumulative_for(&q("q1")).unwrap().is_flagged_for_review);

        let progress = progress.record_answer(
            &q("q1"),
            AnswerResult::Correct,
            AnswerOptions::default().flagged(true),
            fixed_now(),
        );
        assert!(progress.cumulative_for(&q("q1")).unwrap().is_flagged_for_review);
    }

    #[test]
    fn cumulative_spans_sessions() {
        let mut progress = fresh();
        for at in 0..3 {
            let now = fixed_now() + Duration::minutes(at);
            if at == 2 {
                progress = progress.complete_current_session(now);
            }
            progress = progress.record_answer(
                &q("q1"),
                AnswerResult::Incorrect,
                AnswerOptions::default(),
                now,
            );
        }

        assert_eq!(progress.session_history().len(), 1);
        let entry = progress.cumulative_for(&q("q1")).unwrap();
        assert_eq!(entry.total_attempts, 3);
        assert_eq!(entry.total_correct, 0);
        assert_eq!(entry.last_result, QuestionResult::Incorrect);
        let active = progress.current_session().unwrap();
        assert_eq!(active.question(&q("q1")).unwrap().attempts, 1);
    }

    #[test]
    fn flagging_unanswered_question_creates_zero_attempt_entry() {
        let progress = fresh().toggle_review_flag(&q("q9"), fixed_now());
        let entry = progress.cumulative_for(&q("q9")).unwrap();
        assert_eq!(entry.total_attempts, 0);
        assert_eq!(entry.last_result, QuestionResult::Unanswered);
        assert!(entry.last_answered_at.is_none());
        assert!(entry.is_flagged_for_review);
        assert!(!progress.has_active_session());

        let toggled = progress.toggle_review_flag(&q("q9"), fixed_now());
        assert!(!toggled.cumulative_for(&q("q9")).unwrap().is_flagged_for_review);
    }

    #[test]
    fn flagging_answered_question_preserves_counters() {
        let answered = fresh().record_answer(
            &q("q1"),
            AnswerResult::Correct,
            AnswerOptions::default(),
            fixed_now(),
        );
        let before = answered.cumulative_for(&q("q1")).unwrap().clone();

        let flagged = answered.toggle_review_flag(&q("q1"), fixed_now() + Duration::minutes(1));
        let after = flagged.cumulative_for(&q("q1")).unwrap();
        assert!(after.is_flagged_for_review);
        assert_eq!(after.total_attempts, before.total_attempts);
        assert_eq!(after.total_correct, before.total_correct);
        assert_eq!(after.last_result, before.last_result);
        assert_eq!(after.last_answered_at, before.last_answered_at);
    }

    #[test]
    fn correct_never_exceeds_attempts() {
        let mut progress = fresh();
        let results = [
            AnswerResult::Correct,
            AnswerResult::Incorrect,
            AnswerResult::Correct,
            AnswerResult::Correct,
        ];
        for (i, result) in results.iter().cycle().take(20).enumerate() {
            let id = q(&format!("q{}", i % 3));
            progress = progress.record_answer(&id, *result, AnswerOptions::default(), fixed_now());
            if i % 7 == 0 {
                progress = progress.start_session(fixed_now());
            }
        }
        assert!(
            progress
                .cumulative()
                .values()
                .all(|c| c.total_correct <= c.total_attempts)
        );
    }
}
