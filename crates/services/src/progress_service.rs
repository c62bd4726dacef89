use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use exam_core::{
    AnswerOptions,
    model::{
        AnswerResult, ChoiceId, ExamProgress, Question, QuestionBank, QuestionId, SessionNumber,
    },
    stats::{CombinedStats, combined_stats, review_question_ids},
    time::Clock,
};
use storage::{InMemoryRepository, ProgressRepository, ProgressStore};

use crate::error::ProgressServiceError;
use crate::history::{ReviewItem, SessionHistoryItem};

//
// ─── ANSWER OUTCOME ────────────────────────────────────────────────────────────
//

/// Result of grading and recording one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub result: AnswerResult,
    pub progress: ExamProgress,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives the progress record of one question bank through storage.
///
/// Every mutating call loads the stored record, applies one transition and
/// writes the result back. Writes are skipped when the transition leaves the
/// record unchanged.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    bank: Arc<QuestionBank>,
    store: ProgressStore,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, bank: Arc<QuestionBank>, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            bank,
            store: ProgressStore::new(repo),
        }
    }

    /// Service over a fresh in-memory repository.
    #[must_use]
    pub fn in_memory(clock: Clock, bank: Arc<QuestionBank>) -> Self {
        Self::new(clock, bank, Arc::new(InMemoryRepository::new()))
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Current progress for the bank.
    ///
    /// Falls back to an empty record when nothing usable is stored or when
    /// the stored record was built against a different bank version.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend cannot be read.
    pub async fn load(&self) -> Result<ExamProgress, ProgressServiceError> {
        let exam_id = &self.bank.exam_id;
        match self.store.load(exam_id).await? {
            Some(progress) if progress.version() == self.bank.version => Ok(progress),
            Some(progress) => {
                info!(
                    %exam_id,
                    stored_version = progress.version(),
                    bank_version = %self.bank.version,
                    "stored progress belongs to another bank version; starting fresh"
                );
                Ok(self.fresh())
            }
            None => Ok(self.fresh()),
        }
    }

    /// Open a new session, archiving the active one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn start_session(&self) -> Result<ExamProgress, ProgressServiceError> {
        let progress = self.apply(ExamProgress::start_session).await?;
        info!(
            exam_id = %progress.exam_id(),
            session_number = %progress.display_session_number(),
            "started session"
        );
        Ok(progress)
    }

    /// Jump back to the active session's last page. Without an active
    /// session the record is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn resume_session(&self) -> Result<ExamProgress, ProgressServiceError> {
        self.apply(ExamProgress::resume_session).await
    }

    /// Remember the page the learner is viewing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn update_page(&self, page: u32) -> Result<ExamProgress, ProgressServiceError> {
        self.apply(|progress, now| progress.update_session_page(page, now))
            .await
    }

    /// Finish the active session and move it to the history.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn complete_session(&self) -> Result<ExamProgress, ProgressServiceError> {
        let before = self.load().await?.current_session().map(|s| s.session_number());
        let progress = self.apply(ExamProgress::complete_current_session).await?;
        if let Some(session_number) = before {
            info!(exam_id = %progress.exam_id(), %session_number, "completed session");
        }
        Ok(progress)
    }

    /// Grade `selected` against the bank and record the outcome.
    ///
    /// Repeated choice ids count once; the first occurrence keeps its place.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuestion` or `UnknownChoice` when an id is not in the
    /// bank, `EmptySelection` when nothing is selected and `Storage` if
    /// loading or saving fails.
    pub async fn answer(
        &self,
        question_id: &QuestionId,
        mut selected: Vec<ChoiceId>,
    ) -> Result<AnswerOutcome, ProgressServiceError> {
        let question = self.question(question_id)?;
        let mut seen = HashSet::with_capacity(selected.len());
        selected.retain(|choice| seen.insert(choice.clone()));
        if selected.is_empty() {
            return Err(ProgressServiceError::EmptySelection(question_id.clone()));
        }
        if let Some(unknown) = selected
            .iter()
            .find(|choice| !question.choices.iter().any(|c| &c.id == *choice))
        {
            return Err(ProgressServiceError::UnknownChoice {
                question: question_id.clone(),
                choice: unknown.clone(),
            });
        }

        let result = question.grade(&selected);
        let progress = self
            .record_result(question_id, result, AnswerOptions::with_selection(selected))
            .await?;
        Ok(AnswerOutcome { result, progress })
    }

    /// Record an already graded result for `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuestion` when the id is not in the bank and `Storage`
    /// if loading or saving fails.
    pub async fn record_result(
        &self,
        question_id: &QuestionId,
        result: AnswerResult,
        options: AnswerOptions,
    ) -> Result<ExamProgress, ProgressServiceError> {
        self.question(question_id)?;
        let progress = self
            .apply(|progress, now| progress.record_answer(question_id, result, options, now))
            .await?;
        debug!(
            exam_id = %progress.exam_id(),
            session_number = %progress.display_session_number(),
            %question_id,
            correct = result.is_correct(),
            "recorded answer"
        );
        Ok(progress)
    }

    /// Set the lifetime review flag for `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuestion` when the id is not in the bank and `Storage`
    /// if loading or saving fails.
    pub async fn set_review_flag(
        &self,
        question_id: &QuestionId,
        flagged: bool,
    ) -> Result<ExamProgress, ProgressServiceError> {
        self.question(question_id)?;
        self.apply(|progress, now| progress.set_review_flag(question_id, flagged, now))
            .await
    }

    /// Invert the lifetime review flag for `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuestion` when the id is not in the bank and `Storage`
    /// if loading or saving fails.
    pub async fn toggle_review_flag(
        &self,
        question_id: &QuestionId,
    ) -> Result<ExamProgress, ProgressServiceError> {
        self.question(question_id)?;
        self.apply(|progress, now| progress.toggle_review_flag(question_id, now))
            .await
    }

    /// Session and lifetime statistics over the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend cannot be read.
    pub async fn stats(&self) -> Result<CombinedStats, ProgressServiceError> {
        let progress = self.load().await?;
        Ok(combined_stats(&progress, self.bank.total_questions()))
    }

    /// Archived sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend cannot be read.
    pub async fn history(&self) -> Result<Vec<SessionHistoryItem>, ProgressServiceError> {
        let progress = self.load().await?;
        let total = self.bank.total_questions();
        Ok(progress
            .session_history()
            .iter()
            .map(|session| SessionHistoryItem::from_session(session, total))
            .collect())
    }

    /// Delete one archived session. Lifetime records are kept.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if loading or saving fails.
    pub async fn remove_session(
        &self,
        session_number: SessionNumber,
    ) -> Result<ExamProgress, ProgressServiceError> {
        let progress = self
            .apply(|progress, now| progress.remove_session_from_history(session_number, now))
            .await?;
        info!(exam_id = %progress.exam_id(), %session_number, "removed session from history");
        Ok(progress)
    }

    /// Questions that are flagged or were last answered wrong, in bank order.
    ///
    /// Lifetime records for questions no longer in the bank are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend cannot be read.
    pub async fn review_queue(&self) -> Result<Vec<ReviewItem>, ProgressServiceError> {
        let progress = self.load().await?;
        let pending: Vec<&QuestionId> = review_question_ids(&progress).collect();
        Ok(self
            .bank
            .questions
            .iter()
            .filter(|question| pending.contains(&&question.id))
            .filter_map(|question| {
                progress.cumulative_for(&question.id).map(|record| ReviewItem {
                    question_id: question.id.clone(),
                    progress: record.clone(),
                })
            })
            .collect())
    }

    /// Drop all stored progress for the bank. Returns whether any existed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the delete fails.
    pub async fn reset(&self) -> Result<bool, ProgressServiceError> {
        Ok(self.store.clear(&self.bank.exam_id).await?)
    }

    fn fresh(&self) -> ExamProgress {
        ExamProgress::new(
            self.bank.exam_id.clone(),
            self.bank.version.clone(),
            self.clock.now(),
        )
    }

    fn question(&self, question_id: &QuestionId) -> Result<&Question, ProgressServiceError> {
        self.bank
            .question(question_id)
            .ok_or_else(|| ProgressServiceError::UnknownQuestion(question_id.clone()))
    }

    async fn apply<F>(&self, op: F) -> Result<ExamProgress, ProgressServiceError>
    where
        F: FnOnce(ExamProgress, DateTime<Utc>) -> ExamProgress,
    {
        let current = self.load().await?;
        let next = op(current.clone(), self.clock.now());
        if next != current {
            self.store.save(&next).await?;
        }
        Ok(next)
    }
}
