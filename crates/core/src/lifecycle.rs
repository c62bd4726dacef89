//! Session state machine over the record's active-session slot.
//!
//! Two states: no active session, or exactly one active session. Every
//! transition consumes the record and returns the next one. Calls that need an
//! active session hand the record back unchanged when there is none.

use chrono::{DateTime, Utc};

use crate::model::{ExamProgress, SessionNumber, SessionProgress};

impl SessionProgress {
    /// Stamp completion (keeping an earlier stamp) ahead of archiving.
    fn finalized(mut self, now: DateTime<Utc>) -> Self {
        self.updated_at = now;
        self.completed_at.get_or_insert(now);
        self
    }
}

impl ExamProgress {
    /// Open a new session numbered `next_session_number`.
    ///
    /// An already active session is finalized and archived first. Once the
    /// session counter is exhausted the record is returned unchanged.
    #[must_use]
    pub fn start_session(mut self, now: DateTime<Utc>) -> Self {
        let number = self.next_session_number;
        let Some(following) = number.checked_next() else {
            return self;
        };
        self.archive_active(now);

        self.current_session = Some(SessionProgress::open(number, now));
        self.next_session_number = following;
        self.updated_at = now;
        self
    }

    /// Start a session only if none is active.
    #[must_use]
    pub fn ensure_active_session(self, now: DateTime<Utc>) -> Self {
        if self.current_session.is_some() {
            self
        } else {
            self.start_session(now)
        }
    }

    /// Archive the active session at the front of history.
    #[must_use]
    pub fn complete_current_session(mut self, now: DateTime<Utc>) -> Self {
        if self.archive_active(now) {
            self.updated_at = now;
        }
        self
    }

    /// Record the page the learner is viewing in the active session.
    #[must_use]
    pub fn update_session_page(mut self, page: u32, now: DateTime<Utc>) -> Self {
        let Some(session) = self.current_session.as_mut() else {
            return self;
        };
        session.last_page = Some(page);
        session.updated_at = now;
        self.updated_at = now;
        self
    }

    /// Page to reopen the active session at, if one is active.
    #[must_use]
    pub fn resume_page(&self) -> Option<u32> {
        self.current_session
            .as_ref()
            .map(|s| s.last_page.unwrap_or(SessionProgress::FIRST_PAGE))
    }

    /// Jump back to the active session's last viewed page.
    #[must_use]
    pub fn resume_session(self, now: DateTime<Utc>) -> Self {
        match self.resume_page() {
            Some(page) => self.update_session_page(page, now),
            None => self,
        }
    }

    /// Delete an archived session. The active session, the cumulative map and
    /// session numbering are untouched.
    #[must_use]
    pub fn remove_session_from_history(
        mut self,
        number: SessionNumber,
        now: DateTime<Utc>,
    ) -> Self {
        let before = self.session_history.len();
        self.session_history.retain(|s| s.session_number != number);
        if self.session_history.len() != before {
            self.updated_at = now;
        }
        self
    }

    fn archive_active(&mut self, now: DateTime<Utc>) -> bool {
        match self.current_session.take() {
            Some(active) => {
                self.session_history.insert(0, active.finalized(now));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn fresh() -> ExamProgress {
        ExamProgress::new(ExamId::new("sample").unwrap(), "v1", fixed_now())
    }

    #[test]
    fn start_opens_session_on_first_page() {
        let now = fixed_now() + Duration::minutes(1);
        let progress = fresh().start_session(now);

        let session = progress.current_session().unwrap();
        assert_eq!(session.session_number(), SessionNumber::FIRST);
        assert_eq!(session.started_at(), now);
        assert_eq!(session.updated_at(), now);
        assert_eq!(session.last_page(), Some(1));
        assert!(session.questions().is_empty());
        assert!(!session.is_completed());
        assert_eq!(progress.next_session_number(), SessionNumber::new(2));
        assert_eq!(progress.updated_at(), now);
    }

    #[test]
    fn start_archives_previous_active_session() {
        let later = fixed_now() + Duration::hours(1);
        let progress = fresh().start_session(fixed_now()).start_session(later);

        assert_eq!(
            progress.current_session().unwrap().session_number(),
            SessionNumber::new(2)
        );
        assert_eq!(progress.session_history().len(), 1);
        let archived = &progress.session_history()[0];
        assert_eq!(archived.session_number(), SessionNumber::FIRST);
        assert_eq!(archived.completed_at(), Some(later));
    }

    #[test]
    fn session_numbers_strictly_increase() {
        let mut progress = fresh();
        let mut seen = Vec::new();
        for _ in 0..5 {
            progress = progress.start_session(fixed_now());
            seen.push(progress.current_session().unwrap().session_number());
            progress = progress.complete_current_session(fixed_now());
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(progress.next_session_number(), SessionNumber::new(6));
    }

    #[test]
    fn exhausted_counter_leaves_record_unchanged() {
        let mut exhausted = fresh();
        exhausted.next_session_number = SessionNumber::new(u32::MAX);

        let after = exhausted.clone().start_session(fixed_now() + Duration::hours(1));
        assert_eq!(after, exhausted);

        let payload = serde_json::to_string(&after).unwrap();
        assert_eq!(
            crate::schema::validate_str(&payload),
            crate::Validation::Current(exhausted)
        );
    }

    #[test]
    fn ensure_active_is_idempotent() {
        let once = fresh().ensure_active_session(fixed_now());
        let twice = once.clone().ensure_active_session(fixed_now() + Duration::hours(1));
        assert_eq!(once, twice);
    }

    #[test]
    fn complete_prepends_to_history_and_is_idempotent() {
        let done = fixed_now() + Duration::minutes(30);
        let progress = fresh()
            .start_session(fixed_now())
            .complete_current_session(fixed_now() + Duration::minutes(10))
            .start_session(fixed_now() + Duration::minutes(20))
            .complete_current_session(done);

        let numbers: Vec<_> = progress
            .session_history()
            .iter()
            .map(|s| s.session_number().value())
            .collect();
        assert_eq!(numbers, vec![2, 1]);
        assert!(!progress.has_active_session());

        let again = progress.clone().complete_current_session(done + Duration::hours(1));
        assert_eq!(again, progress);
    }

    #[test]
    fn page_updates_require_active_session() {
        let untouched = fresh().update_session_page(4, fixed_now() + Duration::hours(1));
        assert_eq!(untouched, fresh());
        assert_eq!(untouched.resume_page(), None);

        let later = fixed_now() + Duration::minutes(3);
        let progress = fresh().start_session(fixed_now()).update_session_page(4, later);
        let session = progress.current_session().unwrap();
        assert_eq!(session.last_page(), Some(4));
        assert_eq!(session.updated_at(), later);
        assert_eq!(progress.resume_page(), Some(4));
    }

    #[test]
    fn resume_keeps_page_and_refreshes_timestamp() {
        let later = fixed_now() + Duration::hours(2);
        let progress = fresh()
            .start_session(fixed_now())
            .update_session_page(3, fixed_now())
            .resume_session(later);
        let session = progress.current_session().unwrap();
        assert_eq!(session.last_page(), Some(3));
        assert_eq!(session.updated_at(), later);

        assert_eq!(fresh().resume_session(later), fresh());
    }

    #[test]
    fn removing_history_keeps_numbering() {
        let progress = fresh()
            .start_session(fixed_now())
            .complete_current_session(fixed_now())
            .start_session(fixed_now());

        let removed = progress
            .clone()
            .remove_session_from_history(SessionNumber::FIRST, fixed_now());
        assert!(removed.session_history().is_empty());
        assert!(removed.has_active_session());
        assert_eq!(removed.next_session_number(), SessionNumber::new(3));

        let unknown = progress
            .clone()
            .remove_session_from_history(SessionNumber::new(9), fixed_now() + Duration::hours(1));
        assert_eq!(unknown, progress);
    }
}
