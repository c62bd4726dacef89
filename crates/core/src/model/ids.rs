use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a raw string cannot be used as an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    #[error("{kind} contains unsupported character {ch:?}")]
    InvalidChar { kind: &'static str, ch: char },

    #[error("{kind} cannot start with '.'")]
    LeadingDot { kind: &'static str },
}

/// Identifier of an exam (question bank) and of its persisted progress record.
///
/// Restricted to ASCII alphanumerics plus `-`, `_` and `.` so it can double as
/// a storage key or file stem.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExamId(String);

impl ExamId {
    /// Creates a new `ExamId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the value is empty, starts with a dot, or contains
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::Empty { kind: "ExamId" });
        }
        if raw.starts_with('.') {
            return Err(IdError::LeadingDot { kind: "ExamId" });
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(IdError::InvalidChar { kind: "ExamId", ch });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a question inside a bank.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the value is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(IdError::Empty { kind: "QuestionId" });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a choice within a single question (`A`, `B`, ...).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChoiceId(String);

impl ChoiceId {
    /// Creates a new `ChoiceId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the value is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(IdError::Empty { kind: "ChoiceId" });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sequence number of a study session within one exam's progress record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionNumber(u32);

impl SessionNumber {
    /// The number handed to the first session of a fresh record.
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the number that follows this one, or `None` once the counter
    /// is exhausted.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl TryFrom<String> for ExamId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for QuestionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ChoiceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExamId> for String {
    fn from(id: ExamId) -> Self {
        id.0
    }
}

impl From<QuestionId> for String {
    fn from(id: QuestionId) -> Self {
        id.0
    }
}

impl From<ChoiceId> for String {
    fn from(id: ChoiceId) -> Self {
        id.0
    }
}

impl FromStr for ExamId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for QuestionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ChoiceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Debug / Display ───────────────────────────────────────────────────────────

impl fmt::Debug for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExamId({:?})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({:?})", self.0)
    }
}

impl fmt::Debug for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChoiceId({:?})", self.0)
    }
}

impl fmt::Debug for SessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionNumber({})", self.0)
    }
}

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_id_accepts_file_stem_characters() {
        let id = ExamId::new("aws-saa_c03.v2").unwrap();
        assert_eq!(id.as_str(), "aws-saa_c03.v2");
        assert_eq!(id.to_string(), "aws-saa_c03.v2");
    }

    #[test]
    fn exam_id_rejects_path_separators() {
        let err = ExamId::new("../escape").unwrap_err();
        assert!(matches!(err, IdError::LeadingDot { .. }));

        let err = ExamId::new("a/b").unwrap_err();
        assert_eq!(err, IdError::InvalidChar { kind: "ExamId", ch: '/' });
    }

    #[test]
    fn blank_question_id_is_rejected() {
        assert!(matches!(
            QuestionId::new("   "),
            Err(IdError::Empty { kind: "QuestionId" })
        ));
        assert!("".parse::<ChoiceId>().is_err());
    }

    #[test]
    fn ids_deserialize_through_validation() {
        let ok: QuestionId = serde_json::from_str("\"q1\"").unwrap();
        assert_eq!(ok.as_str(), "q1");

        let bad = serde_json::from_str::<ExamId>("\"has space\"");
        assert!(bad.is_err());
    }

    #[test]
    fn session_number_advances_until_exhausted() {
        assert_eq!(SessionNumber::FIRST.checked_next(), Some(SessionNumber::new(2)));
        assert_eq!(SessionNumber::new(u32::MAX).checked_next(), None);
    }
}
