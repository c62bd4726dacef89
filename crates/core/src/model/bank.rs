use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChoiceId, ExamId, QuestionId};
use crate::model::progress::AnswerResult;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a question bank document is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank is not valid JSON for the expected shape: {0}")]
    Parse(String),

    #[error("question bank version cannot be empty")]
    EmptyVersion,

    #[error("question {question}: question text cannot be empty")]
    EmptyText { question: QuestionId },

    #[error("question {question}: explanation cannot be empty")]
    EmptyExplanation { question: QuestionId },

    #[error("question {question}: no choices found")]
    NoChoices { question: QuestionId },

    #[error("question {question}: no correct answer marked")]
    NoCorrectChoice { question: QuestionId },

    #[error("question {question}: single answer question has {count} correct answers")]
    MultipleCorrect { question: QuestionId, count: usize },

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("question {question}: duplicate choice id {choice}")]
    DuplicateChoice {
        question: QuestionId,
        choice: ChoiceId,
    },

    #[error("meta.totalQuestions is {declared} but the bank holds {actual} questions")]
    CountMismatch { declared: usize, actual: usize },
}

//
// ─── BANK TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
    pub is_correct: bool,
}

/// A single multiple-choice question as authored in the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub question_text: String,
    pub is_multi_answer: bool,
    pub choices: Vec<Choice>,
    pub explanation: String,
    #[serde(default)]
    pub reference_links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Question {
    /// Identifiers of the choices marked correct.
    #[must_use]
    pub fn correct_choice_ids(&self) -> BTreeSet<&ChoiceId> {
        self.choices
            .iter()
            .filter(|c| c.is_correct)
            .map(|c| &c.id)
            .collect()
    }

    /// Grades a selection: correct only when the selected set equals the set of
    /// correct choices. Repeated ids in `selected` count once.
    #[must_use]
    pub fn grade(&self, selected: &[ChoiceId]) -> AnswerResult {
        let selected: BTreeSet<&ChoiceId> = selected.iter().collect();
        if selected == self.correct_choice_ids() {
            AnswerResult::Correct
        } else {
            AnswerResult::Incorrect
        }
    }

    fn validate(&self) -> Result<(), BankError> {
        if self.question_text.trim().is_empty() {
            return Err(BankError::EmptyText {
                question: self.id.clone(),
            });
        }
        if self.explanation.trim().is_empty() {
            return Err(BankError::EmptyExplanation {
                question: self.id.clone(),
            });
        }
        if self.choices.is_empty() {
            return Err(BankError::NoChoices {
                question: self.id.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.choices.len());
        for choice in &self.choices {
            if !seen.insert(&choice.id) {
                return Err(BankError::DuplicateChoice {
                    question: self.id.clone(),
                    choice: choice.id.clone(),
                });
            }
        }

        let correct = self.choices.iter().filter(|c| c.is_correct).count();
        if correct == 0 {
            return Err(BankError::NoCorrectChoice {
                question: self.id.clone(),
            });
        }
        if !self.is_multi_answer && correct > 1 {
            return Err(BankError::MultipleCorrect {
                question: self.id.clone(),
                count: correct,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankMeta {
    pub total_questions: usize,
    /// Human-readable date the bank content was last revised.
    pub last_updated_at: String,
}

/// Read-only question bank document produced by the authoring tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBank {
    pub exam_id: ExamId,
    pub title: String,
    pub version: String,
    pub questions: Vec<Question>,
    pub meta: BankMeta,
}

impl QuestionBank {
    /// Parse and validate a bank document.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Parse` for malformed JSON or missing fields, and the
    /// matching validation error for content problems.
    pub fn from_json(raw: &str) -> Result<Self, BankError> {
        let bank: Self =
            serde_json::from_str(raw).map_err(|err| BankError::Parse(err.to_string()))?;
        bank.validate()?;
        Ok(bank)
    }

    /// Check the per-question authoring rules and bank-level consistency.
    ///
    /// # Errors
    ///
    /// Returns the first `BankError` found, in question order.
    pub fn validate(&self) -> Result<(), BankError> {
        if self.version.trim().is_empty() {
            return Err(BankError::EmptyVersion);
        }

        let mut ids = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !ids.insert(&question.id) {
                return Err(BankError::DuplicateQuestion(question.id.clone()));
            }
            question.validate()?;
        }

        if self.meta.total_questions != self.questions.len() {
            return Err(BankError::CountMismatch {
                declared: self.meta.total_questions,
                actual: self.questions.len(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
