mod bank;
mod ids;
mod progress;

pub use bank::{BankError, BankMeta, Choice, Question, QuestionBank};
pub use ids::{ChoiceId, ExamId, IdError, QuestionId, SessionNumber};
pub use progress::{
    AnswerResult, CumulativeQuestionProgress, ExamProgress, QuestionResult, SessionProgress,
    SessionQuestionProgress,
};
