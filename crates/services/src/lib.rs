#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod history;
pub mod progress_service;

pub use exam_core::Clock;

pub use bank::load_bank;
pub use error::ProgressServiceError;
pub use history::{ReviewItem, SessionHistoryItem};
pub use progress_service::{AnswerOutcome, ProgressService};
