#![forbid(unsafe_code)]

pub mod error;
pub mod lifecycle;
pub mod model;
pub mod recorder;
pub mod schema;
pub mod stats;
pub mod time;

pub use error::Error;
pub use recorder::AnswerOptions;
pub use schema::Validation;
pub use time::Clock;
