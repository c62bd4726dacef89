use thiserror::Error;

use crate::model::{BankError, IdError};
use crate::schema::SchemaError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Id(#[from] IdError),
}
