use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown entry '{name}' in space '{space}'")]
    NotFound { name: String, space: String },

    #[error("Size mismatch for {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Table full: capacity {capacity}")]
    TableFull { capacity: usize },
}
