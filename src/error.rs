use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the container. Failed operations leave the container
/// in its pre-operation state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Lookup, removal or rank query on a key that is not present.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A score (or score delta) that is NaN or produces NaN.
    #[error("not a number: {0}")]
    NotANumber(f64),

    /// Container construction with a maximum level outside [1, 32].
    #[error("maxlevel must be in 1..=32, got {given}")]
    BadMaxLevel { given: usize },

    /// A user-supplied level generator returned a level outside
    /// [1, maxlevel].
    #[error("level {given} out of range 1..={maxlevel}")]
    BadLevel { given: i64, maxlevel: usize },

    /// Bulk insertion encountered an invalid score; carries the position of
    /// the offending pair.
    #[error("pair #{index} has an invalid score: {score}")]
    BadPair { index: usize, score: f64 },

    /// Iterator slicing with a step other than 1.
    #[error("slice step must be 1, got {0}")]
    BadStep(isize),

    /// Iterator subscript outside [-len, len).
    #[error("index {index} out of range for iterator of length {len}")]
    IndexOutOfRange { index: isize, len: usize },
}
