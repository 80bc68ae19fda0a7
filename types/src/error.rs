//! Error type shared by the parsing helpers in this crate.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("unknown broadcast strategy: {0}")]
    UnknownStrategy(String),

    #[error("wave level must be within 0..=100, got {0}")]
    WaveLevelOutOfRange(u32),

    #[error("invalid number: {0}")]
    InvalidNumber(String),
}
