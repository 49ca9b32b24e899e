use std::fmt::{self, Display};

/// Errors produced by model constructors and parsing routines.
#[derive(Debug)]
pub enum ModelError {
    InvalidTimestamp { raw: String, reason: String },
    InvalidAnchorId(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidTimestamp { raw, reason } => {
                write!(f, "invalid server timestamp '{raw}': {reason}")
            }
            ModelError::InvalidAnchorId(raw) => {
                write!(f, "invalid anchor identifier '{raw}'")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
