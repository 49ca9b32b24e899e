use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnchorError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("radio is not ready")]
    RadioUnavailable,

    #[error("radio error: {0}")]
    Radio(String),

    #[error("identity store error: {0}")]
    Identity(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnchorError>;
