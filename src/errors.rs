use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelloError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("failed to decode state message - {msg}")]
    DecodeError { msg: String },

    #[error("invalid command {text:?} ({reason})")]
    InvalidCommand { text: String, reason: &'static str },

    #[error("no script named {name:?}")]
    UnknownScript { name: String },

    #[error("session closed")]
    SessionClosed,
}

pub type Result<T, E = TelloError> = std::result::Result<T, E>;
