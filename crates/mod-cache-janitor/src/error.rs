//! Error types for the cache janitor

use std::fmt;

#[derive(Debug)]
pub enum JanitorError {
    Config(String),
    Serialization(String),
}

impl fmt::Display for JanitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JanitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            JanitorError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for JanitorError {}

impl From<tracing_subscriber::filter::ParseError> for JanitorError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        JanitorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for JanitorError {
    fn from(err: serde_json::Error) -> Self {
        JanitorError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JanitorError>;
