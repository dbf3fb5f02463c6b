//! Error types for formsift.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty input: document {0} has no text")]
    EmptyInput(String),

    #[error("Undecodable input: document {0} is not valid UTF-8")]
    Undecodable(String),

    #[error("Unknown document family: {0}")]
    UnknownFamily(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
