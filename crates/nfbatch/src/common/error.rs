use thiserror::Error;

use crate::common::error::NfError::GenericError;

#[derive(Debug, Error)]
pub enum NfError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Lookup error: {0}")]
    LookupError(String),
    #[error("Synthesis error: {0}")]
    SynthesisError(#[from] cfngraph::CfnError),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for NfError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::DeserializationError(e.to_string())
    }
}

impl From<anyhow::Error> for NfError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(format!("{error:#}"))
    }
}

impl From<String> for NfError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}
