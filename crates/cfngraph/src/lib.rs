pub mod arn;
pub mod asset;
pub mod resource;
pub mod template;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CfnError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid logical id derived from `{0}`")]
    InvalidLogicalId(String),
    #[error("Duplicate logical id `{0}`")]
    DuplicateLogicalId(String),
}

impl From<serde_json::error::Error> for CfnError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

pub type Error = CfnError;
pub type Result<T> = std::result::Result<T, CfnError>;
