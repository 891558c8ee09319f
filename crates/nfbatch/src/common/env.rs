use crate::common::error::NfError;

/// Environment variables consumed at synthesis time
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";

/// Region the deployment targets. Absence is a hard failure; nothing is
/// synthesized without it.
pub fn deployment_region() -> crate::Result<String> {
    std::env::var(AWS_DEFAULT_REGION)
        .map_err(|_| NfError::ConfigError(format!("{AWS_DEFAULT_REGION} is not set")))
}
