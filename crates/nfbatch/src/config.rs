use serde::Deserialize;
use std::path::Path;

use crate::common::error::NfError;

/// Deployment properties (`props.json`).
///
/// Every field below is required unless noted; a missing or unknown key fails
/// the load before any resource is synthesized.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Props {
    /// When set, the deployment joins a pre-existing VPC found by tag instead
    /// of creating its own.
    pub vpc_exists: bool,
    #[serde(default)]
    pub vpc_tags: Option<VpcTags>,
    pub work_bucket: BucketProps,
    pub data_bucket: BucketProps,
    pub ref_bucket: BucketProps,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VpcTags {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketProps {
    pub exists: bool,
    #[serde(rename = "Name")]
    pub name: String,
}

impl Props {
    pub fn load(path: &Path) -> crate::Result<Props> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NfError::ConfigError(format!(
                "Cannot read properties file {}: {e}",
                path.display()
            ))
        })?;
        let props: Props = serde_json::from_str(&raw)?;
        props.validate()?;
        Ok(props)
    }

    fn validate(&self) -> crate::Result<()> {
        if self.vpc_exists && self.vpc_tags.is_none() {
            return Err(NfError::ConfigError(
                "vpc_exists is set but vpc_tags.Name is missing".to_string(),
            ));
        }
        Ok(())
    }

    /// Tag identifying the pre-existing VPC; present whenever `vpc_exists`
    /// passed validation.
    pub fn vpc_name_tag(&self) -> Option<&str> {
        self.vpc_tags.as_ref().map(|tags| tags.name.as_str())
    }
}
