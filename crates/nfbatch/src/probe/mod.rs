//! Deploy-time queries against the target account.
//!
//! Synthesis itself never talks to the cloud; these probes answer the few
//! questions that must be settled before the graph can be assembled: who is
//! deploying, which VPC a tag refers to, and whether a named bucket exists.

mod cli;

pub use cli::AwsCliProbe;

use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;

pub type ProbeResult<T> = anyhow::Result<T>;

/// Identity of the deploying principal, as reported by the account's
/// identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Arn")]
    pub arn: String,
    #[serde(rename = "UserId")]
    pub user_id: String,
}

/// A pre-existing VPC resolved by tag, together with its subnets.
#[derive(Debug, Clone)]
pub struct VpcDescription {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
}

/// Handler that can query the deployment target account.
pub trait CloudProbe {
    /// Resolve the identity that will own the deployment.
    fn caller_identity(&self) -> Pin<Box<dyn Future<Output = ProbeResult<CallerIdentity>>>>;

    /// Resolve a VPC by its `Name` tag.
    ///
    /// Fails unless exactly one VPC in the target account/region carries the
    /// tag.
    fn lookup_vpc(&self, name_tag: &str)
    -> Pin<Box<dyn Future<Output = ProbeResult<VpcDescription>>>>;

    /// Verify that a bucket with the given name exists and is accessible.
    fn check_bucket(&self, name: &str) -> Pin<Box<dyn Future<Output = ProbeResult<()>>>>;
}
