use anyhow::Context;
use bstr::ByteSlice;
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Output;
use tokio::process::Command;

use crate::probe::{CallerIdentity, CloudProbe, ProbeResult, VpcDescription};

/// Probe backed by the `aws` command-line tool of the calling user.
///
/// Every query is a one-shot subprocess invocation with `--output json`;
/// the credentials and profile in effect are whatever the environment
/// provides, matching the deployment engine that consumes the graph.
pub struct AwsCliProbe {
    aws_path: PathBuf,
}

impl AwsCliProbe {
    pub fn new() -> anyhow::Result<Self> {
        let aws_path = which::which("aws").context("Cannot find the aws CLI in PATH")?;
        Ok(Self { aws_path })
    }

    async fn run(aws_path: PathBuf, arguments: Vec<String>) -> ProbeResult<String> {
        log::debug!("Running command `aws {}`", arguments.join(" "));
        let mut command = Command::new(&aws_path);
        command.args(&arguments).arg("--output").arg("json");

        let output = command
            .output()
            .await
            .with_context(|| format!("aws {} start failed", arguments[0]))?;
        let output = check_command_output(output)
            .with_context(|| format!("aws {} execution failed", arguments.join(" ")))?;
        Ok(output
            .stdout
            .to_str()
            .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in aws output: {:?}", e))?
            .trim()
            .to_string())
    }
}

fn check_command_output(output: Output) -> ProbeResult<Output> {
    let status = output.status;
    if !status.success() {
        return Err(anyhow::anyhow!(
            "Exit code: {}\nStderr: {}\nStdout: {}",
            status.code().unwrap_or(-1),
            output.stderr.to_str_lossy().trim(),
            output.stdout.to_str_lossy().trim()
        ));
    }
    Ok(output)
}

#[derive(Deserialize)]
struct DescribeVpcs {
    #[serde(rename = "Vpcs")]
    vpcs: Vec<VpcRecord>,
}

#[derive(Deserialize)]
struct VpcRecord {
    #[serde(rename = "VpcId")]
    vpc_id: String,
}

#[derive(Deserialize)]
struct DescribeSubnets {
    #[serde(rename = "Subnets")]
    subnets: Vec<SubnetRecord>,
}

#[derive(Deserialize)]
struct SubnetRecord {
    #[serde(rename = "SubnetId")]
    subnet_id: String,
}

impl CloudProbe for AwsCliProbe {
    fn caller_identity(&self) -> Pin<Box<dyn Future<Output = ProbeResult<CallerIdentity>>>> {
        let aws_path = self.aws_path.clone();
        Box::pin(async move {
            let stdout = Self::run(
                aws_path,
                vec!["sts".to_string(), "get-caller-identity".to_string()],
            )
            .await?;
            let identity: CallerIdentity = serde_json::from_str(&stdout)
                .context("Cannot parse get-caller-identity output")?;
            Ok(identity)
        })
    }

    fn lookup_vpc(
        &self,
        name_tag: &str,
    ) -> Pin<Box<dyn Future<Output = ProbeResult<VpcDescription>>>> {
        let aws_path = self.aws_path.clone();
        let tag = name_tag.to_string();
        Box::pin(async move {
            let stdout = Self::run(
                aws_path.clone(),
                vec![
                    "ec2".to_string(),
                    "describe-vpcs".to_string(),
                    "--filters".to_string(),
                    format!("Name=tag:Name,Values={tag}"),
                ],
            )
            .await?;
            let mut parsed: DescribeVpcs =
                serde_json::from_str(&stdout).context("Cannot parse describe-vpcs output")?;
            let vpc_id = match parsed.vpcs.len() {
                1 => parsed.vpcs.remove(0).vpc_id,
                0 => anyhow::bail!("No VPC with tag Name={tag} exists"),
                n => anyhow::bail!("Tag Name={tag} matches {n} VPCs, expected exactly one"),
            };

            let stdout = Self::run(
                aws_path,
                vec![
                    "ec2".to_string(),
                    "describe-subnets".to_string(),
                    "--filters".to_string(),
                    format!("Name=vpc-id,Values={vpc_id}"),
                ],
            )
            .await?;
            let parsed: DescribeSubnets =
                serde_json::from_str(&stdout).context("Cannot parse describe-subnets output")?;
            Ok(VpcDescription {
                vpc_id,
                subnet_ids: parsed.subnets.into_iter().map(|s| s.subnet_id).collect(),
            })
        })
    }

    fn check_bucket(&self, name: &str) -> Pin<Box<dyn Future<Output = ProbeResult<()>>>> {
        let aws_path = self.aws_path.clone();
        let name = name.to_string();
        Box::pin(async move {
            Self::run(
                aws_path,
                vec![
                    "s3api".to_string(),
                    "head-bucket".to_string(),
                    "--bucket".to_string(),
                    name.clone(),
                ],
            )
            .await
            .with_context(|| format!("Bucket {name} does not exist or is not accessible"))?;
            Ok(())
        })
    }
}
