use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use tempfile::TempDir;

use crate::config::{BucketProps, Props, VpcTags};
use crate::probe::{CallerIdentity, CloudProbe, ProbeResult, VpcDescription};
use crate::stack::DeployEnv;

pub const TEST_ACCOUNT: &str = "123456789012";
pub const TEST_REGION: &str = "us-east-1";

/// Probe answering from fixed tables instead of the target account.
#[derive(Default)]
pub struct StubProbe {
    vpcs: HashMap<String, VpcDescription>,
    buckets: HashSet<String>,
}

impl StubProbe {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_vpc(mut self, tag: &str, vpc_id: &str, subnet_ids: &[&str]) -> Self {
        self.vpcs.insert(
            tag.to_string(),
            VpcDescription {
                vpc_id: vpc_id.to_string(),
                subnet_ids: subnet_ids.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_bucket(mut self, name: &str) -> Self {
        self.buckets.insert(name.to_string());
        self
    }
}

impl CloudProbe for StubProbe {
    fn caller_identity(&self) -> Pin<Box<dyn Future<Output = ProbeResult<CallerIdentity>>>> {
        Box::pin(async {
            Ok(CallerIdentity {
                account: TEST_ACCOUNT.to_string(),
                arn: format!("arn:aws:iam::{TEST_ACCOUNT}:user/test"),
                user_id: "AIDATEST".to_string(),
            })
        })
    }

    fn lookup_vpc(
        &self,
        name_tag: &str,
    ) -> Pin<Box<dyn Future<Output = ProbeResult<VpcDescription>>>> {
        let tag = name_tag.to_string();
        let found = self.vpcs.get(name_tag).cloned();
        Box::pin(async move {
            found.ok_or_else(|| anyhow::anyhow!("No VPC with tag Name={tag} exists"))
        })
    }

    fn check_bucket(&self, name: &str) -> Pin<Box<dyn Future<Output = ProbeResult<()>>>> {
        let name = name.to_string();
        let exists = self.buckets.contains(&name);
        Box::pin(async move {
            if exists {
                Ok(())
            } else {
                Err(anyhow::anyhow!("Bucket {name} does not exist"))
            }
        })
    }
}

pub fn bucket(exists: bool, name: &str) -> BucketProps {
    BucketProps {
        exists,
        name: name.to_string(),
    }
}

/// Props creating everything from scratch.
pub fn test_props() -> Props {
    Props {
        vpc_exists: false,
        vpc_tags: None,
        work_bucket: bucket(false, "nf-work"),
        data_bucket: bucket(false, "nf-data"),
        ref_bucket: bucket(false, "nf-ref"),
    }
}

/// Props joining a pre-existing VPC by tag.
pub fn test_props_existing_vpc(tag: &str) -> Props {
    Props {
        vpc_exists: true,
        vpc_tags: Some(VpcTags {
            name: tag.to_string(),
        }),
        ..test_props()
    }
}

pub fn test_env() -> DeployEnv {
    DeployEnv {
        account: TEST_ACCOUNT.to_string(),
        region: TEST_REGION.to_string(),
    }
}

/// Project directory carrying the five build contexts and the boot script.
pub fn test_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    for context in [
        "docker",
        "docker_gatk",
        "docker_gatk4110",
        "docker_gotc",
        "docker_gatk_joint",
    ] {
        let path = dir.path().join(context);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(
            path.join("Dockerfile"),
            format!("FROM public.ecr.aws/docker/library/busybox\n# {context}\n"),
        )
        .unwrap();
    }
    std::fs::create_dir_all(dir.path().join("launch_template")).unwrap();
    std::fs::write(
        dir.path().join("launch_template/userdata_ebs.sh"),
        "#!/bin/bash\nset -e\n",
    )
    .unwrap();
    dir
}
