use serde_json::{Value, json};

use cfngraph::arn;
use cfngraph::resource::ResourceRef;
use cfngraph::template::Template;

use crate::common::error::NfError;
use crate::config::{BucketProps, Props};
use crate::probe::CloudProbe;
use crate::stack::DeployEnv;
use crate::stack::network::NetworkHandle;

/// An object-storage bucket resolved either by lookup or by creation.
///
/// Exactly one of the two paths runs per configured bucket; consumers hold
/// the handle by reference and never learn which path it was.
pub enum BucketHandle {
    Existing { name: String },
    Created { name: String, resource: ResourceRef },
}

impl BucketHandle {
    pub fn name(&self) -> &str {
        match self {
            BucketHandle::Existing { name } | BucketHandle::Created { name, .. } => name,
        }
    }

    pub fn arn(&self) -> Value {
        match self {
            BucketHandle::Existing { name } => json!(arn::s3_bucket(name)),
            BucketHandle::Created { resource, .. } => resource.att("Arn"),
        }
    }

    /// ARN pattern covering the bucket's whole object-key space.
    pub fn objects_arn(&self) -> Value {
        match self {
            BucketHandle::Existing { name } => json!(arn::s3_objects(name)),
            BucketHandle::Created { resource, .. } => {
                json!({"Fn::Join": ["", [resource.att("Arn"), "/*"]]})
            }
        }
    }

    /// `s3://` URL for an object key inside the bucket.
    pub fn url_for_object(&self, key: &str) -> String {
        arn::s3_url(self.name(), key)
    }
}

/// Storage context handed to the access and compute stages.
pub struct StorageHandles {
    pub work_bucket: BucketHandle,
    pub data_bucket: BucketHandle,
    pub ref_bucket: BucketHandle,
    pub security_group: ResourceRef,
}

pub async fn build(
    template: &mut Template,
    env: &DeployEnv,
    probe: &dyn CloudProbe,
    props: &Props,
    network: &NetworkHandle,
) -> crate::Result<StorageHandles> {
    let work_bucket = resolve_bucket(template, env, probe, "work", &props.work_bucket).await?;
    let data_bucket = resolve_bucket(template, env, probe, "data", &props.data_bucket).await?;
    let ref_bucket = resolve_bucket(template, env, probe, "ref", &props.ref_bucket).await?;

    // Scoped to the resolved network for later ingress/egress rules; none
    // are attached here.
    let security_group = template.add(
        &["NfBatchSecurityGroup"],
        "AWS::EC2::SecurityGroup",
        json!({
            "GroupName": "NfBatchSecurityGroup",
            "GroupDescription": "Security group of the batch compute environments",
            "VpcId": network.vpc(),
        }),
    )?;

    Ok(StorageHandles {
        work_bucket,
        data_bucket,
        ref_bucket,
        security_group,
    })
}

/// Based on the bucket properties, either verify a pre-existing bucket or create
/// one with the fixed security baseline: private ACL, public access fully
/// blocked, provider-managed encryption at rest, name suffixed by region for
/// global uniqueness.
async fn resolve_bucket(
    template: &mut Template,
    env: &DeployEnv,
    probe: &dyn CloudProbe,
    role: &str,
    props: &BucketProps,
) -> crate::Result<BucketHandle> {
    if props.exists {
        log::debug!("Looking up existing {role} bucket {}", props.name);
        probe
            .check_bucket(&props.name)
            .await
            .map_err(|e| NfError::LookupError(format!("{e:#}")))?;
        Ok(BucketHandle::Existing {
            name: props.name.clone(),
        })
    } else {
        let name = format!("{}-{}", props.name, env.region);
        log::debug!("Creating {role} bucket {name}");
        let resource = template.add(
            &[&props.name],
            "AWS::S3::Bucket",
            json!({
                "BucketName": name,
                "AccessControl": "Private",
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "BlockPublicPolicy": true,
                    "IgnorePublicAcls": true,
                    "RestrictPublicBuckets": true,
                },
                "BucketEncryption": {
                    "ServerSideEncryptionConfiguration": [
                        {"ServerSideEncryptionByDefault": {"SSEAlgorithm": "AES256"}}
                    ]
                },
            }),
        )?;
        Ok(BucketHandle::Created { name, resource })
    }
}
