use serde_json::{Value, json};

use cfngraph::arn;
use cfngraph::resource::ResourceRef;
use cfngraph::template::Template;

use crate::stack::DeployEnv;
use crate::stack::storage::StorageHandles;

/// Public genomics buckets that pipelines read reference data from.
const PUBLIC_DATA_BUCKETS: [&str; 2] = ["gatk-test-data", "broad-references"];

/// Roles and the instance profile consumed by the compute topology.
pub struct AccessHandles {
    pub batch_service_role: ResourceRef,
    pub spotfleet_role: ResourceRef,
    pub instance_role: ResourceRef,
    pub instance_profile: ResourceRef,
    pub job_role: ResourceRef,
}

fn assume_role_policy(principals: &[&str]) -> Value {
    let services: Vec<String> = principals
        .iter()
        .map(|p| format!("{p}.amazonaws.com"))
        .collect();
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"Service": services},
            "Action": "sts:AssumeRole",
        }],
    })
}

fn managed_policy(name: &str) -> String {
    format!("arn:aws:iam::aws:policy/{name}")
}

fn allow(actions: Value, resources: Value) -> Value {
    json!({
        "Effect": "Allow",
        "Action": actions,
        "Resource": resources,
    })
}

fn inline_policy(name: &str, statements: Vec<Value>) -> Value {
    json!({
        "PolicyName": name,
        "PolicyDocument": {
            "Version": "2012-10-17",
            "Statement": statements,
        },
    })
}

/// Bucket and object ARNs of the fixed public reference buckets.
fn public_data_resources() -> Vec<Value> {
    let mut resources = Vec::new();
    for bucket in PUBLIC_DATA_BUCKETS {
        resources.push(json!(arn::s3_bucket(bucket)));
        resources.push(json!(arn::s3_objects(bucket)));
    }
    resources
}

/// Read-only grant shared by the instance and job roles: the public
/// reference buckets plus the data bucket.
fn data_read_statement(storage: &StorageHandles) -> Value {
    let mut resources = public_data_resources();
    resources.push(storage.data_bucket.arn());
    allow(
        json!(["s3:GetObject", "s3:ListBucket"]),
        Value::Array(resources),
    )
}

/// Full-access grant on the work bucket and its object-key space.
fn work_bucket_statement(storage: &StorageHandles) -> Value {
    allow(
        json!(["s3:*"]),
        json!([
            storage.work_bucket.arn(),
            storage.work_bucket.objects_arn()
        ]),
    )
}

/// Constructs the four service roles and the instance profile. Every inline
/// grant references bucket handles resolved by the storage stage, so this
/// stage must run after it.
pub fn build(
    template: &mut Template,
    env: &DeployEnv,
    storage: &StorageHandles,
) -> crate::Result<AccessHandles> {
    let batch_service_role = template.add(
        &["nf-batch-role"],
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": assume_role_policy(&["batch"]),
            "ManagedPolicyArns": [managed_policy("service-role/AWSBatchServiceRole")],
        }),
    )?;

    let spotfleet_role = template.add(
        &["nf-spotfleet-role"],
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": assume_role_policy(&["ec2"]),
            "ManagedPolicyArns": [managed_policy("service-role/AmazonEC2SpotFleetTaggingRole")],
        }),
    )?;

    let instance_role = template.add(
        &["nf-batch-instance-role"],
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": assume_role_policy(&["ec2", "ecs", "ecs-tasks"]),
            "Policies": [
                inline_policy(
                    "nf-autoscale-ebs",
                    vec![allow(
                        json!([
                            "ec2:AttachVolume",
                            "ec2:Describe*",
                            "ec2:ModifyInstanceAttribute",
                            "ec2:CreateVolume",
                            "ec2:DeleteVolume",
                            "ec2:CreateTags",
                        ]),
                        json!(["*"]),
                    )],
                ),
                inline_policy(
                    "nextflow-jobs",
                    vec![allow(
                        json!([
                            "batch:DescribeJobQueues",
                            "batch:CancelJob",
                            "batch:SubmitJob",
                            "batch:ListJobs",
                            "batch:DescribeComputeEnvironments",
                            "batch:TerminateJob",
                            "batch:DescribeJobs",
                            "batch:RegisterJobDefinition",
                            "batch:DescribeJobDefinitions",
                            "ecs:DescribeContainerInstances",
                            "ecs:DescribeTasks",
                            "ec2:DescribeInstances",
                            "ec2:DescribeInstanceAttribute",
                            "ec2:DescribeInstanceTypes",
                            "ec2:DescribeInstanceStatus",
                        ]),
                        json!(["*"]),
                    )],
                ),
                inline_policy(
                    "nf-s3-public-data",
                    vec![allow(
                        json!(["s3:GetObject", "s3:ListBucket"]),
                        Value::Array(public_data_resources()),
                    )],
                ),
                inline_policy("nf-bucket-access", vec![work_bucket_statement(storage)]),
                inline_policy("nf-s3-data", vec![data_read_statement(storage)]),
            ],
            "ManagedPolicyArns": [
                managed_policy("service-role/AmazonEC2ContainerServiceforEC2Role"),
                managed_policy("service-role/AmazonEC2RoleforSSM"),
                managed_policy("AmazonS3ReadOnlyAccess"),
            ],
        }),
    )?;

    // Profile names must be unique per deployment region.
    let instance_profile = template.add(
        &["Nf-Instance-Profile"],
        "AWS::IAM::InstanceProfile",
        json!({
            "InstanceProfileName": format!("Nf-Instance-Profile-{}", env.region),
            "Roles": [instance_role.reference()],
        }),
    )?;

    let job_role = template.add(
        &["nf_job_role"],
        "AWS::IAM::Role",
        json!({
            "RoleName": format!("nf_job_role-{}", env.region),
            "AssumeRolePolicyDocument": assume_role_policy(&["ecs-tasks"]),
            "Policies": [
                inline_policy(
                    "nf-batch",
                    vec![allow(json!(["batch:*"]), json!(["*"]))],
                ),
                inline_policy("nf-bucket-access", vec![work_bucket_statement(storage)]),
                inline_policy("nf-s3-data", vec![data_read_statement(storage)]),
            ],
            "ManagedPolicyArns": [managed_policy("AmazonS3ReadOnlyAccess")],
        }),
    )?;

    Ok(AccessHandles {
        batch_service_role,
        spotfleet_role,
        instance_role,
        instance_profile,
        job_role,
    })
}
