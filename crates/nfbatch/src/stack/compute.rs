use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};
use std::path::Path;

use cfngraph::resource::ResourceRef;
use cfngraph::template::Template;

use crate::common::error::NfError;
use crate::stack::access::AccessHandles;
use crate::stack::image::ImageAssets;
use crate::stack::network::NetworkHandle;
use crate::stack::storage::StorageHandles;

const LAUNCH_TEMPLATE_NAME: &str = "NfEbsLaunchTemplate";
const USERDATA_SCRIPT: &str = "launch_template/userdata_ebs.sh";

/// Instance-class families that worker environments are built for.
pub const INSTANCE_CLASSES: [&str; 3] = ["m5", "c5", "r5"];

/// The head queue outranks every worker queue; worker queues are
/// equal-weight among themselves.
pub const HEAD_QUEUE_PRIORITY: u32 = 100;
pub const WORKER_QUEUE_PRIORITY: u32 = 1;

const MAX_VCPUS: u32 = 1024;
const JOB_VCPUS: u32 = 2;
const JOB_MEMORY_MIB: u32 = 1024;

/// Pricing model of a compute environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingModel {
    Spot,
    OnDemand,
}

impl PricingModel {
    pub const ALL: [PricingModel; 2] = [PricingModel::Spot, PricingModel::OnDemand];

    /// Name segment used in derived queue and job-definition names.
    pub fn name(&self) -> &'static str {
        match self {
            PricingModel::Spot => "spot",
            PricingModel::OnDemand => "on_demand",
        }
    }

    fn resource_type(&self) -> &'static str {
        match self {
            PricingModel::Spot => "SPOT",
            PricingModel::OnDemand => "EC2",
        }
    }
}

/// Instance types offered by a worker family. `c5` tops out at `9xlarge`,
/// the other families at `8xlarge`.
pub fn instance_types(instance_class: &str) -> Vec<String> {
    let suffixes = if instance_class == "c5" {
        ["large", "xlarge", "2xlarge", "4xlarge", "9xlarge"]
    } else {
        ["large", "xlarge", "2xlarge", "4xlarge", "8xlarge"]
    };
    suffixes
        .iter()
        .map(|suffix| format!("{instance_class}.{suffix}"))
        .collect()
}

/// Derived queue name, a pure function of the pricing model and class.
pub fn queue_name(pricing: PricingModel, instance_class: &str) -> String {
    format!("Nf{}{}Queue", pricing.name(), instance_class)
}

/// Derived job-definition name, same derivation as [`queue_name`].
pub fn job_definition_name(pricing: PricingModel, instance_class: &str) -> String {
    format!("Nf{}{}Job", pricing.name(), instance_class)
}

struct ComputeInputs<'a> {
    network: &'a NetworkHandle,
    storage: &'a StorageHandles,
    access: &'a AccessHandles,
    images: &'a ImageAssets,
}

/// Builds the full compute topology: the shared launch template, the head
/// environment, and a spot plus an on-demand environment per worker family,
/// each with its queue and job definition.
pub fn build(
    template: &mut Template,
    project_dir: &Path,
    network: &NetworkHandle,
    storage: &StorageHandles,
    access: &AccessHandles,
    images: &ImageAssets,
) -> crate::Result<()> {
    let user_data = read_user_data(project_dir)?;
    create_launch_template(template, user_data)?;

    let inputs = ComputeInputs {
        network,
        storage,
        access,
        images,
    };

    create_head_env(template, &inputs)?;
    for instance_class in INSTANCE_CLASSES {
        create_worker_envs(template, instance_class, &inputs)?;
    }
    Ok(())
}

/// The user data blob is opaque to synthesis; it is embedded base64-encoded
/// the way the instance bootstrap expects it.
fn read_user_data(project_dir: &Path) -> crate::Result<String> {
    let path = project_dir.join(USERDATA_SCRIPT);
    let contents = std::fs::read(&path).map_err(|e| {
        NfError::ConfigError(format!(
            "Cannot read launch template script {}: {e}",
            path.display()
        ))
    })?;
    Ok(BASE64.encode(contents))
}

/// Launch template shared by every compute environment: two encrypted data
/// volumes, the root volume, and the boot script.
fn create_launch_template(
    template: &mut Template,
    user_data: String,
) -> crate::Result<ResourceRef> {
    Ok(template.add(
        &["nf-ebs-launch-template"],
        "AWS::EC2::LaunchTemplate",
        json!({
            "LaunchTemplateName": LAUNCH_TEMPLATE_NAME,
            "LaunchTemplateData": {
                "BlockDeviceMappings": [
                    {
                        "DeviceName": "/dev/xvdcz",
                        "Ebs": {
                            "Encrypted": true,
                            "DeleteOnTermination": true,
                            "VolumeSize": 75,
                            "VolumeType": "gp2",
                        },
                    },
                    {
                        "DeviceName": "/dev/xvda",
                        "Ebs": {
                            "DeleteOnTermination": true,
                            "VolumeSize": 50,
                            "VolumeType": "gp2",
                        },
                    },
                    {
                        "DeviceName": "/dev/sdc",
                        "Ebs": {
                            "Encrypted": true,
                            "DeleteOnTermination": true,
                            "VolumeSize": 100,
                            "VolumeType": "gp2",
                        },
                    },
                ],
                "UserData": user_data,
            },
        }),
    )?)
}

/// Compute resources shared between the head and worker environments.
fn create_compute_resources(
    pricing: PricingModel,
    instance_types: Vec<String>,
    inputs: &ComputeInputs,
) -> Value {
    let mut resources = json!({
        "Type": pricing.resource_type(),
        "MinvCpus": 0,
        "MaxvCpus": MAX_VCPUS,
        "DesiredvCpus": 0,
        "InstanceTypes": instance_types,
        "InstanceRole": inputs.access.instance_profile.reference(),
        "Subnets": inputs.network.compute_subnets(),
        "SecurityGroupIds": [inputs.storage.security_group.reference()],
        "LaunchTemplate": {"LaunchTemplateName": LAUNCH_TEMPLATE_NAME},
    });
    if pricing == PricingModel::Spot {
        resources["SpotIamFleetRole"] = inputs.access.spotfleet_role.att("Arn");
    }
    resources
}

fn create_compute_environment(
    template: &mut Template,
    id: &str,
    inputs: &ComputeInputs,
    compute_resources: Value,
) -> crate::Result<ResourceRef> {
    Ok(template.add(
        &[id],
        "AWS::Batch::ComputeEnvironment",
        json!({
            "Type": "MANAGED",
            "ServiceRole": inputs.access.batch_service_role.att("Arn"),
            "ComputeResources": compute_resources,
        }),
    )?)
}

fn create_queue(
    template: &mut Template,
    pricing: PricingModel,
    instance_class: &str,
    environment: &ResourceRef,
    priority: u32,
) -> crate::Result<ResourceRef> {
    Ok(template.add(
        &[&format!("nf-{}-{}-queue", pricing.name(), instance_class)],
        "AWS::Batch::JobQueue",
        json!({
            "JobQueueName": queue_name(pricing, instance_class),
            "Priority": priority,
            "ComputeEnvironmentOrder": [
                {"Order": 0, "ComputeEnvironment": environment.reference()},
            ],
        }),
    )?)
}

/// Job definition tied 1:1 to a queue: the pipeline-runner image pointed at
/// the queue and the work bucket's `work`/`logs` prefixes.
fn create_job_definition(
    template: &mut Template,
    pricing: PricingModel,
    instance_class: &str,
    queue: &ResourceRef,
    inputs: &ComputeInputs,
) -> crate::Result<ResourceRef> {
    Ok(template.add(
        &[&format!("nf-{}-{}-job", pricing.name(), instance_class)],
        "AWS::Batch::JobDefinition",
        json!({
            "Type": "container",
            "JobDefinitionName": job_definition_name(pricing, instance_class),
            "ContainerProperties": {
                "Image": inputs.images.pipeline_image_uri(),
                "Vcpus": JOB_VCPUS,
                "Memory": JOB_MEMORY_MIB,
                "JobRoleArn": inputs.access.instance_role.att("Arn"),
                "Environment": [
                    {"Name": "NF_JOB_QUEUE", "Value": queue.reference()},
                    {"Name": "NF_LOGSDIR", "Value": inputs.storage.work_bucket.url_for_object("logs")},
                    {"Name": "NF_WORKDIR", "Value": inputs.storage.work_bucket.url_for_object("work")},
                ],
                "MountPoints": [
                    {"ContainerPath": "/opt/aws-cli", "ReadOnly": true, "SourceVolume": "aws-cli"},
                ],
                "Volumes": [
                    {"Name": "aws-cli", "Host": {"SourcePath": "/opt/aws-cli"}},
                ],
            },
        }),
    )?)
}

/// The environment that pipeline head jobs are distributed from: on-demand
/// capacity with a provider-chosen instance type and the top queue priority.
fn create_head_env(template: &mut Template, inputs: &ComputeInputs) -> crate::Result<()> {
    let resources =
        create_compute_resources(PricingModel::OnDemand, vec!["optimal".to_string()], inputs);
    let environment = create_compute_environment(template, "nf_head_env", inputs, resources)?;
    let queue = create_queue(
        template,
        PricingModel::OnDemand,
        "head",
        &environment,
        HEAD_QUEUE_PRIORITY,
    )?;
    create_job_definition(template, PricingModel::OnDemand, "head", &queue, inputs)?;
    Ok(())
}

/// Spot and on-demand environments for one instance-class family, with the
/// associated queues and job definitions.
fn create_worker_envs(
    template: &mut Template,
    instance_class: &str,
    inputs: &ComputeInputs,
) -> crate::Result<()> {
    for pricing in PricingModel::ALL {
        let resources = create_compute_resources(pricing, instance_types(instance_class), inputs);
        let environment = create_compute_environment(
            template,
            &format!("{instance_class}-nf-{}-env", pricing.name()),
            inputs,
            resources,
        )?;
        let queue = create_queue(
            template,
            pricing,
            instance_class,
            &environment,
            WORKER_QUEUE_PRIORITY,
        )?;
        create_job_definition(template, pricing, instance_class, &queue, inputs)?;
    }
    Ok(())
}
