use serde_json::{Value, json};
use tempfile::TempDir;

use cfngraph::template::Template;

use crate::common::error::NfError;
use crate::config::Props;
use crate::stack::{Synthesis, synthesize};
use crate::tests::utils::{
    StubProbe, test_env, test_project, test_props, test_props_existing_vpc,
};

async fn synth(props: &Props, probe: &StubProbe, project: &TempDir) -> crate::Result<Synthesis> {
    synthesize(props, &test_env(), probe, project.path()).await
}

async fn synth_default() -> Synthesis {
    synth(&test_props(), &StubProbe::new(), &test_project())
        .await
        .unwrap()
}

fn properties_of<'a>(template: &'a Template, resource_type: &'a str) -> Vec<&'a Value> {
    template
        .resources_of_type(resource_type)
        .map(|(_, resource)| &resource.properties)
        .collect()
}

#[tokio::test]
async fn test_topology_counts() {
    let synthesis = synth_default().await;
    let template = &synthesis.template;

    // One head triple plus spot/on-demand per worker family
    assert_eq!(
        template
            .resources_of_type("AWS::Batch::ComputeEnvironment")
            .count(),
        7
    );
    assert_eq!(template.resources_of_type("AWS::Batch::JobQueue").count(), 7);
    assert_eq!(
        template
            .resources_of_type("AWS::Batch::JobDefinition")
            .count(),
        7
    );
    assert_eq!(
        template.resources_of_type("AWS::ECR::Repository").count(),
        5
    );
    assert_eq!(
        template
            .resources_of_type("AWS::EC2::LaunchTemplate")
            .count(),
        1
    );
    assert_eq!(synthesis.assets.images.len(), 5);
}

#[tokio::test]
async fn test_worker_families_have_both_pricing_models() {
    let synthesis = synth_default().await;
    let names: Vec<String> = properties_of(&synthesis.template, "AWS::Batch::JobQueue")
        .iter()
        .map(|p| p["JobQueueName"].as_str().unwrap().to_string())
        .collect();

    for class in ["m5", "c5", "r5"] {
        assert!(names.contains(&format!("Nfspot{class}Queue")));
        assert!(names.contains(&format!("Nfon_demand{class}Queue")));
    }
    assert!(names.contains(&"Nfon_demandheadQueue".to_string()));
}

#[tokio::test]
async fn test_head_queue_outranks_workers() {
    let synthesis = synth_default().await;
    for properties in properties_of(&synthesis.template, "AWS::Batch::JobQueue") {
        let name = properties["JobQueueName"].as_str().unwrap();
        let priority = properties["Priority"].as_u64().unwrap();
        if name == "Nfon_demandheadQueue" {
            assert_eq!(priority, 100);
        } else {
            assert_eq!(priority, 1, "worker queue {name} must have priority 1");
        }
    }
}

#[tokio::test]
async fn test_c5_family_substitutes_9xlarge() {
    let synthesis = synth_default().await;
    for properties in properties_of(&synthesis.template, "AWS::Batch::ComputeEnvironment") {
        let types: Vec<&str> = properties["ComputeResources"]["InstanceTypes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t.as_str().unwrap())
            .collect();
        if types.contains(&"c5.large") {
            assert!(types.contains(&"c5.9xlarge"));
            assert!(!types.contains(&"c5.8xlarge"));
        } else if types.contains(&"m5.large") || types.contains(&"r5.large") {
            assert!(types.iter().any(|t| t.ends_with(".8xlarge")));
            assert!(!types.iter().any(|t| t.ends_with(".9xlarge")));
        } else {
            assert_eq!(types, vec!["optimal"]);
        }
    }
}

#[tokio::test]
async fn test_spot_environments_carry_fleet_role() {
    let synthesis = synth_default().await;
    let mut spot = 0;
    for properties in properties_of(&synthesis.template, "AWS::Batch::ComputeEnvironment") {
        let resources = &properties["ComputeResources"];
        match resources["Type"].as_str().unwrap() {
            "SPOT" => {
                spot += 1;
                assert!(resources["SpotIamFleetRole"].is_object());
            }
            "EC2" => assert!(resources["SpotIamFleetRole"].is_null()),
            other => panic!("unexpected compute resource type {other}"),
        }
    }
    assert_eq!(spot, 3);
}

#[tokio::test]
async fn test_job_environment_points_at_work_bucket() {
    let synthesis = synth_default().await;
    let definitions = properties_of(&synthesis.template, "AWS::Batch::JobDefinition");
    assert_eq!(definitions.len(), 7);

    fn lookup<'a>(environment: &'a [Value], key: &str) -> &'a Value {
        &environment
            .iter()
            .find(|entry| entry["Name"] == key)
            .unwrap()["Value"]
    }

    for properties in definitions {
        let environment = properties["ContainerProperties"]["Environment"]
            .as_array()
            .unwrap();
        assert_eq!(
            lookup(environment, "NF_WORKDIR"),
            &json!("s3://nf-work-us-east-1/work")
        );
        assert_eq!(
            lookup(environment, "NF_LOGSDIR"),
            &json!("s3://nf-work-us-east-1/logs")
        );
        // The queue ARN is late-bound
        assert!(lookup(environment, "NF_JOB_QUEUE").is_object());
    }
}

#[tokio::test]
async fn test_resynthesis_is_byte_identical() {
    let project = test_project();
    let first = synth(&test_props(), &StubProbe::new(), &project)
        .await
        .unwrap();
    let second = synth(&test_props(), &StubProbe::new(), &project)
        .await
        .unwrap();

    assert_eq!(
        first.template.to_json().to_string(),
        second.template.to_json().to_string()
    );
    let tags = |s: &Synthesis| -> Vec<String> {
        s.assets.images.iter().map(|a| a.tag.clone()).collect()
    };
    assert_eq!(tags(&first), tags(&second));
}

#[tokio::test]
async fn test_created_vpc_has_no_nat_gateways() {
    let synthesis = synth_default().await;
    let template = &synthesis.template;

    assert_eq!(template.resources_of_type("AWS::EC2::VPC").count(), 1);
    assert_eq!(
        template.resources_of_type("AWS::EC2::NatGateway").count(),
        0
    );
    // Two AZs worth of public subnets plus the isolated pair
    assert_eq!(template.resources_of_type("AWS::EC2::Subnet").count(), 4);

    let endpoints = properties_of(template, "AWS::EC2::VPCEndpoint");
    assert_eq!(endpoints.len(), 2);
    assert!(
        endpoints
            .iter()
            .any(|e| e["VpcEndpointType"] == "Gateway")
    );
    assert!(
        endpoints
            .iter()
            .any(|e| e["VpcEndpointType"] == "Interface")
    );
}

#[tokio::test]
async fn test_existing_vpc_is_looked_up_not_created() {
    let probe = StubProbe::new().with_vpc("shared-vpc", "vpc-0123", &["subnet-a", "subnet-b"]);
    let synthesis = synth(&test_props_existing_vpc("shared-vpc"), &probe, &test_project())
        .await
        .unwrap();
    let template = &synthesis.template;

    assert_eq!(template.resources_of_type("AWS::EC2::VPC").count(), 0);
    assert_eq!(template.resources_of_type("AWS::EC2::Subnet").count(), 0);

    // Compute environments reference the probed subnets verbatim
    for properties in properties_of(template, "AWS::Batch::ComputeEnvironment") {
        assert_eq!(
            properties["ComputeResources"]["Subnets"],
            json!(["subnet-a", "subnet-b"])
        );
    }
    // Endpoints are still attached to the resolved VPC
    for properties in properties_of(template, "AWS::EC2::VPCEndpoint") {
        assert_eq!(properties["VpcId"], json!("vpc-0123"));
    }
}

#[tokio::test]
async fn test_missing_vpc_lookup_fails() {
    let result = synth(
        &test_props_existing_vpc("absent-vpc"),
        &StubProbe::new(),
        &test_project(),
    )
    .await;
    assert!(matches!(result, Err(NfError::LookupError(_))));
}

#[tokio::test]
async fn test_existing_bucket_is_not_created() {
    let mut props = test_props();
    props.data_bucket.exists = true;
    let probe = StubProbe::new().with_bucket("nf-data");

    let synthesis = synth(&props, &probe, &test_project()).await.unwrap();
    let buckets = properties_of(&synthesis.template, "AWS::S3::Bucket");

    // Only work and ref are created; the data bucket is referenced by name
    assert_eq!(buckets.len(), 2);
    assert!(
        buckets
            .iter()
            .all(|b| b["BucketName"] != "nf-data-us-east-1")
    );
}

#[tokio::test]
async fn test_missing_bucket_lookup_fails() {
    let mut props = test_props();
    props.data_bucket.exists = true;

    let result = synth(&props, &StubProbe::new(), &test_project()).await;
    assert!(matches!(result, Err(NfError::LookupError(_))));
}

#[tokio::test]
async fn test_created_buckets_have_security_baseline() {
    let synthesis = synth_default().await;
    let buckets = properties_of(&synthesis.template, "AWS::S3::Bucket");
    assert_eq!(buckets.len(), 3);

    for properties in buckets {
        assert_eq!(properties["AccessControl"], "Private");
        let block = &properties["PublicAccessBlockConfiguration"];
        for flag in [
            "BlockPublicAcls",
            "BlockPublicPolicy",
            "IgnorePublicAcls",
            "RestrictPublicBuckets",
        ] {
            assert_eq!(block[flag], json!(true), "{flag} must be enabled");
        }
        assert_eq!(
            properties["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
            "AES256"
        );
        // Region suffix for global uniqueness
        assert!(
            properties["BucketName"]
                .as_str()
                .unwrap()
                .ends_with("-us-east-1")
        );
    }
}

#[tokio::test]
async fn test_instance_profile_is_region_scoped() {
    let synthesis = synth_default().await;
    let profiles = properties_of(&synthesis.template, "AWS::IAM::InstanceProfile");
    assert_eq!(profiles.len(), 1);
    assert_eq!(
        profiles[0]["InstanceProfileName"],
        "Nf-Instance-Profile-us-east-1"
    );

    assert_eq!(
        synthesis.template.resources_of_type("AWS::IAM::Role").count(),
        4
    );
}

#[tokio::test]
async fn test_missing_userdata_script_fails() {
    let project = test_project();
    std::fs::remove_file(project.path().join("launch_template/userdata_ebs.sh")).unwrap();

    let result = synth(&test_props(), &StubProbe::new(), &project).await;
    assert!(matches!(result, Err(NfError::ConfigError(_))));
}

#[tokio::test]
async fn test_missing_build_context_fails() {
    let project = test_project();
    std::fs::remove_file(project.path().join("docker_gotc/Dockerfile")).unwrap();

    let result = synth(&test_props(), &StubProbe::new(), &project).await;
    assert!(matches!(result, Err(NfError::ConfigError(_))));
}
