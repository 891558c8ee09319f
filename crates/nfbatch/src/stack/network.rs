use serde_json::{Value, json};

use cfngraph::resource::{ResourceRef, select_az};
use cfngraph::template::Template;

use crate::common::error::NfError;
use crate::config::Props;
use crate::probe::CloudProbe;

const VPC_CIDR: &str = "10.0.0.0/16";
const MAX_AZS: usize = 2;

/// Resolved network context, shared read-only with every downstream stage.
pub enum NetworkHandle {
    Created {
        vpc: ResourceRef,
        public_subnets: Vec<ResourceRef>,
        isolated_subnets: Vec<ResourceRef>,
        route_tables: Vec<ResourceRef>,
    },
    Existing {
        vpc_id: String,
        subnet_ids: Vec<String>,
    },
}

impl NetworkHandle {
    pub fn vpc(&self) -> Value {
        match self {
            NetworkHandle::Created { vpc, .. } => vpc.reference(),
            NetworkHandle::Existing { vpc_id, .. } => json!(vpc_id),
        }
    }

    /// Subnets that compute environments place instances into.
    pub fn compute_subnets(&self) -> Vec<Value> {
        match self {
            NetworkHandle::Created { public_subnets, .. } => {
                public_subnets.iter().map(|s| s.reference()).collect()
            }
            NetworkHandle::Existing { subnet_ids, .. } => {
                subnet_ids.iter().map(|id| json!(id)).collect()
            }
        }
    }

    /// Subnets that interface endpoints attach to.
    fn endpoint_subnets(&self) -> Vec<Value> {
        match self {
            NetworkHandle::Created {
                isolated_subnets, ..
            } => isolated_subnets.iter().map(|s| s.reference()).collect(),
            NetworkHandle::Existing { subnet_ids, .. } => {
                subnet_ids.iter().map(|id| json!(id)).collect()
            }
        }
    }
}

/// Based on the deployment properties, either look up or create the VPC,
/// then attach the S3 and ECR endpoints to it.
pub async fn build(
    template: &mut Template,
    props: &Props,
    probe: &dyn CloudProbe,
) -> crate::Result<NetworkHandle> {
    let handle = if props.vpc_exists {
        let tag = props.vpc_name_tag().ok_or_else(|| {
            NfError::ConfigError("vpc_exists is set but vpc_tags.Name is missing".to_string())
        })?;
        lookup_vpc_by_tag(probe, tag).await?
    } else {
        create_vpc(template)?
    };
    create_endpoints(template, &handle)?;
    Ok(handle)
}

/// Lookup an existing VPC and its subnets in the target account.
async fn lookup_vpc_by_tag(probe: &dyn CloudProbe, tag: &str) -> crate::Result<NetworkHandle> {
    log::warn!("Looking up existing VPC with tag {tag}");
    let vpc = probe
        .lookup_vpc(tag)
        .await
        .map_err(|e| NfError::LookupError(format!("{e:#}")))?;
    Ok(NetworkHandle::Existing {
        vpc_id: vpc.vpc_id,
        subnet_ids: vpc.subnet_ids,
    })
}

/// Creates a new VPC spanning up to two availability zones with zero NAT
/// gateways. Private subnets reach storage and the image registry through
/// the endpoints attached in [`create_endpoints`], not through NAT.
fn create_vpc(template: &mut Template) -> crate::Result<NetworkHandle> {
    log::warn!("Creating new VPC");

    let vpc = template.add(
        &["nf-batch-vpc"],
        "AWS::EC2::VPC",
        json!({
            "CidrBlock": VPC_CIDR,
            "EnableDnsSupport": true,
            "EnableDnsHostnames": true,
            "Tags": [{"Key": "Name", "Value": "nf-batch-vpc"}],
        }),
    )?;

    let igw = template.add(
        &["nf-batch-vpc", "igw"],
        "AWS::EC2::InternetGateway",
        json!({}),
    )?;
    let attachment = template.add(
        &["nf-batch-vpc", "igw-attachment"],
        "AWS::EC2::VPCGatewayAttachment",
        json!({
            "VpcId": vpc.reference(),
            "InternetGatewayId": igw.reference(),
        }),
    )?;

    let mut public_subnets = Vec::new();
    let mut isolated_subnets = Vec::new();
    let mut route_tables = Vec::new();
    for az in 0..MAX_AZS {
        let public = template.add(
            &["nf-batch-vpc", &format!("public-subnet-{az}")],
            "AWS::EC2::Subnet",
            json!({
                "VpcId": vpc.reference(),
                "CidrBlock": format!("10.0.{az}.0/24"),
                "AvailabilityZone": select_az(az),
                "MapPublicIpOnLaunch": true,
            }),
        )?;
        let route_table = template.add(
            &["nf-batch-vpc", &format!("public-route-table-{az}")],
            "AWS::EC2::RouteTable",
            json!({"VpcId": vpc.reference()}),
        )?;
        // The default route is only valid once the gateway is attached.
        template.add_dependent(
            &["nf-batch-vpc", &format!("public-route-{az}")],
            "AWS::EC2::Route",
            json!({
                "RouteTableId": route_table.reference(),
                "DestinationCidrBlock": "0.0.0.0/0",
                "GatewayId": igw.reference(),
            }),
            &[&attachment],
        )?;
        template.add(
            &["nf-batch-vpc", &format!("public-subnet-association-{az}")],
            "AWS::EC2::SubnetRouteTableAssociation",
            json!({
                "SubnetId": public.reference(),
                "RouteTableId": route_table.reference(),
            }),
        )?;
        public_subnets.push(public);
        route_tables.push(route_table);

        let isolated = template.add(
            &["nf-batch-vpc", &format!("isolated-subnet-{az}")],
            "AWS::EC2::Subnet",
            json!({
                "VpcId": vpc.reference(),
                "CidrBlock": format!("10.0.{}.0/24", 128 + az),
                "AvailabilityZone": select_az(az),
            }),
        )?;
        isolated_subnets.push(isolated);
    }

    Ok(NetworkHandle::Created {
        vpc,
        public_subnets,
        isolated_subnets,
        route_tables,
    })
}

/// Add S3 and ECR endpoints to the VPC
fn create_endpoints(template: &mut Template, handle: &NetworkHandle) -> crate::Result<()> {
    add_s3_gateway_endpoint(template, handle)?;
    add_ecr_interface_endpoint(template, handle)?;
    Ok(())
}

/// Gateway endpoint localizing S3 traffic to the VPC.
fn add_s3_gateway_endpoint(template: &mut Template, handle: &NetworkHandle) -> crate::Result<()> {
    let mut properties = json!({
        "VpcId": handle.vpc(),
        "ServiceName": {"Fn::Sub": "com.amazonaws.${AWS::Region}.s3"},
        "VpcEndpointType": "Gateway",
    });
    if let NetworkHandle::Created { route_tables, .. } = handle {
        properties["RouteTableIds"] = route_tables
            .iter()
            .map(|rt| rt.reference())
            .collect::<Vec<_>>()
            .into();
    }
    template.add(
        &["nf-batch-vpc", "s3-endpoint"],
        "AWS::EC2::VPCEndpoint",
        properties,
    )?;
    Ok(())
}

/// Interface endpoint keeping image registry traffic localized to the VPC.
fn add_ecr_interface_endpoint(
    template: &mut Template,
    handle: &NetworkHandle,
) -> crate::Result<()> {
    template.add(
        &["nf-batch-vpc", "ecr-endpoint"],
        "AWS::EC2::VPCEndpoint",
        json!({
            "VpcId": handle.vpc(),
            "ServiceName": {"Fn::Sub": "com.amazonaws.${AWS::Region}.ecr.dkr"},
            "VpcEndpointType": "Interface",
            "PrivateDnsEnabled": true,
            "SubnetIds": handle.endpoint_subnets(),
        }),
    )?;
    Ok(())
}
