//! Virtual network: VPC, per-AZ subnets, route tables, internet gateway.
//!
//! Public subnets route `0.0.0.0/0` to an internet gateway. Isolated
//! subnets get a route table with no default route and no NAT.

use super::{cfn, name_tag, ref_, select_az, Scope};
use crate::core::cidr::{Ipv4Cidr, SubnetAllocator};
use crate::core::types::{NetworkSpec, SubnetType};
use crate::error::{Error, Result};
use serde_json::json;

/// A subnet's position in the layout, before any resource exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSubnet {
    pub group: String,
    pub subnet_type: SubnetType,
    /// Zero-based availability zone index
    pub az_index: usize,
    pub cidr: Ipv4Cidr,
}

/// A synthesized subnet.
#[derive(Debug, Clone)]
pub struct SubnetRef {
    pub logical_id: String,
    pub route_table_id: String,
    pub group: String,
    pub subnet_type: SubnetType,
    pub az_index: usize,
    pub cidr: Ipv4Cidr,
}

/// What the network exposes to later constructs.
#[derive(Debug, Clone)]
pub struct NetworkRefs {
    pub vpc_id: String,
    pub internet_gateway_id: Option<String>,
    pub gateway_attachment_id: Option<String>,
    pub subnets: Vec<SubnetRef>,
}

impl NetworkRefs {
    /// Subnets of one kind, in AZ order within declaration order.
    pub fn subnets_of(&self, subnet_type: SubnetType) -> Vec<&SubnetRef> {
        self.subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect()
    }
}

/// Lay out one subnet per group per AZ, group-major, carved sequentially
/// out of the network's address space.
pub fn allocate_subnets(net: &NetworkSpec) -> std::result::Result<Vec<PlannedSubnet>, String> {
    let parent: Ipv4Cidr = net.cidr.parse()?;
    let mut allocator = SubnetAllocator::new(parent);
    let mut planned = Vec::with_capacity(net.subnets.len() * usize::from(net.max_azs));

    for group in &net.subnets {
        for az_index in 0..usize::from(net.max_azs) {
            let cidr = allocator.allocate(group.cidr_mask)?;
            planned.push(PlannedSubnet {
                group: group.name.clone(),
                subnet_type: group.subnet_type,
                az_index,
                cidr,
            });
        }
    }
    Ok(planned)
}

/// Expand the network declaration into the scope.
pub fn build(scope: &mut Scope, net: &NetworkSpec) -> Result<NetworkRefs> {
    let planned = allocate_subnets(net).map_err(|e| Error::Synth(format!("network '{}': {}", net.id, e)))?;
    let id = net.id.as_str();
    let name = format!("{}/{}", scope.stack_name(), id);

    let vpc_id = scope.add(
        &[id, "Resource"],
        cfn::VPC,
        json!({
            "CidrBlock": net.cidr,
            "EnableDnsHostnames": true,
            "EnableDnsSupport": true,
            "InstanceTenancy": "default",
            "Tags": name_tag(&name),
        }),
    );

    let has_public = planned.iter().any(|p| p.subnet_type == SubnetType::Public);
    let (internet_gateway_id, gateway_attachment_id) = if has_public {
        let igw = scope.add(
            &[id, "IGW"],
            cfn::INTERNET_GATEWAY,
            json!({ "Tags": name_tag(&name) }),
        );
        let attach = scope.add(
            &[id, "VPCGW"],
            cfn::GATEWAY_ATTACHMENT,
            json!({
                "VpcId": ref_(&vpc_id),
                "InternetGatewayId": ref_(&igw),
            }),
        );
        (Some(igw), Some(attach))
    } else {
        (None, None)
    };

    let mut subnets = Vec::with_capacity(planned.len());
    for p in planned {
        let subnet_name = format!("{}Subnet{}", p.group, p.az_index + 1);
        let tag_name = format!("{}/{}", name, subnet_name);
        let is_public = p.subnet_type == SubnetType::Public;

        let subnet_id = scope.add(
            &[id, subnet_name.as_str(), "Subnet"],
            cfn::SUBNET,
            json!({
                "AvailabilityZone": select_az(p.az_index),
                "CidrBlock": p.cidr.to_string(),
                "MapPublicIpOnLaunch": is_public,
                "Tags": [
                    { "Key": "aws-cdk:subnet-name", "Value": p.group },
                    { "Key": "aws-cdk:subnet-type", "Value": p.subnet_type.tag_value() },
                    { "Key": "Name", "Value": tag_name },
                ],
                "VpcId": ref_(&vpc_id),
            }),
        );
        let route_table_id = scope.add(
            &[id, subnet_name.as_str(), "RouteTable"],
            cfn::ROUTE_TABLE,
            json!({
                "Tags": name_tag(&tag_name),
                "VpcId": ref_(&vpc_id),
            }),
        );
        scope.add(
            &[id, subnet_name.as_str(), "RouteTableAssociation"],
            cfn::ROUTE_TABLE_ASSOCIATION,
            json!({
                "RouteTableId": ref_(&route_table_id),
                "SubnetId": ref_(&subnet_id),
            }),
        );

        if is_public {
            if let (Some(igw), Some(attach)) = (&internet_gateway_id, &gateway_attachment_id) {
                let attach = attach.clone();
                scope.add_with(
                    &[id, subnet_name.as_str(), "DefaultRoute"],
                    cfn::ROUTE,
                    json!({
                        "DestinationCidrBlock": "0.0.0.0/0",
                        "GatewayId": ref_(igw),
                        "RouteTableId": ref_(&route_table_id),
                    }),
                    |r| r.depends_on.push(attach),
                );
            }
        }

        subnets.push(SubnetRef {
            logical_id: subnet_id,
            route_table_id,
            group: p.group,
            subnet_type: p.subnet_type,
            az_index: p.az_index,
            cidr: p.cidr,
        });
    }

    tracing::debug!(network = id, subnets = subnets.len(), "network expanded");
    Ok(NetworkRefs {
        vpc_id,
        internet_gateway_id,
        gateway_attachment_id,
        subnets,
    })
}
