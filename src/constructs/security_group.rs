//! Security groups: stateful allow-lists.
//!
//! Address-relative rules are inlined on the group. Group-relative rules
//! become standalone ingress resources whose source is the peer group's
//! `GroupId`, so a group may reference one declared after it.

use super::{cfn, get_att, ref_, Scope};
use crate::core::types::{IngressRule, Peer, SecurityGroupSpec};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{json, Value};

fn allow_all_egress() -> Value {
    json!({
        "CidrIp": "0.0.0.0/0",
        "Description": "Allow all outbound traffic by default",
        "IpProtocol": "-1",
    })
}

/// Matches no traffic; stands in for "no egress" since an empty egress
/// list means allow-all to the provider.
fn deny_all_egress() -> Value {
    json!({
        "CidrIp": "255.255.255.255/32",
        "Description": "Disallow all traffic",
        "FromPort": 252,
        "IpProtocol": "icmp",
        "ToPort": 86,
    })
}

fn rule_description(rule: &IngressRule) -> String {
    rule.description
        .clone()
        .unwrap_or_else(|| format!("from {}:{}", rule.peer, rule.port))
}

/// Expand every security group. Returns construct id -> logical id.
pub fn build_all(
    scope: &mut Scope,
    groups: &IndexMap<String, SecurityGroupSpec>,
    vpc_id: &str,
) -> Result<IndexMap<String, String>> {
    let mut ids = IndexMap::new();

    for (id, spec) in groups {
        let description = spec
            .description
            .clone()
            .unwrap_or_else(|| format!("{}/{}", scope.stack_name(), id));

        let ingress: Vec<Value> = spec
            .ingress
            .iter()
            .filter_map(|rule| {
                rule.peer.cidr_ip().map(|cidr| {
                    json!({
                        "CidrIp": cidr,
                        "Description": rule_description(rule),
                        "FromPort": rule.port,
                        "IpProtocol": rule.protocol.as_str(),
                        "ToPort": rule.port,
                    })
                })
            })
            .collect();

        let egress = if spec.allow_all_outbound {
            allow_all_egress()
        } else {
            deny_all_egress()
        };

        let mut props = json!({
            "GroupDescription": description,
            "SecurityGroupEgress": [egress],
            "VpcId": ref_(vpc_id),
        });
        if !ingress.is_empty() {
            props["SecurityGroupIngress"] = Value::Array(ingress);
        }

        let logical = scope.add(&[id.as_str(), "Resource"], cfn::SECURITY_GROUP, props);
        ids.insert(id.clone(), logical);
    }

    for (id, spec) in groups {
        let group_logical = &ids[id];
        for rule in &spec.ingress {
            let Peer::SecurityGroup(peer) = &rule.peer else {
                continue;
            };
            let peer_logical = ids.get(peer).ok_or_else(|| {
                Error::Synth(format!(
                    "security group '{}' references unknown security group '{}'",
                    id, peer
                ))
            })?;
            let rule_id = format!("from {}:{}", peer, rule.port);
            scope.add(
                &[id.as_str(), rule_id.as_str()],
                cfn::SECURITY_GROUP_INGRESS,
                json!({
                    "Description": rule_description(rule),
                    "FromPort": rule.port,
                    "GroupId": get_att(group_logical, "GroupId"),
                    "IpProtocol": rule.protocol.as_str(),
                    "SourceSecurityGroupId": get_att(peer_logical, "GroupId"),
                    "ToPort": rule.port,
                }),
            );
        }
    }

    tracing::debug!(groups = ids.len(), "security groups expanded");
    Ok(ids)
}
