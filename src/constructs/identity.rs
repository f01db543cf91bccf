//! Service roles.

use super::{cfn, join, ref_, Scope};
use crate::core::types::RoleSpec;
use serde_json::{json, Value};

/// Provider-managed policy ARN, partition-relative.
pub fn managed_policy_arn(name: &str) -> Value {
    join(vec![
        json!("arn:"),
        ref_("AWS::Partition"),
        Value::String(format!(":iam::aws:policy/{}", name)),
    ])
}

/// Trust policy letting one service principal assume the role.
pub fn assume_role_policy(service: &str) -> Value {
    json!({
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": service },
        }],
        "Version": "2012-10-17",
    })
}

/// Add a role; returns its logical id.
pub fn build(scope: &mut Scope, id: &str, spec: &RoleSpec) -> String {
    let mut props = json!({
        "AssumeRolePolicyDocument": assume_role_policy(&spec.assumed_by),
    });
    if let Some(description) = &spec.description {
        props["Description"] = json!(description);
    }
    if !spec.managed_policies.is_empty() {
        props["ManagedPolicyArns"] = Value::Array(
            spec.managed_policies
                .iter()
                .map(|p| managed_policy_arn(p))
                .collect(),
        );
    }
    scope.add(&[id, "Resource"], cfn::ROLE, props)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role() -> RoleSpec {
        RoleSpec {
            assumed_by: "ec2.amazonaws.com".to_string(),
            managed_policies: vec!["AmazonSSMManagedInstanceCore".to_string()],
            description: None,
        }
    }

    #[test]
    fn test_role_trust_and_policies() {
        let mut scope = Scope::new("S");
        let id = build(&mut scope, "AppRole", &role());
        let r = scope.resource(&id).unwrap();
        assert_eq!(r.resource_type, cfn::ROLE);
        let stmt = &r.properties["AssumeRolePolicyDocument"]["Statement"][0];
        assert_eq!(stmt["Principal"]["Service"], "ec2.amazonaws.com");
        assert_eq!(stmt["Action"], "sts:AssumeRole");
        let arns = r.properties["ManagedPolicyArns"].as_array().unwrap();
        assert_eq!(arns.len(), 1);
        assert_eq!(
            arns[0]["Fn::Join"][1][2],
            ":iam::aws:policy/AmazonSSMManagedInstanceCore"
        );
        assert!(!r.properties.contains_key("Policies"));
    }

    #[test]
    fn test_role_arn_is_partition_relative() {
        let arn = managed_policy_arn("ReadOnlyAccess");
        assert_eq!(arn["Fn::Join"][1][1], ref_("AWS::Partition"));
    }
}
