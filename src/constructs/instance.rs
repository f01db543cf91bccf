//! Compute instance with its instance profile.
//!
//! Placement is by subnet type: the first subnet of the requested type,
//! in the first availability zone. The machine image is either a literal
//! id (stack pinned to a region) or a per-region lookup table resolved by
//! the deploy engine.

use super::network::NetworkRefs;
use super::{cfn, get_att, name_tag, ref_, select_az, Scope};
use crate::core::types::{Env, InstanceSpec};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{json, Value};

/// Key under each region in the image lookup table.
const AMI_KEY: &str = "ami";

#[derive(Debug, Clone)]
pub struct InstanceRef {
    pub logical_id: String,
    pub profile_id: String,
}

/// Image id expression for `ImageId`.
fn machine_image(scope: &mut Scope, id: &str, spec: &InstanceSpec, env: &Env) -> Result<Value> {
    if let Some(region) = &env.region {
        let image = spec.machine_image.get(region).ok_or_else(|| {
            Error::Synth(format!(
                "instance '{}': image not found for region {}",
                id, region
            ))
        })?;
        return Ok(json!(image));
    }

    let table: serde_json::Map<String, Value> = spec
        .machine_image
        .iter()
        .map(|(region, image)| (region.clone(), json!({ AMI_KEY: image })))
        .collect();
    let map = scope.add_mapping(&[id, "AmiMap"], Value::Object(table));
    Ok(json!({ "Fn::FindInMap": [map, ref_("AWS::Region"), AMI_KEY] }))
}

/// Add the instance profile and instance.
pub fn build(
    scope: &mut Scope,
    id: &str,
    spec: &InstanceSpec,
    env: &Env,
    network: &NetworkRefs,
    security_groups: &IndexMap<String, String>,
    roles: &IndexMap<String, String>,
) -> Result<InstanceRef> {
    let subnet = network
        .subnets_of(spec.subnet_type)
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::Synth(format!(
                "instance '{}': no {} subnet to place it in",
                id, spec.subnet_type
            ))
        })?
        .logical_id
        .clone();
    let sg = security_groups.get(&spec.security_group).ok_or_else(|| {
        Error::Synth(format!(
            "instance '{}': unknown security group '{}'",
            id, spec.security_group
        ))
    })?;
    let role = roles
        .get(&spec.role)
        .ok_or_else(|| Error::Synth(format!("instance '{}': unknown role '{}'", id, spec.role)))?
        .clone();

    let profile_id = scope.add(
        &[id, "InstanceProfile"],
        cfn::INSTANCE_PROFILE,
        json!({ "Roles": [ref_(&role)] }),
    );

    let image = machine_image(scope, id, spec, env)?;
    let mut props = json!({
        "AvailabilityZone": select_az(0),
        "IamInstanceProfile": ref_(&profile_id),
        "ImageId": image,
        "InstanceType": spec.instance_type.ec2_name(),
        "SecurityGroupIds": [get_att(sg, "GroupId")],
        "SubnetId": ref_(&subnet),
        "Tags": name_tag(&format!("{}/{}", scope.stack_name(), id)),
    });
    if let Some(user_data) = &spec.user_data {
        props["UserData"] = json!({ "Fn::Base64": user_data });
    }

    let logical_id = scope.add_with(&[id, "Resource"], cfn::INSTANCE, props, |r| {
        r.depends_on.push(role)
    });

    scope.add_output(&[id, "InstanceId"], "Instance id", ref_(&logical_id));
    scope.add_output(
        &[id, "PublicIp"],
        "Public address of the instance",
        get_att(&logical_id, "PublicIp"),
    );

    tracing::debug!(instance = id, logical_id = %logical_id, "instance expanded");
    Ok(InstanceRef {
        logical_id,
        profile_id,
    })
}
