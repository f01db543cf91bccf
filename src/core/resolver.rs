//! Template resolution and logical id derivation.
//!
//! Resolves `{{params.key}}`, `{{env.region}}` and `{{env.account}}`
//! templates in declaration strings, and derives deterministic
//! CloudFormation logical ids from construct paths.

use super::types::*;
use crate::error::{Error, Result};
use indexmap::IndexMap;

const MAX_LOGICAL_ID_LEN: usize = 255;
const HASH_LEN: usize = 8;

/// Resolve all template variables in a string.
pub fn resolve_template(
    template: &str,
    params: &IndexMap<String, serde_yaml_ng::Value>,
    env: &Env,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..]
            .find("}}")
            .ok_or_else(|| Error::Template(format!("unclosed template at position {}", open)))?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim();

        let value = if let Some(param_key) = key.strip_prefix("params.") {
            params
                .get(param_key)
                .map(yaml_value_to_string)
                .ok_or_else(|| Error::Template(format!("unknown param: {}", param_key)))?
        } else if let Some(field) = key.strip_prefix("env.") {
            let value = match field {
                "region" => env.region.as_ref(),
                "account" => env.account.as_ref(),
                _ => return Err(Error::Template(format!("unknown env field: {}", field))),
            };
            value.cloned().ok_or_else(|| {
                Error::Template(format!("env.{} is referenced but not set", field))
            })?
        } else {
            return Err(Error::Template(format!("unknown template variable: {}", key)));
        };

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

/// Resolve templates in every string field of a declaration.
pub fn resolve_config(config: &StackConfig) -> Result<StackConfig> {
    let params = &config.params;
    let env = &config.env;
    let r = |s: &str| resolve_template(s, params, env);
    let r_opt = |s: &Option<String>| s.as_deref().map(|v| resolve_template(v, params, env)).transpose();

    let mut resolved = config.clone();
    resolved.description = r_opt(&config.description)?;

    for sg in resolved.security_groups.values_mut() {
        sg.description = r_opt(&sg.description)?;
        for rule in &mut sg.ingress {
            rule.description = r_opt(&rule.description)?;
        }
    }

    for role in resolved.roles.values_mut() {
        role.assumed_by = r(role.assumed_by.as_str())?;
        role.description = r_opt(&role.description)?;
        for policy in &mut role.managed_policies {
            *policy = r(policy.as_str())?;
        }
    }

    for inst in resolved.instances.values_mut() {
        for image in inst.machine_image.values_mut() {
            *image = r(image.as_str())?;
        }
        inst.user_data = r_opt(&inst.user_data)?;
    }

    for db in resolved.databases.values_mut() {
        db.engine_version = r(db.engine_version.as_str())?;
        db.credentials.username = r(db.credentials.username.as_str())?;
    }

    Ok(resolved)
}

/// Derive a logical id from a construct path.
///
/// Alphanumeric characters of each component are concatenated (a trailing
/// `Resource` component is dropped) and suffixed with the first 8 upper-case
/// hex digits of the BLAKE3 hash of the `/`-joined path.
pub fn logical_id(path: &[&str]) -> String {
    let mut human: Vec<&str> = path.to_vec();
    if human.len() > 1 && human.last() == Some(&"Resource") {
        human.pop();
    }
    let mut id: String = human
        .iter()
        .flat_map(|c| c.chars())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    id.truncate(MAX_LOGICAL_ID_LEN - HASH_LEN);

    let digest = blake3::hash(path.join("/").as_bytes()).to_hex();
    id.push_str(&digest[..HASH_LEN].to_ascii_uppercase());
    id
}
