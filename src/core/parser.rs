//! YAML parsing and validation.
//!
//! Parses stack.yaml and validates structural constraints:
//! - Version must be "1.0", stack name must be a valid stack name
//! - Subnet layout must fit the network's address space
//! - Security group, role, and subnet references must exist
//! - Compute lands in public subnets, databases in isolated ones
//! - Under `policy.strict`, audit warnings are errors too

use super::audit::{self, Severity};
use super::cidr::Ipv4Cidr;
use super::resolver;
use super::types::*;
use crate::constructs::network;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static STACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("static regex"));
static CONSTRUCT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("static regex"));
static IMAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ami-[0-9a-f]{8,17}$").expect("static regex"));

const MIN_STORAGE_GIB: u32 = 20;
const MAX_STORAGE_GIB: u32 = 65536;
const MIN_NETWORK_PREFIX: u8 = 16;
const MAX_SUBNET_PREFIX: u8 = 28;

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a stack.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<StackConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_config(&content)
}

/// Parse a stack.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<StackConfig> {
    serde_yaml_ng::from_str(yaml).map_err(|e| Error::Parse(e.to_string()))
}

/// Parse and resolve templates, then fail with every validation error at once.
pub fn parse_and_validate(path: &Path) -> Result<StackConfig> {
    let config = resolver::resolve_config(&parse_config_file(path)?)?;
    let errors = validate_config(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(Error::Validation(errors))
    }
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &StackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut err = |message: String| errors.push(ValidationError { message });

    if config.version != "1.0" {
        err(format!("version must be \"1.0\", got \"{}\"", config.version));
    }
    if config.name.is_empty() {
        err("name must not be empty".to_string());
    } else if !STACK_NAME.is_match(&config.name) {
        err(format!(
            "name '{}' must start with a letter and contain only letters, digits and '-'",
            config.name
        ));
    }

    validate_ids(config, &mut err);
    validate_network(&config.network, &mut err);
    validate_security_groups(config, &mut err);
    validate_roles(config, &mut err);
    validate_instances(config, &mut err);
    validate_databases(config, &mut err);

    if config.policy.strict {
        for finding in audit::audit(config) {
            if finding.severity == Severity::Warning {
                err(format!("strict policy: {}", finding));
            }
        }
    }

    errors
}

fn validate_ids(config: &StackConfig, err: &mut impl FnMut(String)) {
    let ids = std::iter::once(config.network.id.as_str())
        .chain(config.security_groups.keys().map(String::as_str))
        .chain(config.roles.keys().map(String::as_str))
        .chain(config.instances.keys().map(String::as_str))
        .chain(config.databases.keys().map(String::as_str));

    let mut seen = HashSet::new();
    for id in ids {
        if !CONSTRUCT_ID.is_match(id) {
            err(format!(
                "construct id '{}' must start with a letter and contain only letters, digits, '_' and '-'",
                id
            ));
        }
        if !seen.insert(id) {
            err(format!("construct id '{}' is declared more than once", id));
        }
    }
}

fn validate_network(net: &NetworkSpec, err: &mut impl FnMut(String)) {
    let cidr = match net.cidr.parse::<Ipv4Cidr>() {
        Ok(c) => Some(c),
        Err(e) => {
            err(format!("network '{}': invalid cidr: {}", net.id, e));
            None
        }
    };
    if let Some(c) = cidr {
        if !(MIN_NETWORK_PREFIX..=MAX_SUBNET_PREFIX).contains(&c.prefix()) {
            err(format!(
                "network '{}': cidr prefix /{} must be between /{} and /{}",
                net.id,
                c.prefix(),
                MIN_NETWORK_PREFIX,
                MAX_SUBNET_PREFIX
            ));
        }
    }

    if net.max_azs == 0 {
        err(format!("network '{}': max_azs must be at least 1", net.id));
    }
    if net.subnets.is_empty() {
        err(format!("network '{}' declares no subnet groups", net.id));
    }

    let mut names = HashSet::new();
    let mut masks_ok = true;
    for group in &net.subnets {
        if group.name.is_empty() {
            err(format!("network '{}': subnet group name must not be empty", net.id));
        } else if !names.insert(group.name.as_str()) {
            err(format!(
                "network '{}': subnet group '{}' is declared more than once",
                net.id, group.name
            ));
        }
        let lower = cidr.map_or(MIN_NETWORK_PREFIX, |c| c.prefix().max(MIN_NETWORK_PREFIX));
        if !(lower..=MAX_SUBNET_PREFIX).contains(&group.cidr_mask) {
            masks_ok = false;
            err(format!(
                "network '{}': subnet group '{}' cidr_mask /{} must be between /{} and /{}",
                net.id, group.name, group.cidr_mask, lower, MAX_SUBNET_PREFIX
            ));
        }
    }

    // Only meaningful once every individual mask is sane.
    if cidr.is_some() && masks_ok && net.max_azs > 0 {
        if let Err(e) = network::allocate_subnets(net) {
            err(format!("network '{}': {}", net.id, e));
        }
    }
}

fn has_subnet_type(net: &NetworkSpec, t: SubnetType) -> bool {
    net.subnets.iter().any(|g| g.subnet_type == t)
}

fn validate_security_groups(config: &StackConfig, err: &mut impl FnMut(String)) {
    for (id, sg) in &config.security_groups {
        for rule in &sg.ingress {
            if rule.port == 0 {
                err(format!("security group '{}': ingress port must not be 0", id));
            }
            if let Peer::SecurityGroup(peer) = &rule.peer {
                if peer == id {
                    err(format!(
                        "security group '{}': ingress peer references itself",
                        id
                    ));
                } else if !config.security_groups.contains_key(peer) {
                    err(format!(
                        "security group '{}': ingress peer references unknown security group '{}'",
                        id, peer
                    ));
                }
            }
        }
    }
}

fn validate_roles(config: &StackConfig, err: &mut impl FnMut(String)) {
    for (id, role) in &config.roles {
        if role.assumed_by.trim().is_empty() {
            err(format!("role '{}' has no service principal (assumed_by)", id));
        }
        if role.managed_policies.is_empty() {
            err(format!("role '{}' has no managed policies", id));
        }
        if role.managed_policies.iter().any(|p| p.trim().is_empty()) {
            err(format!("role '{}' has an empty managed policy name", id));
        }
    }
}

fn validate_instances(config: &StackConfig, err: &mut impl FnMut(String)) {
    for (id, inst) in &config.instances {
        if !config.security_groups.contains_key(&inst.security_group) {
            err(format!(
                "instance '{}' references unknown security group '{}'",
                id, inst.security_group
            ));
        }
        if !config.roles.contains_key(&inst.role) {
            err(format!("instance '{}' references unknown role '{}'", id, inst.role));
        }
        if inst.subnet_type != SubnetType::Public {
            err(format!(
                "instance '{}' must be placed in a public subnet, got {}",
                id, inst.subnet_type
            ));
        } else if !has_subnet_type(&config.network, SubnetType::Public) {
            err(format!(
                "instance '{}' needs a public subnet group in network '{}'",
                id, config.network.id
            ));
        }

        if inst.machine_image.is_empty() {
            err(format!("instance '{}' has no machine image", id));
        }
        for (region, image) in &inst.machine_image {
            if !IMAGE_ID.is_match(image) {
                err(format!(
                    "instance '{}': '{}' is not a valid image id for region {}",
                    id, image, region
                ));
            }
        }
        if let Some(region) = &config.env.region {
            if !inst.machine_image.is_empty() && !inst.machine_image.contains_key(region) {
                err(format!(
                    "instance '{}': no machine image for region '{}' (image not found)",
                    id, region
                ));
            }
        }
    }
}

fn validate_databases(config: &StackConfig, err: &mut impl FnMut(String)) {
    for (id, db) in &config.databases {
        let supported = db.engine.supported_versions();
        if !supported.contains(&db.engine_version.as_str()) {
            err(format!(
                "database '{}': {} version '{}' is not supported (expected one of: {})",
                id,
                db.engine.as_str(),
                db.engine_version,
                supported.join(", ")
            ));
        }
        if db.subnet_type != SubnetType::PrivateIsolated {
            err(format!(
                "database '{}' must be placed in a private_isolated subnet, got {}",
                id, db.subnet_type
            ));
        } else if !has_subnet_type(&config.network, SubnetType::PrivateIsolated) {
            err(format!(
                "database '{}' needs a private_isolated subnet group in network '{}'",
                id, config.network.id
            ));
        }
        if config.network.max_azs < 2 {
            err(format!(
                "database '{}' needs subnets in at least 2 availability zones, network has {}",
                id, config.network.max_azs
            ));
        }
        if !(MIN_STORAGE_GIB..=MAX_STORAGE_GIB).contains(&db.allocated_storage) {
            err(format!(
                "database '{}': allocated_storage {} GiB must be between {} and {}",
                id, db.allocated_storage, MIN_STORAGE_GIB, MAX_STORAGE_GIB
            ));
        }
        if db.security_groups.is_empty() {
            err(format!("database '{}' has no security groups", id));
        }
        for sg in &db.security_groups {
            if !config.security_groups.contains_key(sg) {
                err(format!(
                    "database '{}' references unknown security group '{}'",
                    id, sg
                ));
            }
        }
        if db.credentials.username.trim().is_empty() {
            err(format!("database '{}' has an empty master username", id));
        }
    }
}
