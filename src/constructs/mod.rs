//! Construct handlers: expand each declaration into template resources.
//!
//! Each handler takes a resolved declaration plus the references produced
//! by the constructs it depends on, adds its resources to a [`Scope`], and
//! returns typed references for later constructs. References between
//! resources are intrinsic functions (`Ref`, `Fn::GetAtt`) resolved by the
//! deploy engine, never copied values.

pub mod database;
pub mod identity;
pub mod instance;
pub mod network;
pub mod security_group;

use crate::core::resolver::logical_id;
use crate::core::types::{CfnResource, DeletionPolicy};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// CloudFormation resource type names.
pub mod cfn {
    pub const VPC: &str = "AWS::EC2::VPC";
    pub const SUBNET: &str = "AWS::EC2::Subnet";
    pub const ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
    pub const ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
    pub const ROUTE: &str = "AWS::EC2::Route";
    pub const INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
    pub const GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
    pub const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
    pub const SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";
    pub const ROLE: &str = "AWS::IAM::Role";
    pub const INSTANCE_PROFILE: &str = "AWS::IAM::InstanceProfile";
    pub const INSTANCE: &str = "AWS::EC2::Instance";
    pub const DB_SUBNET_GROUP: &str = "AWS::RDS::DBSubnetGroup";
    pub const DB_INSTANCE: &str = "AWS::RDS::DBInstance";
    pub const SECRET: &str = "AWS::SecretsManager::Secret";
    pub const SECRET_ATTACHMENT: &str = "AWS::SecretsManager::SecretTargetAttachment";
}

/// Metadata key carrying the construct path of each resource.
pub const PATH_METADATA_KEY: &str = "migrastack:path";

/// Collects resources for one stack while constructs are expanded.
#[derive(Debug)]
pub struct Scope {
    stack: String,
    resources: IndexMap<String, CfnResource>,
    mappings: IndexMap<String, Value>,
    outputs: IndexMap<String, Value>,
    paths: IndexMap<String, String>,
}

/// Everything a scope collected, in insertion order.
#[derive(Debug)]
pub struct ScopeParts {
    pub resources: IndexMap<String, CfnResource>,
    pub mappings: IndexMap<String, Value>,
    pub outputs: IndexMap<String, Value>,
    /// Logical id -> construct path
    pub paths: IndexMap<String, String>,
}

impl Scope {
    pub fn new(stack: &str) -> Self {
        Self {
            stack: stack.to_string(),
            resources: IndexMap::new(),
            mappings: IndexMap::new(),
            outputs: IndexMap::new(),
            paths: IndexMap::new(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack
    }

    /// Add a resource at `path`, returning its logical id.
    pub fn add(&mut self, path: &[&str], resource_type: &str, properties: Value) -> String {
        self.add_with(path, resource_type, properties, |_| {})
    }

    /// Add a resource and adjust template-level attributes before insertion.
    pub fn add_with(
        &mut self,
        path: &[&str],
        resource_type: &str,
        properties: Value,
        configure: impl FnOnce(&mut CfnResource),
    ) -> String {
        let id = logical_id(path);
        let full_path = format!("{}/{}", self.stack, path.join("/"));

        let mut metadata = Map::new();
        metadata.insert(PATH_METADATA_KEY.to_string(), Value::String(full_path.clone()));

        let mut resource = CfnResource {
            resource_type: resource_type.to_string(),
            properties: into_map(properties),
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
            metadata,
        };
        configure(&mut resource);

        tracing::debug!(logical_id = %id, resource_type, path = %full_path, "add resource");
        self.paths.insert(id.clone(), full_path);
        self.resources.insert(id.clone(), resource);
        id
    }

    /// Add a template mapping, returning its name.
    pub fn add_mapping(&mut self, path: &[&str], body: Value) -> String {
        let name = logical_id(path);
        self.mappings.insert(name.clone(), body);
        name
    }

    /// Add a stack output, returning its name.
    pub fn add_output(&mut self, path: &[&str], description: &str, value: Value) -> String {
        let name = logical_id(path);
        self.outputs.insert(
            name.clone(),
            json!({ "Description": description, "Value": value }),
        );
        name
    }

    pub fn resource(&self, id: &str) -> Option<&CfnResource> {
        self.resources.get(id)
    }

    pub fn into_parts(self) -> ScopeParts {
        ScopeParts {
            resources: self.resources,
            mappings: self.mappings,
            outputs: self.outputs,
            paths: self.paths,
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("Value".to_string(), other);
            map
        }
    }
}

/// Apply a deletion policy to both deletion and update-replace.
pub fn set_removal(resource: &mut CfnResource, policy: DeletionPolicy) {
    resource.deletion_policy = Some(policy);
    resource.update_replace_policy = Some(policy);
}

// ============================================================================
// Intrinsic functions
// ============================================================================

pub fn ref_(id: &str) -> Value {
    json!({ "Ref": id })
}

pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

/// The `index`-th availability zone of the deploy region.
pub fn select_az(index: usize) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

pub fn join(parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": ["", parts] })
}

/// A `Name` tag list.
pub fn name_tag(value: &str) -> Value {
    json!([{ "Key": "Name", "Value": value }])
}

/// Pseudo parameters that `Ref` may target without a declared resource.
pub const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::NotificationARNs",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_add_records_path() {
        let mut scope = Scope::new("Demo");
        let id = scope.add(&["Vpc", "Resource"], cfn::VPC, json!({ "CidrBlock": "10.0.0.0/16" }));
        assert!(id.starts_with("Vpc"));
        let r = scope.resource(&id).unwrap();
        assert_eq!(r.resource_type, cfn::VPC);
        assert_eq!(r.properties["CidrBlock"], "10.0.0.0/16");
        assert_eq!(r.metadata[PATH_METADATA_KEY], "Demo/Vpc/Resource");
        let parts = scope.into_parts();
        assert_eq!(parts.paths[&id], "Demo/Vpc/Resource");
    }

    #[test]
    fn test_scope_add_with_configures() {
        let mut scope = Scope::new("Demo");
        let id = scope.add_with(&["Db"], cfn::DB_INSTANCE, json!({}), |r| {
            set_removal(r, DeletionPolicy::Retain);
            r.depends_on.push("Other".to_string());
        });
        let r = scope.resource(&id).unwrap();
        assert_eq!(r.deletion_policy, Some(DeletionPolicy::Retain));
        assert_eq!(r.update_replace_policy, Some(DeletionPolicy::Retain));
        assert_eq!(r.depends_on, vec!["Other"]);
        assert!(r.properties.is_empty());
    }

    #[test]
    fn test_scope_outputs_and_mappings() {
        let mut scope = Scope::new("Demo");
        let map = scope.add_mapping(&["Vm", "AmiMap"], json!({ "us-east-1": { "ami": "ami-12345678" } }));
        let out = scope.add_output(&["Vm", "InstanceId"], "instance id", ref_("Vm1234"));
        let parts = scope.into_parts();
        assert!(map.starts_with("VmAmiMap"));
        assert_eq!(parts.mappings[&map]["us-east-1"]["ami"], "ami-12345678");
        assert_eq!(parts.outputs[&out]["Value"], ref_("Vm1234"));
        assert!(parts.resources.is_empty());
    }

    #[test]
    fn test_intrinsics() {
        assert_eq!(ref_("X"), json!({ "Ref": "X" }));
        assert_eq!(get_att("Sg", "GroupId"), json!({ "Fn::GetAtt": ["Sg", "GroupId"] }));
        assert_eq!(select_az(1)["Fn::Select"][0], 1);
        assert_eq!(name_tag("n")[0]["Key"], "Name");
    }
}
