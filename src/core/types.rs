//! Declaration schema for stacks, synthesized templates, assembly manifests,
//! and provenance events.
//!
//! Every declaration type derives Serialize/Deserialize for YAML roundtripping
//! and JsonSchema so `migrastack schema` can describe `stack.yaml`.

use super::cidr::Ipv4Cidr;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Top-level stack.yaml
// ============================================================================

/// Root declaration: the desired state of one stack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StackConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Stack name, used as the template description prefix and in construct paths
    pub name: String,

    /// Optional description emitted into the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target environment; region-agnostic when unset
    #[serde(default)]
    pub env: Env,

    /// Global parameters (templatable as `{{params.key}}`)
    #[serde(default)]
    #[schemars(with = "HashMap<String, serde_json::Value>")]
    pub params: IndexMap<String, serde_yaml_ng::Value>,

    /// Virtual network
    pub network: NetworkSpec,

    /// Firewall rule sets (order-preserving)
    #[serde(default)]
    pub security_groups: IndexMap<String, SecurityGroupSpec>,

    /// Service identities
    #[serde(default)]
    pub roles: IndexMap<String, RoleSpec>,

    /// Compute instances
    #[serde(default)]
    pub instances: IndexMap<String, InstanceSpec>,

    /// Managed relational databases
    #[serde(default)]
    pub databases: IndexMap<String, DatabaseSpec>,

    /// Synthesis policy
    #[serde(default)]
    pub policy: Policy,
}

impl StackConfig {
    /// Number of top-level declarations (the network counts as one).
    pub fn declaration_count(&self) -> usize {
        1 + self.security_groups.len() + self.roles.len() + self.instances.len() + self.databases.len()
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Env {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

// ============================================================================
// Network
// ============================================================================

/// A virtual network spanning `max_azs` availability zones.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NetworkSpec {
    /// Construct id of the network
    #[serde(default = "default_network_id")]
    pub id: String,

    /// Address space of the whole network
    #[serde(default = "default_network_cidr")]
    pub cidr: String,

    /// Number of availability zones to spread subnets over
    #[serde(default = "default_max_azs")]
    pub max_azs: u8,

    /// Subnet groups; each yields one subnet per availability zone
    pub subnets: Vec<SubnetGroup>,
}

fn default_network_id() -> String {
    "Network".to_string()
}

fn default_network_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_max_azs() -> u8 {
    2
}

/// One subnet per AZ of the given kind.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubnetGroup {
    pub name: String,

    #[serde(default = "default_cidr_mask")]
    pub cidr_mask: u8,

    #[serde(rename = "type")]
    pub subnet_type: SubnetType,
}

fn default_cidr_mask() -> u8 {
    24
}

/// Subnet routability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    /// Routed to the internet through an internet gateway
    Public,
    /// No route to an internet gateway or NAT
    PrivateIsolated,
}

impl SubnetType {
    /// Value of the `aws-cdk:subnet-type` tag.
    pub fn tag_value(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateIsolated => "Isolated",
        }
    }
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::PrivateIsolated => write!(f, "private_isolated"),
        }
    }
}

// ============================================================================
// Security groups
// ============================================================================

/// An allow-list of traffic rules.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SecurityGroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_true")]
    pub allow_all_outbound: bool,

    #[serde(default)]
    pub ingress: Vec<IngressRule>,
}

/// Inbound allow rule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngressRule {
    /// `any_ipv4`, a CIDR block, or `security_group:<id>`
    #[schemars(with = "String")]
    pub peer: Peer,

    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Transport protocol of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// Traffic source of an ingress rule.
///
/// Group peers are typed identifiers resolved by the deploy engine, so
/// instances can change addresses without rule updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Peer {
    AnyIpv4,
    Cidr(Ipv4Cidr),
    SecurityGroup(String),
}

const SECURITY_GROUP_PEER_PREFIX: &str = "security_group:";

impl Peer {
    pub fn security_group(id: &str) -> Self {
        Self::SecurityGroup(id.to_string())
    }

    /// The CIDR this peer matches, if it is address-relative.
    pub fn cidr_ip(&self) -> Option<String> {
        match self {
            Self::AnyIpv4 => Some("0.0.0.0/0".to_string()),
            Self::Cidr(c) => Some(c.to_string()),
            Self::SecurityGroup(_) => None,
        }
    }

    pub fn is_any(&self) -> bool {
        match self {
            Self::AnyIpv4 => true,
            Self::Cidr(c) => c.is_any(),
            Self::SecurityGroup(_) => false,
        }
    }
}

impl TryFrom<String> for Peer {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let s = s.trim();
        if s == "any_ipv4" || s == "0.0.0.0/0" {
            return Ok(Self::AnyIpv4);
        }
        if let Some(id) = s.strip_prefix(SECURITY_GROUP_PEER_PREFIX) {
            if id.is_empty() {
                return Err("security_group peer needs an id".to_string());
            }
            return Ok(Self::SecurityGroup(id.to_string()));
        }
        s.parse::<Ipv4Cidr>().map(Self::Cidr)
    }
}

impl From<Peer> for String {
    fn from(p: Peer) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyIpv4 => write!(f, "any_ipv4"),
            Self::Cidr(c) => write!(f, "{}", c),
            Self::SecurityGroup(id) => write!(f, "{}{}", SECURITY_GROUP_PEER_PREFIX, id),
        }
    }
}

// ============================================================================
// Identities
// ============================================================================

/// A role assumable by a service principal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RoleSpec {
    /// Service principal, e.g. `ec2.amazonaws.com`
    pub assumed_by: String,

    /// Provider-managed policy names
    #[serde(default)]
    pub managed_policies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// Compute
// ============================================================================

/// A single virtual machine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstanceSpec {
    #[serde(default = "default_public")]
    pub subnet_type: SubnetType,

    #[schemars(with = "String")]
    pub instance_type: InstanceType,

    /// Region -> image id
    pub machine_image: IndexMap<String, String>,

    pub security_group: String,

    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

fn default_public() -> SubnetType {
    SubnetType::Public
}

/// Instance size, `class.size` (e.g. `t3.micro`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceType {
    pub class: String,
    pub size: String,
}

impl InstanceType {
    pub fn new(class: &str, size: &str) -> Self {
        Self {
            class: class.to_string(),
            size: size.to_string(),
        }
    }

    /// Name as used by the compute service.
    pub fn ec2_name(&self) -> String {
        format!("{}.{}", self.class, self.size)
    }

    /// Name as used by the database service (`db.` prefixed).
    pub fn rds_name(&self) -> String {
        format!("db.{}.{}", self.class, self.size)
    }
}

impl TryFrom<String> for InstanceType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if trimmed.starts_with("db.") {
            return Err(format!(
                "instance type '{}' must not carry the 'db.' prefix (use class.size)",
                s
            ));
        }
        let (class, size) = trimmed
            .split_once('.')
            .ok_or_else(|| format!("instance type '{}' must look like class.size", s))?;
        let class_ok = class.chars().next().is_some_and(|c| c.is_ascii_lowercase())
            && class.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        let size_ok = !size.is_empty() && size.chars().all(|c| c.is_ascii_alphanumeric());
        if !class_ok || !size_ok {
            return Err(format!("instance type '{}' must look like class.size", s));
        }
        Ok(Self::new(class, size))
    }
}

impl From<InstanceType> for String {
    fn from(t: InstanceType) -> Self {
        t.ec2_name()
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}

// ============================================================================
// Databases
// ============================================================================

/// A managed relational database instance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseSpec {
    pub engine: DatabaseEngine,

    pub engine_version: String,

    #[serde(default = "default_isolated")]
    pub subnet_type: SubnetType,

    #[schemars(with = "String")]
    pub instance_type: InstanceType,

    /// Storage in GiB
    pub allocated_storage: u32,

    #[serde(default)]
    pub security_groups: Vec<String>,

    /// What happens to the data when the declaration is removed
    #[serde(default)]
    pub removal_policy: RemovalPolicy,

    #[serde(default)]
    pub credentials: Credentials,
}

fn default_isolated() -> SubnetType {
    SubnetType::PrivateIsolated
}

/// Database engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mysql,
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
        }
    }

    /// Major versions accepted for this engine.
    pub fn supported_versions(&self) -> &'static [&'static str] {
        match self {
            Self::Mysql => &["5.7", "8.0", "8.4"],
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Mysql => 3306,
        }
    }
}

/// Generated master credentials.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Credentials {
    #[serde(default = "default_username")]
    pub username: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: default_username(),
        }
    }
}

fn default_username() -> String {
    "admin".to_string()
}

/// Action taken on a resource's data when it leaves the stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
    #[default]
    Snapshot,
}

impl RemovalPolicy {
    pub fn deletion_policy(&self) -> DeletionPolicy {
        match self {
            Self::Destroy => DeletionPolicy::Delete,
            Self::Retain => DeletionPolicy::Retain,
            Self::Snapshot => DeletionPolicy::Snapshot,
        }
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Synthesis policy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Policy {
    /// Treat audit warnings as validation errors
    #[serde(default)]
    pub strict: bool,

    /// Append provenance events to the assembly's event log
    #[serde(default = "default_true")]
    pub events: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            strict: false,
            events: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Template
// ============================================================================

/// A deployable CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Mappings", default, skip_serializing_if = "IndexMap::is_empty")]
    pub mappings: IndexMap<String, serde_json::Value>,

    #[serde(rename = "Resources")]
    pub resources: IndexMap<String, CfnResource>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, serde_json::Value>,
}

/// One resource entry of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfnResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(rename = "DeletionPolicy", default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,

    #[serde(rename = "UpdateReplacePolicy", default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,

    #[serde(rename = "Metadata", default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Template-level deletion / update-replace policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
    Snapshot,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "Delete"),
            Self::Retain => write!(f, "Retain"),
            Self::Snapshot => write!(f, "Snapshot"),
        }
    }
}

// ============================================================================
// Assembly manifest
// ============================================================================

/// Written next to the template; records what was synthesized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version
    pub schema: String,

    pub stack: String,

    /// When the assembly was generated
    pub generated_at: String,

    /// Generator version
    pub generator: String,

    /// Template file name, relative to the assembly directory
    pub template_file: String,

    /// BLAKE3 of the template file bytes
    pub template_hash: String,

    /// BLAKE3 of the declaration the template was built from
    pub config_hash: String,

    /// Per-resource entries, in template order
    pub resources: IndexMap<String, ManifestResource>,
}

/// Per-resource manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestResource {
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Construct path the logical id was derived from
    pub path: String,

    /// BLAKE3 of the resource's canonical JSON body
    pub hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
}

// ============================================================================
// Provenance events
// ============================================================================

/// Provenance event for the JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvenanceEvent {
    SynthStarted {
        stack: String,
        run_id: String,
        migrastack_version: String,
    },
    ResourceSynthesized {
        stack: String,
        logical_id: String,
        resource_type: String,
        hash: String,
    },
    SynthCompleted {
        stack: String,
        run_id: String,
        resources: u32,
        template_hash: String,
        total_seconds: f64,
    },
    AssemblyTampered {
        stack: String,
        logical_id: String,
        expected_hash: String,
        actual_hash: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: ProvenanceEvent,
}

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template resolution.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_config_parse() {
        let yaml = r#"
version: "1.0"
name: demo
env:
  region: eu-west-1
network:
  id: Vpc
  max_azs: 2
  subnets:
    - name: Public
      type: public
    - name: Private
      cidr_mask: 26
      type: private_isolated
security_groups:
  Web:
    ingress:
      - peer: any_ipv4
        port: 443
"#;
        let config: StackConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.env.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.network.cidr, "10.0.0.0/16");
        assert_eq!(config.network.subnets[0].cidr_mask, 24);
        assert_eq!(config.network.subnets[1].cidr_mask, 26);
        assert_eq!(config.network.subnets[1].subnet_type, SubnetType::PrivateIsolated);
        let web = &config.security_groups["Web"];
        assert!(web.allow_all_outbound);
        assert_eq!(web.ingress[0].protocol, Protocol::Tcp);
        assert_eq!(web.ingress[0].peer, Peer::AnyIpv4);
        assert_eq!(config.declaration_count(), 2);
    }

    #[test]
    fn test_types_network_defaults() {
        let yaml = r#"
subnets:
  - name: Only
    type: public
"#;
        let n: NetworkSpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(n.id, "Network");
        assert_eq!(n.max_azs, 2);
        assert_eq!(n.cidr, "10.0.0.0/16");
    }

    #[test]
    fn test_types_peer_forms() {
        assert_eq!(Peer::try_from("any_ipv4".to_string()).unwrap(), Peer::AnyIpv4);
        assert_eq!(Peer::try_from("0.0.0.0/0".to_string()).unwrap(), Peer::AnyIpv4);
        assert_eq!(
            Peer::try_from("security_group:App".to_string()).unwrap(),
            Peer::security_group("App")
        );
        let cidr = Peer::try_from("10.1.0.0/16".to_string()).unwrap();
        assert_eq!(cidr.cidr_ip().as_deref(), Some("10.1.0.0/16"));
        assert!(!cidr.is_any());
        assert!(Peer::try_from("security_group:".to_string()).is_err());
        assert!(Peer::try_from("anywhere".to_string()).is_err());
    }

    #[test]
    fn test_types_peer_group_has_no_cidr() {
        let p = Peer::security_group("Db");
        assert!(p.cidr_ip().is_none());
        assert_eq!(p.to_string(), "security_group:Db");
    }

    #[test]
    fn test_types_bad_peer_is_parse_error() {
        let yaml = r#"
peer: 10.0.0.1/8
port: 22
"#;
        assert!(serde_yaml_ng::from_str::<IngressRule>(yaml).is_err());
    }

    #[test]
    fn test_types_instance_type() {
        let t = InstanceType::try_from("t3.micro".to_string()).unwrap();
        assert_eq!(t.ec2_name(), "t3.micro");
        assert_eq!(t.rds_name(), "db.t3.micro");
        let t = InstanceType::try_from("m5.large".to_string()).unwrap();
        assert_eq!(t, InstanceType::new("m5", "large"));
        assert!(InstanceType::try_from("micro".to_string()).is_err());
        assert!(InstanceType::try_from("T3.micro".to_string()).is_err());
        assert!(InstanceType::try_from("t3.".to_string()).is_err());
    }

    #[test]
    fn test_types_instance_type_rejects_db_prefix() {
        let err = InstanceType::try_from("db.t3.micro".to_string()).unwrap_err();
        assert!(err.contains("'db.' prefix"));
        let yaml = r#"
instance_type: db.t3.micro
machine_image:
  us-east-1: ami-08b5b3a93ed654d19
security_group: Web
role: WebRole
"#;
        assert!(serde_yaml_ng::from_str::<InstanceSpec>(yaml).is_err());
        let bare = yaml.replace("db.t3.micro", "t3.micro");
        assert!(serde_yaml_ng::from_str::<InstanceSpec>(&bare).is_ok());
    }

    #[test]
    fn test_types_removal_policy_mapping() {
        assert_eq!(RemovalPolicy::Destroy.deletion_policy(), DeletionPolicy::Delete);
        assert_eq!(RemovalPolicy::Retain.deletion_policy(), DeletionPolicy::Retain);
        assert_eq!(RemovalPolicy::default(), RemovalPolicy::Snapshot);
    }

    #[test]
    fn test_types_database_defaults() {
        let yaml = r#"
engine: mysql
engine_version: "8.0"
instance_type: t3.micro
allocated_storage: 20
"#;
        let db: DatabaseSpec = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(db.subnet_type, SubnetType::PrivateIsolated);
        assert_eq!(db.removal_policy, RemovalPolicy::Snapshot);
        assert_eq!(db.credentials.username, "admin");
        assert_eq!(db.engine.port(), 3306);
    }

    #[test]
    fn test_types_unknown_engine_rejected() {
        let yaml = r#"
engine: oracle
engine_version: "19"
instance_type: t3.micro
allocated_storage: 20
"#;
        assert!(serde_yaml_ng::from_str::<DatabaseSpec>(yaml).is_err());
    }

    #[test]
    fn test_types_policy_defaults() {
        let p = Policy::default();
        assert!(!p.strict);
        assert!(p.events);
    }

    #[test]
    fn test_types_cfn_resource_skips_empty_fields() {
        let r = CfnResource {
            resource_type: "AWS::EC2::InternetGateway".to_string(),
            properties: serde_json::Map::new(),
            depends_on: vec![],
            deletion_policy: None,
            update_replace_policy: None,
            metadata: serde_json::Map::new(),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"Type":"AWS::EC2::InternetGateway"}"#);
    }

    #[test]
    fn test_types_deletion_policy_serde() {
        let json = serde_json::to_string(&DeletionPolicy::Delete).unwrap();
        assert_eq!(json, "\"Delete\"");
    }

    #[test]
    fn test_types_provenance_event_serde() {
        let event = ProvenanceEvent::SynthStarted {
            stack: "demo".to_string(),
            run_id: "r-abc".to_string(),
            migrastack_version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"synth_started\""));
        assert!(json.contains("\"run_id\":\"r-abc\""));
    }

    #[test]
    fn test_types_yaml_value_to_string() {
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::String("hello".into())),
            "hello"
        );
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Bool(true)), "true");
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Null), "");
    }
}
