//! The migration stack: a two-tier network with one public instance and
//! one isolated MySQL database reachable only from that instance.

use crate::core::types::{
    Credentials, DatabaseEngine, DatabaseSpec, Env, IngressRule, InstanceSpec, InstanceType,
    NetworkSpec, Peer, Policy, Protocol, RemovalPolicy, RoleSpec, SecurityGroupSpec, StackConfig,
    SubnetGroup, SubnetType,
};
use indexmap::IndexMap;

/// `stack.yaml` written by `migrastack init`.
pub const MIGRATION_STACK_YAML: &str = r#"version: "1.0"
name: AwsMigrationStack

network:
  id: MigrationVPC
  cidr: 10.0.0.0/16
  max_azs: 2
  subnets:
    - name: PublicSubnet
      cidr_mask: 24
      type: public
    - name: PrivateSubnet
      cidr_mask: 24
      type: private_isolated

security_groups:
  EC2SecurityGroup:
    description: Security group for EC2 instance
    allow_all_outbound: true
    ingress:
      - peer: any_ipv4
        port: 22
        description: Allow SSH
      - peer: any_ipv4
        port: 80
        description: Allow HTTP
  RDSSecurityGroup:
    description: Security group for RDS instance
    allow_all_outbound: true
    ingress:
      - peer: security_group:EC2SecurityGroup
        port: 3306
        description: Allow MySQL from EC2

roles:
  EC2IAMRole:
    assumed_by: ec2.amazonaws.com
    managed_policies:
      - AmazonSSMManagedInstanceCore

instances:
  MigrationEC2:
    subnet_type: public
    instance_type: t3.micro
    machine_image:
      us-east-1: ami-08b5b3a93ed654d19
    security_group: EC2SecurityGroup
    role: EC2IAMRole

databases:
  MigrationRDS:
    engine: mysql
    engine_version: "8.0"
    subnet_type: private_isolated
    instance_type: t3.micro
    allocated_storage: 20
    security_groups:
      - RDSSecurityGroup
    # deletes the data when the stack is removed
    removal_policy: destroy
"#;

fn rule(peer: Peer, port: u16, description: &str) -> IngressRule {
    IngressRule {
        peer,
        port,
        protocol: Protocol::Tcp,
        description: Some(description.to_string()),
    }
}

/// The migration stack, built in Rust.
pub fn migration_stack() -> StackConfig {
    let network = NetworkSpec {
        id: "MigrationVPC".to_string(),
        cidr: "10.0.0.0/16".to_string(),
        max_azs: 2,
        subnets: vec![
            SubnetGroup {
                name: "PublicSubnet".to_string(),
                cidr_mask: 24,
                subnet_type: SubnetType::Public,
            },
            SubnetGroup {
                name: "PrivateSubnet".to_string(),
                cidr_mask: 24,
                subnet_type: SubnetType::PrivateIsolated,
            },
        ],
    };

    let mut security_groups = IndexMap::new();
    security_groups.insert(
        "EC2SecurityGroup".to_string(),
        SecurityGroupSpec {
            description: Some("Security group for EC2 instance".to_string()),
            allow_all_outbound: true,
            ingress: vec![
                rule(Peer::AnyIpv4, 22, "Allow SSH"),
                rule(Peer::AnyIpv4, 80, "Allow HTTP"),
            ],
        },
    );
    security_groups.insert(
        "RDSSecurityGroup".to_string(),
        SecurityGroupSpec {
            description: Some("Security group for RDS instance".to_string()),
            allow_all_outbound: true,
            ingress: vec![rule(
                Peer::security_group("EC2SecurityGroup"),
                3306,
                "Allow MySQL from EC2",
            )],
        },
    );

    let mut roles = IndexMap::new();
    roles.insert(
        "EC2IAMRole".to_string(),
        RoleSpec {
            assumed_by: "ec2.amazonaws.com".to_string(),
            managed_policies: vec!["AmazonSSMManagedInstanceCore".to_string()],
            description: None,
        },
    );

    let mut machine_image = IndexMap::new();
    machine_image.insert("us-east-1".to_string(), "ami-08b5b3a93ed654d19".to_string());
    let mut instances = IndexMap::new();
    instances.insert(
        "MigrationEC2".to_string(),
        InstanceSpec {
            subnet_type: SubnetType::Public,
            instance_type: InstanceType::new("t3", "micro"),
            machine_image,
            security_group: "EC2SecurityGroup".to_string(),
            role: "EC2IAMRole".to_string(),
            user_data: None,
        },
    );

    let mut databases = IndexMap::new();
    databases.insert(
        "MigrationRDS".to_string(),
        DatabaseSpec {
            engine: DatabaseEngine::Mysql,
            engine_version: "8.0".to_string(),
            subnet_type: SubnetType::PrivateIsolated,
            instance_type: InstanceType::new("t3", "micro"),
            allocated_storage: 20,
            security_groups: vec!["RDSSecurityGroup".to_string()],
            removal_policy: RemovalPolicy::Destroy,
            credentials: Credentials::default(),
        },
    );

    StackConfig {
        version: "1.0".to_string(),
        name: "AwsMigrationStack".to_string(),
        description: None,
        env: Env::default(),
        params: IndexMap::new(),
        network,
        security_groups,
        roles,
        instances,
        databases,
        policy: Policy::default(),
    }
}
