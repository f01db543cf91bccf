//! Managed relational database with generated master credentials.

use super::network::NetworkRefs;
use super::{cfn, get_att, join, ref_, set_removal, Scope};
use crate::core::types::{DatabaseSpec, DeletionPolicy};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{json, Value};

const PASSWORD_LENGTH: u32 = 30;
/// Characters the engine rejects in master passwords, plus shell-hostile ones.
const EXCLUDE_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";

#[derive(Debug, Clone)]
pub struct DatabaseRef {
    pub logical_id: String,
    pub subnet_group_id: String,
    pub secret_id: String,
}

/// `{{resolve:secretsmanager:<secret>:SecretString:<key>::}}`
fn secret_value(secret_id: &str, key: &str) -> Value {
    join(vec![
        json!("{{resolve:secretsmanager:"),
        ref_(secret_id),
        Value::String(format!(":SecretString:{}::}}}}", key)),
    ])
}

pub fn build(
    scope: &mut Scope,
    id: &str,
    spec: &DatabaseSpec,
    network: &NetworkRefs,
    security_groups: &IndexMap<String, String>,
) -> Result<DatabaseRef> {
    let subnets: Vec<Value> = network
        .subnets_of(spec.subnet_type)
        .iter()
        .map(|s| ref_(&s.logical_id))
        .collect();
    if subnets.is_empty() {
        return Err(Error::Synth(format!(
            "database '{}': no {} subnets",
            id, spec.subnet_type
        )));
    }

    let mut vpc_security_groups = Vec::with_capacity(spec.security_groups.len());
    for sg in &spec.security_groups {
        let logical = security_groups.get(sg).ok_or_else(|| {
            Error::Synth(format!("database '{}': unknown security group '{}'", id, sg))
        })?;
        vpc_security_groups.push(get_att(logical, "GroupId"));
    }

    let subnet_group_id = scope.add(
        &[id, "SubnetGroup", "Default"],
        cfn::DB_SUBNET_GROUP,
        json!({
            "DBSubnetGroupDescription": format!("Subnet group for {} database", id),
            "SubnetIds": subnets,
        }),
    );

    let template = serde_json::to_string(&json!({ "username": spec.credentials.username }))
        .map_err(|e| Error::Serialize(e.to_string()))?;
    let description = format!("Generated by migrastack for stack: {}", scope.stack_name());
    let secret_id = scope.add_with(
        &[id, "Secret", "Resource"],
        cfn::SECRET,
        json!({
            "Description": description,
            "GenerateSecretString": {
                "ExcludeCharacters": EXCLUDE_CHARACTERS,
                "GenerateStringKey": "password",
                "PasswordLength": PASSWORD_LENGTH,
                "SecretStringTemplate": template,
            },
        }),
        |r| set_removal(r, DeletionPolicy::Delete),
    );

    let policy = spec.removal_policy.deletion_policy();
    let logical_id = scope.add_with(
        &[id, "Resource"],
        cfn::DB_INSTANCE,
        json!({
            "AllocatedStorage": spec.allocated_storage.to_string(),
            "CopyTagsToSnapshot": true,
            "DBInstanceClass": spec.instance_type.rds_name(),
            "DBSubnetGroupName": ref_(&subnet_group_id),
            "Engine": spec.engine.as_str(),
            "EngineVersion": spec.engine_version,
            "MasterUsername": secret_value(&secret_id, "username"),
            "MasterUserPassword": secret_value(&secret_id, "password"),
            "PubliclyAccessible": false,
            "StorageType": "gp2",
            "VPCSecurityGroups": vpc_security_groups,
        }),
        |r| set_removal(r, policy),
    );

    scope.add(
        &[id, "Secret", "Attachment", "Resource"],
        cfn::SECRET_ATTACHMENT,
        json!({
            "SecretId": ref_(&secret_id),
            "TargetId": ref_(&logical_id),
            "TargetType": cfn::DB_INSTANCE,
        }),
    );

    scope.add_output(
        &[id, "Endpoint"],
        "Database endpoint address",
        get_att(&logical_id, "Endpoint.Address"),
    );
    scope.add_output(&[id, "SecretArn"], "Master credentials secret", ref_(&secret_id));

    tracing::debug!(database = id, logical_id = %logical_id, deletion_policy = %policy, "database expanded");
    Ok(DatabaseRef {
        logical_id,
        subnet_group_id,
        secret_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::network;
    use crate::core::types::{
        Credentials, DatabaseEngine, InstanceType, NetworkSpec, RemovalPolicy, SubnetGroup,
        SubnetType,
    };

    fn spec(removal_policy: RemovalPolicy) -> DatabaseSpec {
        DatabaseSpec {
            engine: DatabaseEngine::Mysql,
            engine_version: "8.0".to_string(),
            subnet_type: SubnetType::PrivateIsolated,
            instance_type: InstanceType::new("t3", "micro"),
            allocated_storage: 20,
            security_groups: vec!["Db".to_string()],
            removal_policy,
            credentials: Credentials::default(),
        }
    }

    fn setup() -> (Scope, NetworkRefs, IndexMap<String, String>) {
        let mut scope = Scope::new("S");
        let net = NetworkSpec {
            id: "Vpc".to_string(),
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            subnets: vec![
                SubnetGroup {
                    name: "Public".to_string(),
                    cidr_mask: 24,
                    subnet_type: SubnetType::Public,
                },
                SubnetGroup {
                    name: "Private".to_string(),
                    cidr_mask: 24,
                    subnet_type: SubnetType::PrivateIsolated,
                },
            ],
        };
        let refs = network::build(&mut scope, &net).unwrap();
        let mut sgs = IndexMap::new();
        sgs.insert("Db".to_string(), "DbCCCC3333".to_string());
        (scope, refs, sgs)
    }

    #[test]
    fn test_database_properties() {
        let (mut scope, refs, sgs) = setup();
        let db = build(&mut scope, "Rds", &spec(RemovalPolicy::Destroy), &refs, &sgs).unwrap();
        let r = scope.resource(&db.logical_id).unwrap();
        assert_eq!(r.properties["AllocatedStorage"], "20");
        assert_eq!(r.properties["DBInstanceClass"], "db.t3.micro");
        assert_eq!(r.properties["Engine"], "mysql");
        assert_eq!(r.properties["EngineVersion"], "8.0");
        assert_eq!(r.properties["StorageType"], "gp2");
        assert_eq!(r.properties["VPCSecurityGroups"][0], get_att("DbCCCC3333", "GroupId"));
        assert_eq!(r.properties["DBSubnetGroupName"], ref_(&db.subnet_group_id));
        assert_eq!(r.deletion_policy, Some(DeletionPolicy::Delete));
        assert_eq!(r.update_replace_policy, Some(DeletionPolicy::Delete));
    }

    #[test]
    fn test_database_subnet_group_spans_isolated_subnets() {
        let (mut scope, refs, sgs) = setup();
        let db = build(&mut scope, "Rds", &spec(RemovalPolicy::Snapshot), &refs, &sgs).unwrap();
        let group = scope.resource(&db.subnet_group_id).unwrap();
        let ids: Vec<Value> = refs
            .subnets_of(SubnetType::PrivateIsolated)
            .iter()
            .map(|s| ref_(&s.logical_id))
            .collect();
        assert_eq!(group.properties["SubnetIds"], Value::Array(ids));
    }

    #[test]
    fn test_database_credentials_from_secret() {
        let (mut scope, refs, sgs) = setup();
        let db = build(&mut scope, "Rds", &spec(RemovalPolicy::Retain), &refs, &sgs).unwrap();
        let secret = scope.resource(&db.secret_id).unwrap();
        let gen = &secret.properties["GenerateSecretString"];
        assert_eq!(gen["PasswordLength"], 30);
        assert_eq!(gen["SecretStringTemplate"], r#"{"username":"admin"}"#);
        assert_eq!(secret.deletion_policy, Some(DeletionPolicy::Delete));

        let r = scope.resource(&db.logical_id).unwrap();
        let user = &r.properties["MasterUsername"]["Fn::Join"][1];
        assert_eq!(user[0], "{{resolve:secretsmanager:");
        assert_eq!(user[1], ref_(&db.secret_id));
        assert_eq!(user[2], ":SecretString:username::}}");
        assert_eq!(r.deletion_policy, Some(DeletionPolicy::Retain));
    }

    #[test]
    fn test_database_secret_attached() {
        let (mut scope, refs, sgs) = setup();
        let db = build(&mut scope, "Rds", &spec(RemovalPolicy::Destroy), &refs, &sgs).unwrap();
        let parts = scope.into_parts();
        let attach = parts
            .resources
            .values()
            .find(|r| r.resource_type == cfn::SECRET_ATTACHMENT)
            .unwrap();
        assert_eq!(attach.properties["TargetId"], ref_(&db.logical_id));
        assert_eq!(attach.properties["TargetType"], "AWS::RDS::DBInstance");
    }

    #[test]
    fn test_database_unknown_group_fails() {
        let (mut scope, refs, _) = setup();
        let err = build(&mut scope, "Rds", &spec(RemovalPolicy::Destroy), &refs, &IndexMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("unknown security group"));
    }
}
