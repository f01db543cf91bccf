//! Stack synthesis: resolve, validate, expand constructs, assemble the template.

use super::parser::{validate_config, ValidationError};
use super::resolver::resolve_config;
use super::types::{CfnResource, DeletionPolicy, StackConfig, Template};
use crate::constructs::{database, identity, instance, network, security_group, Scope, PSEUDO_PARAMETERS};
use crate::error::{Error, Result};
use crate::tripwire::hasher;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Output of one synthesis run.
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub stack: String,
    pub template: Template,
    /// Logical id -> construct path
    pub paths: IndexMap<String, String>,
    pub inventory: Inventory,
}

/// Resource count per type, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    counts: IndexMap<String, usize>,
}

impl Inventory {
    pub fn from_template(template: &Template) -> Self {
        let mut counts = IndexMap::new();
        for r in template.resources.values() {
            *counts.entry(r.resource_type.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Number of resources of `resource_type`.
    pub fn count(&self, resource_type: &str) -> usize {
        self.counts.get(resource_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Synthesize a declaration into a template.
pub fn synthesize(config: &StackConfig) -> Result<Synthesized> {
    let _span = tracing::info_span!("synth", stack = %config.name).entered();

    let resolved = resolve_config(config)?;
    let errors = validate_config(&resolved);
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let mut scope = Scope::new(&resolved.name);
    let net = network::build(&mut scope, &resolved.network)?;
    let groups = security_group::build_all(&mut scope, &resolved.security_groups, &net.vpc_id)?;

    let mut roles = IndexMap::new();
    for (id, role) in &resolved.roles {
        roles.insert(id.clone(), identity::build(&mut scope, id, role));
    }
    for (id, inst) in &resolved.instances {
        instance::build(&mut scope, id, inst, &resolved.env, &net, &groups, &roles)?;
    }
    for (id, db) in &resolved.databases {
        database::build(&mut scope, id, db, &net, &groups)?;
    }

    let parts = scope.into_parts();
    let template = Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: resolved.description.clone(),
        mappings: parts.mappings,
        resources: parts.resources,
        outputs: parts.outputs,
    };

    let dangling = check_references(&template);
    if !dangling.is_empty() {
        return Err(Error::Validation(dangling));
    }

    let inventory = Inventory::from_template(&template);
    tracing::info!(resources = inventory.total(), "stack synthesized");
    Ok(Synthesized {
        stack: resolved.name,
        template,
        paths: parts.paths,
        inventory,
    })
}

/// Every `Ref`, `Fn::GetAtt`, `Fn::FindInMap` and `DependsOn` target must
/// exist in the template (or be a pseudo parameter).
pub fn check_references(template: &Template) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut err = |msg: String| errors.push(ValidationError { message: msg });

    for (id, resource) in &template.resources {
        for target in &resource.depends_on {
            if !template.resources.contains_key(target) {
                err(format!("{}: DependsOn unknown resource '{}'", id, target));
            }
        }
        for value in resource.properties.values() {
            for problem in dangling_in(value, template) {
                err(format!("{}: {}", id, problem));
            }
        }
    }
    for (name, output) in &template.outputs {
        for problem in dangling_in(output, template) {
            err(format!("output {}: {}", name, problem));
        }
    }
    errors
}

fn dangling_in(value: &Value, template: &Template) -> Vec<String> {
    let mut refs = IndexSet::new();
    let mut atts = IndexSet::new();
    let mut maps = IndexSet::new();
    collect_targets(value, &mut refs, &mut atts, &mut maps);

    let mut problems = Vec::new();
    for r in refs {
        if !template.resources.contains_key(&r) && !PSEUDO_PARAMETERS.contains(&r.as_str()) {
            problems.push(format!("Ref to unknown '{}'", r));
        }
    }
    for a in atts {
        if !template.resources.contains_key(&a) {
            problems.push(format!("Fn::GetAtt on unknown resource '{}'", a));
        }
    }
    for m in maps {
        if !template.mappings.contains_key(&m) {
            problems.push(format!("Fn::FindInMap on unknown mapping '{}'", m));
        }
    }
    problems
}

fn collect_targets(
    value: &Value,
    refs: &mut IndexSet<String>,
    atts: &mut IndexSet<String>,
    maps: &mut IndexSet<String>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                refs.insert(target.clone());
            }
            if let Some(Value::String(target)) = map.get("Fn::GetAtt").and_then(|v| v.get(0)) {
                atts.insert(target.clone());
            }
            if let Some(Value::String(target)) = map.get("Fn::FindInMap").and_then(|v| v.get(0)) {
                maps.insert(target.clone());
            }
            for v in map.values() {
                collect_targets(v, refs, atts, maps);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_targets(v, refs, atts, maps);
            }
        }
        _ => {}
    }
}

/// What the deploy engine does with a resource when the stack is removed.
///
/// Database instances without an explicit policy are snapshotted; every
/// other resource is deleted.
pub fn effective_deletion_policy(resource: &CfnResource) -> DeletionPolicy {
    match resource.deletion_policy {
        Some(policy) => policy,
        None if resource.resource_type == crate::constructs::cfn::DB_INSTANCE => {
            DeletionPolicy::Snapshot
        }
        None => DeletionPolicy::Delete,
    }
}

/// Pretty JSON rendering of a template, newline terminated.
pub fn template_json(template: &Template) -> Result<String> {
    let mut json =
        serde_json::to_string_pretty(template).map_err(|e| Error::Serialize(e.to_string()))?;
    json.push('\n');
    Ok(json)
}

/// BLAKE3 of each resource body, keyed by logical id.
pub fn resource_hashes(template: &Template) -> Result<IndexMap<String, String>> {
    template
        .resources
        .iter()
        .map(|(id, r)| Ok((id.clone(), hasher::hash_json(r)?)))
        .collect()
}

/// BLAKE3 of the declaration, after canonical YAML serialization.
pub fn config_hash(config: &StackConfig) -> Result<String> {
    let yaml = serde_yaml_ng::to_string(config).map_err(|e| Error::Serialize(e.to_string()))?;
    Ok(hasher::hash_string(&yaml))
}
