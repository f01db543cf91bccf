//! Assembly verification: compare the files on disk to the manifest.

use crate::core::manifest::load_manifest;
use crate::core::types::{DeletionPolicy, Manifest, ProvenanceEvent, Template};
use crate::error::{Error, Result};
use crate::tripwire::{eventlog, hasher};
use std::fmt;
use std::path::Path;

/// What changed since synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    TemplateMissing,
    TemplateModified,
    TemplateUnreadable,
    ResourceRemoved,
    ResourceAdded,
    ResourceModified,
    DeletionPolicyChanged,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TemplateMissing => "template-missing",
            Self::TemplateModified => "template-modified",
            Self::TemplateUnreadable => "template-unreadable",
            Self::ResourceRemoved => "resource-removed",
            Self::ResourceAdded => "resource-added",
            Self::ResourceModified => "resource-modified",
            Self::DeletionPolicyChanged => "deletion-policy-changed",
        };
        write!(f, "{}", s)
    }
}

/// A single verification finding.
#[derive(Debug, Clone)]
pub struct VerifyFinding {
    pub kind: FindingKind,
    /// Logical id, or the template file name for file-level findings
    pub subject: String,
    pub expected_hash: String,
    pub actual_hash: String,
    pub detail: String,
}

impl fmt::Display for VerifyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.subject, self.detail)
    }
}

fn finding(kind: FindingKind, subject: &str, expected: &str, actual: &str, detail: String) -> VerifyFinding {
    VerifyFinding {
        kind,
        subject: subject.to_string(),
        expected_hash: expected.to_string(),
        actual_hash: actual.to_string(),
        detail,
    }
}

fn policy_name(policy: Option<DeletionPolicy>) -> String {
    policy.map_or_else(|| "none".to_string(), |p| p.to_string())
}

/// Verify an assembly directory against its manifest.
pub fn verify_assembly(out_dir: &Path) -> Result<(Manifest, Vec<VerifyFinding>)> {
    let manifest = load_manifest(out_dir)?.ok_or_else(|| {
        Error::Tripwire(format!("no manifest in {} (run synth first)", out_dir.display()))
    })?;
    let findings = verify_against(out_dir, &manifest)?;
    tracing::info!(stack = %manifest.stack, findings = findings.len(), "assembly verified");
    Ok((manifest, findings))
}

/// Compare the template file in `out_dir` with `manifest`.
pub fn verify_against(out_dir: &Path, manifest: &Manifest) -> Result<Vec<VerifyFinding>> {
    let file = manifest.template_file.as_str();
    let path = out_dir.join(file);
    if !path.exists() {
        return Ok(vec![finding(
            FindingKind::TemplateMissing,
            file,
            &manifest.template_hash,
            "MISSING",
            format!("{} does not exist", path.display()),
        )]);
    }

    let mut findings = Vec::new();
    let actual = hasher::hash_file(&path)?;
    if actual == manifest.template_hash {
        return Ok(findings);
    }
    findings.push(finding(
        FindingKind::TemplateModified,
        file,
        &manifest.template_hash,
        &actual,
        "template file changed since synthesis".to_string(),
    ));

    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let template: Template = match serde_json::from_str(&content) {
        Ok(t) => t,
        Err(e) => {
            findings.push(finding(
                FindingKind::TemplateUnreadable,
                file,
                &manifest.template_hash,
                &actual,
                format!("not a valid template: {}", e),
            ));
            return Ok(findings);
        }
    };

    for (id, entry) in &manifest.resources {
        let Some(resource) = template.resources.get(id) else {
            findings.push(finding(
                FindingKind::ResourceRemoved,
                id,
                &entry.hash,
                "MISSING",
                format!("{} ({}) is no longer in the template", entry.path, entry.resource_type),
            ));
            continue;
        };
        if resource.deletion_policy != entry.deletion_policy {
            findings.push(finding(
                FindingKind::DeletionPolicyChanged,
                id,
                &entry.hash,
                &hasher::hash_json(resource)?,
                format!(
                    "deletion policy {} -> {}",
                    policy_name(entry.deletion_policy),
                    policy_name(resource.deletion_policy)
                ),
            ));
            continue;
        }
        let hash = hasher::hash_json(resource)?;
        if hash != entry.hash {
            findings.push(finding(
                FindingKind::ResourceModified,
                id,
                &entry.hash,
                &hash,
                format!("{} body changed", entry.path),
            ));
        }
    }

    for (id, resource) in &template.resources {
        if !manifest.resources.contains_key(id) {
            findings.push(finding(
                FindingKind::ResourceAdded,
                id,
                "NONE",
                &hasher::hash_json(resource)?,
                format!("{} was not synthesized", resource.resource_type),
            ));
        }
    }

    Ok(findings)
}

/// Append an `assembly_tampered` event per finding.
pub fn record_findings(out_dir: &Path, stack: &str, findings: &[VerifyFinding]) -> Result<()> {
    for f in findings {
        eventlog::append_event(
            out_dir,
            ProvenanceEvent::AssemblyTampered {
                stack: stack.to_string(),
                logical_id: f.subject.clone(),
                expected_hash: f.expected_hash.clone(),
                actual_hash: f.actual_hash.clone(),
            },
        )?;
    }
    Ok(())
}
