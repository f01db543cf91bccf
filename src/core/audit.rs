//! Unsafe-default report.
//!
//! Broad ingress and destructive removal policies are legal declarations.
//! The audit names them without changing them; `policy.strict` promotes
//! warnings to validation errors.

use super::types::{Peer, RemovalPolicy, StackConfig};
use std::fmt;

/// Ports that should never be open to the whole internet.
const ADMIN_PORTS: &[u16] = &[22, 3389, 3306, 5432];
const WEB_PORTS: &[u16] = &[80, 443];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
        }
    }
}

/// A single audit finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Stable rule code, e.g. `open-admin-port`
    pub rule: &'static str,
    /// Construct id the finding is about
    pub construct: String,
    pub detail: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({}): {}", self.severity, self.rule, self.construct, self.detail)
    }
}

/// Audit a declaration. Findings are ordered by declaration order.
pub fn audit(config: &StackConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (id, sg) in &config.security_groups {
        for rule in &sg.ingress {
            if !rule.peer.is_any() {
                continue;
            }
            let (severity, code) = if ADMIN_PORTS.contains(&rule.port) {
                (Severity::Warning, "open-admin-port")
            } else if WEB_PORTS.contains(&rule.port) {
                (Severity::Info, "open-web-port")
            } else {
                (Severity::Info, "open-port")
            };
            let peer = match &rule.peer {
                Peer::AnyIpv4 => "0.0.0.0/0".to_string(),
                other => other.to_string(),
            };
            findings.push(Finding {
                severity,
                rule: code,
                construct: id.clone(),
                detail: format!(
                    "{}/{} is reachable from {}",
                    rule.protocol.as_str(),
                    rule.port,
                    peer
                ),
            });
        }
    }

    for (id, db) in &config.databases {
        if db.removal_policy == RemovalPolicy::Destroy {
            findings.push(Finding {
                severity: Severity::Warning,
                rule: "destroy-on-removal",
                construct: id.clone(),
                detail: "data is deleted, not retained or snapshotted, when the stack is removed"
                    .to_string(),
            });
        }
    }

    if config.env.region.is_none() {
        for (id, inst) in &config.instances {
            if inst.machine_image.len() == 1 {
                let region = inst.machine_image.keys().next().map(String::as_str).unwrap_or("?");
                findings.push(Finding {
                    severity: Severity::Info,
                    rule: "region-pinned-image",
                    construct: id.clone(),
                    detail: format!(
                        "machine image is only mapped for {}; deploys elsewhere fail with image not found",
                        region
                    ),
                });
            }
        }
    }

    findings
}

/// Number of findings at warning level.
pub fn warning_count(findings: &[Finding]) -> usize {
    findings.iter().filter(|f| f.severity == Severity::Warning).count()
}
