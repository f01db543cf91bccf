//! Append-only JSONL provenance event log, one per assembly directory.

use crate::core::types::{ProvenanceEvent, TimestampedEvent};
use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

const EVENT_LOG_FILE: &str = "events.jsonl";

/// Current UTC time, RFC 3339 with second precision.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .unsigned_abs();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

pub fn event_log_path(out_dir: &Path) -> PathBuf {
    out_dir.join(EVENT_LOG_FILE)
}

/// Append an event to the assembly's event log.
pub fn append_event(out_dir: &Path, event: ProvenanceEvent) -> Result<()> {
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
    let path = event_log_path(out_dir);

    let te = TimestampedEvent {
        ts: now_rfc3339(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| Error::Serialize(e.to_string()))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::io(&path, e))?;
    writeln!(file, "{}", json).map_err(|e| Error::io(&path, e))?;

    Ok(())
}

/// Read every event back, skipping lines that do not parse.
pub fn read_events(out_dir: &Path) -> Result<Vec<TimestampedEvent>> {
    let path = event_log_path(out_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventlog_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.starts_with("20"));
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_eventlog_generate_run_id() {
        let id = generate_run_id();
        assert!(id.starts_with("r-"));
        assert_eq!(id.len(), 14);
    }

    #[test]
    fn test_eventlog_path() {
        let p = event_log_path(Path::new("/out"));
        assert_eq!(p, PathBuf::from("/out/events.jsonl"));
    }

    #[test]
    fn test_eventlog_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        append_event(
            dir.path(),
            ProvenanceEvent::SynthStarted {
                stack: "Demo".to_string(),
                run_id: "r-abc".to_string(),
                migrastack_version: "0.1.0".to_string(),
            },
        )
        .unwrap();
        for i in 0..2 {
            append_event(
                dir.path(),
                ProvenanceEvent::ResourceSynthesized {
                    stack: "Demo".to_string(),
                    logical_id: format!("R{}", i),
                    resource_type: "AWS::EC2::VPC".to_string(),
                    hash: "blake3:xxx".to_string(),
                },
            )
            .unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        assert!(content.contains("synth_started"));
        assert_eq!(content.lines().count(), 3);

        let events = read_events(dir.path()).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0].event, ProvenanceEvent::SynthStarted { .. }));
    }

    #[test]
    fn test_eventlog_read_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_events(dir.path()).unwrap().is_empty());
    }
}
