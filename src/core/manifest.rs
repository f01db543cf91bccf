//! Cloud assembly output: template file plus manifest, written atomically.

use super::synth::{resource_hashes, template_json, Synthesized};
use super::types::{Manifest, ManifestResource};
use crate::error::{Error, Result};
use crate::tripwire::{eventlog, hasher};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_SCHEMA: &str = "1.0";

/// Template file name for a stack.
pub fn template_file_name(stack: &str) -> String {
    format!("{}.template.json", stack)
}

pub fn manifest_path(out_dir: &Path) -> PathBuf {
    out_dir.join(MANIFEST_FILE)
}

/// Write `contents` to `path` through a temp file and rename.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    std::fs::write(&tmp_path, contents).map_err(|e| Error::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Build the manifest for a synthesis result without touching disk.
pub fn build_manifest(synth: &Synthesized, template_hash: &str, config_hash: &str) -> Result<Manifest> {
    let hashes = resource_hashes(&synth.template)?;
    let mut resources = IndexMap::with_capacity(hashes.len());
    for (id, hash) in hashes {
        let resource = &synth.template.resources[&id];
        resources.insert(
            id.clone(),
            ManifestResource {
                resource_type: resource.resource_type.clone(),
                path: synth.paths.get(&id).cloned().unwrap_or_default(),
                hash,
                deletion_policy: resource.deletion_policy,
            },
        );
    }

    Ok(Manifest {
        schema: MANIFEST_SCHEMA.to_string(),
        stack: synth.stack.clone(),
        generated_at: eventlog::now_rfc3339(),
        generator: format!("migrastack {}", env!("CARGO_PKG_VERSION")),
        template_file: template_file_name(&synth.stack),
        template_hash: template_hash.to_string(),
        config_hash: config_hash.to_string(),
        resources,
    })
}

/// Write `<Stack>.template.json` and `manifest.json` into `out_dir`.
pub fn write_assembly(out_dir: &Path, synth: &Synthesized, config_hash: &str) -> Result<Manifest> {
    std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;

    let json = template_json(&synth.template)?;
    let template_path = out_dir.join(template_file_name(&synth.stack));
    write_atomic(&template_path, &json)?;

    let manifest = build_manifest(synth, &hasher::hash_string(&json), config_hash)?;
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|e| Error::Serialize(e.to_string()))?;
    write_atomic(&manifest_path(out_dir), &manifest_json)?;

    tracing::info!(
        out = %out_dir.display(),
        template = %template_path.display(),
        resources = manifest.resources.len(),
        "assembly written"
    );
    Ok(manifest)
}

/// Load the manifest from an assembly directory. `None` if absent.
pub fn load_manifest(out_dir: &Path) -> Result<Option<Manifest>> {
    let path = manifest_path(out_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let manifest = serde_json::from_str(&content)
        .map_err(|e| Error::Parse(format!("invalid manifest {}: {}", path.display(), e)))?;
    Ok(Some(manifest))
}
