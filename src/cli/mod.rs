//! CLI subcommands: init, validate, synth, list, audit, removal, verify, status.

use crate::core::types::{DeletionPolicy, ProvenanceEvent, StackConfig};
use crate::core::{audit, manifest, parser, resolver, synth};
use crate::error::{Error, Result};
use crate::stack::MIGRATION_STACK_YAML;
use crate::tripwire::{eventlog, verify};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::time::Instant;

const DEFAULT_FILE: &str = "stack.yaml";
const DEFAULT_OUT: &str = "stack.out";

#[derive(Parser, Debug)]
#[command(
    name = "migrastack",
    version,
    about = "Rust-native declarative stack synthesis: typed declarations in, deployable templates out"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); MIGRASTACK_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the migration stack declaration as a starting point
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate stack.yaml without synthesizing
    Validate {
        /// Path to stack.yaml
        #[arg(short, long, default_value = DEFAULT_FILE)]
        file: PathBuf,
    },

    /// Synthesize the template and assembly manifest
    Synth {
        /// Path to stack.yaml
        #[arg(short, long, default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Assembly output directory
        #[arg(short, long, default_value = DEFAULT_OUT)]
        out: PathBuf,

        /// Print the template instead of writing the assembly
        #[arg(long)]
        stdout: bool,
    },

    /// List synthesized resources
    List {
        /// Path to stack.yaml
        #[arg(short, long, default_value = DEFAULT_FILE)]
        file: PathBuf,
    },

    /// Report unsafe defaults (open admin ports, destructive removal)
    Audit {
        /// Path to stack.yaml
        #[arg(short, long, default_value = DEFAULT_FILE)]
        file: PathBuf,

        /// Exit non-zero on any warning (for CI)
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Preview what happens to each resource when the stack is removed
    Removal {
        /// Path to stack.yaml
        #[arg(short, long, default_value = DEFAULT_FILE)]
        file: PathBuf,
    },

    /// Check the assembly on disk against its manifest (tripwire)
    Verify {
        /// Assembly output directory
        #[arg(short, long, default_value = DEFAULT_OUT)]
        out: PathBuf,

        /// Exit non-zero on any finding (for CI/cron)
        #[arg(long)]
        tripwire: bool,
    },

    /// Show the assembly manifest
    Status {
        /// Assembly output directory
        #[arg(short, long, default_value = DEFAULT_OUT)]
        out: PathBuf,
    },

    /// Print the JSON Schema of stack.yaml
    Schema,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth { file, out, stdout } => cmd_synth(&file, &out, stdout),
        Commands::List { file } => cmd_list(&file),
        Commands::Audit {
            file,
            deny_warnings,
        } => cmd_audit(&file, deny_warnings),
        Commands::Removal { file } => cmd_removal(&file),
        Commands::Verify { out, tripwire } => cmd_verify(&out, tripwire),
        Commands::Status { out } => cmd_status(&out),
        Commands::Schema => cmd_schema(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "migrastack", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join(DEFAULT_FILE);
    if config_path.exists() {
        return Err(Error::io(
            &config_path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "already exists"),
        ));
    }
    std::fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    std::fs::write(&config_path, MIGRATION_STACK_YAML).map_err(|e| Error::io(&config_path, e))?;

    println!("Initialized migrastack project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let config = parser::parse_and_validate(file)?;
    println!(
        "OK: {} ({} resources declared)",
        config.name,
        config.declaration_count()
    );
    Ok(())
}

fn load_and_synth(file: &Path) -> Result<(StackConfig, synth::Synthesized)> {
    let config = parser::parse_config_file(file)?;
    let synthesized = synth::synthesize(&config)?;
    Ok((config, synthesized))
}

fn cmd_synth(file: &Path, out: &Path, to_stdout: bool) -> Result<()> {
    let started = Instant::now();
    let (config, synthesized) = load_and_synth(file)?;

    if to_stdout {
        print!("{}", synth::template_json(&synthesized.template)?);
        return Ok(());
    }

    let config_hash = synth::config_hash(&config)?;
    let written = manifest::write_assembly(out, &synthesized, &config_hash)?;

    if config.policy.events {
        let run_id = eventlog::generate_run_id();
        eventlog::append_event(
            out,
            ProvenanceEvent::SynthStarted {
                stack: written.stack.clone(),
                run_id: run_id.clone(),
                migrastack_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        )?;
        for (id, entry) in &written.resources {
            eventlog::append_event(
                out,
                ProvenanceEvent::ResourceSynthesized {
                    stack: written.stack.clone(),
                    logical_id: id.clone(),
                    resource_type: entry.resource_type.clone(),
                    hash: entry.hash.clone(),
                },
            )?;
        }
        eventlog::append_event(
            out,
            ProvenanceEvent::SynthCompleted {
                stack: written.stack.clone(),
                run_id,
                resources: u32::try_from(written.resources.len()).unwrap_or(u32::MAX),
                template_hash: written.template_hash.clone(),
                total_seconds: started.elapsed().as_secs_f64(),
            },
        )?;
    }

    println!(
        "Synthesized {}: {} resources -> {}",
        written.stack,
        written.resources.len(),
        out.join(&written.template_file).display()
    );
    let warnings = audit::warning_count(&audit::audit(&config));
    if warnings > 0 {
        println!("  {} audit warning(s); run `migrastack audit` for details", warnings);
    }
    Ok(())
}

fn cmd_list(file: &Path) -> Result<()> {
    let (_, synthesized) = load_and_synth(file)?;
    let width = synthesized
        .template
        .resources
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(0);

    for (id, r) in &synthesized.template.resources {
        let policy = r
            .deletion_policy
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<width$}  {:<44} {}", id, r.resource_type, policy, width = width);
    }
    println!();
    for (resource_type, count) in synthesized.inventory.iter() {
        println!("{:>4}  {}", count, resource_type);
    }
    println!("{} resources", synthesized.inventory.total());
    Ok(())
}

fn cmd_audit(file: &Path, deny_warnings: bool) -> Result<()> {
    let config = resolver::resolve_config(&parser::parse_config_file(file)?)?;
    let findings = audit::audit(&config);

    if findings.is_empty() {
        println!("No findings.");
        return Ok(());
    }
    for f in &findings {
        println!("{}", f);
    }
    let warnings = audit::warning_count(&findings);
    println!();
    println!("{} finding(s), {} warning(s)", findings.len(), warnings);

    if deny_warnings && warnings > 0 {
        return Err(Error::Audit(warnings));
    }
    Ok(())
}

fn cmd_removal(file: &Path) -> Result<()> {
    let (_, synthesized) = load_and_synth(file)?;
    println!("Removing stack {}:", synthesized.stack);

    for (policy, verb) in [
        (DeletionPolicy::Delete, "deleted"),
        (DeletionPolicy::Snapshot, "snapshotted, then deleted"),
        (DeletionPolicy::Retain, "retained"),
    ] {
        let affected: Vec<_> = synthesized
            .template
            .resources
            .iter()
            .filter(|(_, r)| synth::effective_deletion_policy(r) == policy)
            .collect();
        if affected.is_empty() {
            continue;
        }
        println!();
        println!("  {} ({}):", verb, affected.len());
        for (id, r) in affected {
            let path = synthesized.paths.get(id).map(String::as_str).unwrap_or(id);
            println!("    {} [{}]", path, r.resource_type);
        }
    }
    Ok(())
}

fn cmd_verify(out: &Path, tripwire_mode: bool) -> Result<()> {
    let (manifest, findings) = verify::verify_assembly(out)?;
    println!(
        "Checking {} ({} resources)...",
        manifest.stack,
        manifest.resources.len()
    );

    if findings.is_empty() {
        println!("Assembly matches manifest.");
        return Ok(());
    }

    for f in &findings {
        println!("  TAMPERED: {}", f);
        println!("    Expected: {}", f.expected_hash);
        println!("    Actual:   {}", f.actual_hash);
    }
    verify::record_findings(out, &manifest.stack, &findings)?;
    println!();
    println!("Tampering detected: {} finding(s)", findings.len());

    if tripwire_mode {
        return Err(Error::Tripwire(format!("{} finding(s)", findings.len())));
    }
    Ok(())
}

fn cmd_status(out: &Path) -> Result<()> {
    let Some(manifest) = manifest::load_manifest(out)? else {
        println!("No assembly found. Run `migrastack synth` first.");
        return Ok(());
    };

    println!("Stack: {}", manifest.stack);
    println!("  Generated: {}", manifest.generated_at);
    println!("  Generator: {}", manifest.generator);
    println!("  Template:  {} ({})", manifest.template_file, manifest.template_hash);
    println!("  Config:    {}", manifest.config_hash);
    println!("  Resources: {}", manifest.resources.len());
    for (id, r) in &manifest.resources {
        let policy = r
            .deletion_policy
            .map(|p| format!(" [{}]", p))
            .unwrap_or_default();
        println!("    {}: {}{}", id, r.resource_type, policy);
    }

    if let Some(last) = eventlog::read_events(out)?.last() {
        println!("  Last event: {}", last.ts);
    }
    Ok(())
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(StackConfig);
    let json = serde_json::to_string_pretty(&schema).map_err(|e| Error::Serialize(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        let file = dir.path().join(DEFAULT_FILE);
        (dir, file)
    }

    #[test]
    fn test_cli_init() {
        let (_dir, file) = project();
        let content = std::fs::read_to_string(&file).unwrap();
        assert!(content.contains("AwsMigrationStack"));
    }

    #[test]
    fn test_cli_init_already_exists() {
        let (dir, _) = project();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_cli_validate_valid() {
        let (_dir, file) = project();
        cmd_validate(&file).unwrap();
    }

    #[test]
    fn test_cli_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFAULT_FILE);
        std::fs::write(
            &file,
            MIGRATION_STACK_YAML.replace("allocated_storage: 20", "allocated_storage: 5"),
        )
        .unwrap();
        let err = cmd_validate(&file).unwrap_err();
        assert!(matches!(err, Error::Validation(ref e) if e.len() == 1));
    }

    #[test]
    fn test_cli_validate_missing_file() {
        let err = cmd_validate(Path::new("/nonexistent/stack.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_cli_synth_writes_assembly_and_events() {
        let (dir, file) = project();
        let out = dir.path().join(DEFAULT_OUT);
        cmd_synth(&file, &out, false).unwrap();

        assert!(out.join("AwsMigrationStack.template.json").exists());
        assert!(out.join("manifest.json").exists());
        let events = eventlog::read_events(&out).unwrap();
        let manifest = manifest::load_manifest(&out).unwrap().unwrap();
        // started + one per resource + completed
        assert_eq!(events.len(), manifest.resources.len() + 2);
        assert!(matches!(
            events.last().unwrap().event,
            ProvenanceEvent::SynthCompleted { .. }
        ));
    }

    #[test]
    fn test_cli_synth_events_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(DEFAULT_FILE);
        std::fs::write(
            &file,
            format!("{}\npolicy:\n  events: false\n", MIGRATION_STACK_YAML),
        )
        .unwrap();
        let out = dir.path().join(DEFAULT_OUT);
        cmd_synth(&file, &out, false).unwrap();
        assert!(!eventlog::event_log_path(&out).exists());
    }

    #[test]
    fn test_cli_synth_stdout_writes_nothing() {
        let (dir, file) = project();
        let out = dir.path().join(DEFAULT_OUT);
        cmd_synth(&file, &out, true).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn test_cli_list_and_removal() {
        let (_dir, file) = project();
        cmd_list(&file).unwrap();
        cmd_removal(&file).unwrap();
    }

    #[test]
    fn test_cli_audit_deny_warnings() {
        let (_dir, file) = project();
        cmd_audit(&file, false).unwrap();
        let err = cmd_audit(&file, true).unwrap_err();
        assert!(matches!(err, Error::Audit(2)));
    }

    #[test]
    fn test_cli_verify_clean_then_tampered() {
        let (dir, file) = project();
        let out = dir.path().join(DEFAULT_OUT);
        cmd_synth(&file, &out, false).unwrap();
        cmd_verify(&out, true).unwrap();

        let template = out.join("AwsMigrationStack.template.json");
        let edited = std::fs::read_to_string(&template)
            .unwrap()
            .replace("\"Delete\"", "\"Retain\"");
        std::fs::write(&template, edited).unwrap();

        cmd_verify(&out, false).unwrap();
        let err = cmd_verify(&out, true).unwrap_err();
        assert!(matches!(err, Error::Tripwire(_)));
    }

    #[test]
    fn test_cli_verify_without_assembly() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_verify(dir.path(), false).is_err());
    }

    #[test]
    fn test_cli_status() {
        let (dir, file) = project();
        let out = dir.path().join(DEFAULT_OUT);
        cmd_status(&out).unwrap();
        cmd_synth(&file, &out, false).unwrap();
        cmd_status(&out).unwrap();
    }

    #[test]
    fn test_cli_schema() {
        cmd_schema().unwrap();
    }

    #[test]
    fn test_cli_parse_args() {
        let cli = Cli::try_parse_from(["migrastack", "-vv", "synth", "--stdout"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Synth { file, out, stdout } => {
                assert_eq!(file, PathBuf::from("stack.yaml"));
                assert_eq!(out, PathBuf::from("stack.out"));
                assert!(stdout);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_command_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_dispatch_validate() {
        let (_dir, file) = project();
        dispatch(Commands::Validate { file }).unwrap();
    }
}
