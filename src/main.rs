//! Profile Integrity CLI
//!
//! Signs entries and checks entry files: Merkle roots, inclusion proofs,
//! signature sweeps and before/after audit trails.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use npr_integrity::audit::{
    build_merkle_tree, generate_audit_trail, generate_proof_for_id, validate_data_integrity,
    verify_merkle_root, MerkleProof,
};
use npr_integrity::profile::{load_entries_from_file, Entry, EntryKind};
use npr_integrity::AppConfig;

#[derive(Parser)]
#[command(name = "npr-integrity")]
#[command(about = "Integrity checks for neuropsychographic profile entries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign content and print the entry as a JSON line
    Sign {
        /// Entry kind (goal, challenge, strength, preference, reflection, assessment, interaction)
        #[arg(short, long)]
        kind: String,

        /// Entry content as JSON; bare text is taken as a string
        #[arg(short, long)]
        content: String,

        /// Entry id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the Merkle root of an entry file
    Root {
        #[arg(short, long)]
        entries: PathBuf,
    },

    /// Check every signature, and optionally the Merkle root
    Verify {
        #[arg(short, long)]
        entries: PathBuf,

        /// Expected Merkle root
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Print an inclusion proof for one entry
    Prove {
        #[arg(short, long)]
        entries: PathBuf,

        /// Entry id
        #[arg(long)]
        id: String,
    },

    /// Print the audit trail between two entry files
    Diff {
        #[arg(long)]
        before: PathBuf,

        #[arg(long)]
        after: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(2);
        }
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli.command, &config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Proof as printed by `prove`, with its verification result alongside
#[derive(Serialize)]
struct ProofOutput<'a> {
    #[serde(flatten)]
    proof: &'a MerkleProof,
    verified: bool,
}

impl<'a> ProofOutput<'a> {
    fn new(proof: &'a MerkleProof) -> Self {
        Self {
            proof,
            verified: proof.verify(),
        }
    }
}

/// Run a command; `Ok(false)` means a check ran and failed
fn run(command: Commands, config: &AppConfig) -> Result<bool> {
    match command {
        Commands::Sign { kind, content, id } => {
            let kind: EntryKind = kind.parse()?;
            let content = serde_json::from_str(&content)
                .unwrap_or(serde_json::Value::String(content));
            let signer = config.signature_service()?;

            let entry = match id {
                Some(id) => Entry::with_id(id, kind, content, &signer)?,
                None => Entry::create(kind, content, &signer)?,
            };
            println!("{}", serde_json::to_string(&entry)?);
            Ok(true)
        }

        Commands::Root { entries } => {
            let entries = load_entries_from_file(&entries)?;
            let tree = build_merkle_tree(&entries)?;

            println!("Merkle root: {}", tree.root_hash());
            println!("Leaves: {}", tree.leaf_count());
            println!("Depth: {}", tree.depth());
            Ok(true)
        }

        Commands::Verify { entries, root } => {
            let path = entries;
            let entries = load_entries_from_file(&path)?;
            info!("Verifying {} entries from {}", entries.len(), path.display());

            let report = validate_data_integrity(&entries);
            println!("{}", report.summary());
            println!("{}", report.detailed_status());

            let root_ok = match root {
                Some(expected) => {
                    let matches = verify_merkle_root(&entries, &expected)?;
                    if matches {
                        println!("✅ Merkle root matches expected value");
                    } else {
                        println!("❌ Merkle root mismatch. Expected: {}", expected);
                    }
                    matches
                }
                None => true,
            };

            Ok(report.is_valid && root_ok)
        }

        Commands::Prove { entries, id } => {
            let entries = load_entries_from_file(&entries)?;
            let tree = build_merkle_tree(&entries)?;
            let proof = generate_proof_for_id(&tree, &id)?;
            info!("{}", proof.summary());

            let output = ProofOutput::new(&proof);
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(output.verified)
        }

        Commands::Diff { before, after } => {
            let before = load_entries_from_file(&before)
                .with_context(|| "Failed to load the before snapshot")?;
            let after = load_entries_from_file(&after)
                .with_context(|| "Failed to load the after snapshot")?;

            let trail = generate_audit_trail(&before, &after);
            println!("{}", serde_json::to_string_pretty(&trail)?);
            if !trail.integrity_maintained {
                error!("Integrity not maintained: {}", trail.summary());
            }
            Ok(trail.integrity_maintained)
        }
    }
}
