//! `melody-zk-setup`: generate or inspect melody circuit key artifacts.
//!
//! - `setup --out <dir> [--seed <u64>]` runs a local Groth16 setup and writes
//!   `melody_pk.bin` and `melody_vk.bin`.
//! - `inspect <file>` prints an artifact header as JSON.

use clap::{Parser, Subcommand};
use melody_zk::keys::{read_artifact_header, KeyMaterial};
use melody_zk::ZkError;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "melody-zk-setup", version, about = "Key artifacts for the melody ownership circuit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single-party Groth16 setup and write both key artifacts.
    Setup {
        /// Output directory.
        #[arg(long, env = "KEYS_DIR", default_value = "keys")]
        out: PathBuf,

        /// Deterministic seed. Development only: anyone with the seed can forge proofs.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the header of a key artifact.
    Inspect { file: PathBuf },
}

fn main() -> Result<(), ZkError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Setup { out, seed } => run_setup(out, seed),
        Command::Inspect { file } => inspect(file),
    }
}

fn run_setup(out: PathBuf, seed: Option<u64>) -> Result<(), ZkError> {
    let keys = match seed {
        Some(seed) => {
            tracing::warn!(seed, "using a seeded setup RNG; these keys are NOT secure");
            KeyMaterial::generate(&mut ChaCha20Rng::seed_from_u64(seed))?
        }
        None => KeyMaterial::generate(&mut OsRng)?,
    };

    keys.write_to_dir(&out)?;
    tracing::info!(
        out = %out.display(),
        circuit_digest = %keys.digest(),
        constraints = keys.circuit().num_constraints(),
        "setup finished"
    );
    Ok(())
}

fn inspect(file: PathBuf) -> Result<(), ZkError> {
    let bytes = std::fs::read(&file).map_err(|e| melody_zk::error::ArtifactError::Io {
        path: file.display().to_string(),
        reason: e.to_string(),
    })?;
    let header = read_artifact_header(&bytes)?;

    let report = serde_json::json!({
        "file": file.display().to_string(),
        "format_version": header.format_version,
        "kind": header.kind.name(),
        "circuit_digest": header.circuit_digest.to_string(),
        "params_fingerprint": hex::encode(header.params_fingerprint),
        "params_match": header.params_fingerprint == melody_zk::poseidon::params_fingerprint(),
        "payload_len": header.payload_len,
        "payload_sha256": hex::encode(header.payload_sha256),
        "total_len": bytes.len(),
    });

    let rendered = serde_json::to_string_pretty(&report).map_err(|e| ZkError::Serialization(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
