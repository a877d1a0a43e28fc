//! Artifact signing utility for cardiorisk.
//!
//! Writes `manifest.json` (SHA-256 of every `.json` artifact in the
//! directory) and an Ed25519 signature `manifest.sig` over it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_artifacts -- <artifact_dir> [--unsigned]
//! cargo run --bin sign_artifacts -- --generate-key
//! ```
//!
//! # Security
//!
//! - Signing seed read from `CARDIO_SIGNING_KEY_B64_FILE`
//!   (`CARDIO_SIGNING_KEY_B64` is accepted in debug builds only)
//! - Seed material zeroized after use
//! - Only non-secret material is printed, except by `--generate-key`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardiorisk::adapters::manifest::{discover_artifacts, write_manifest, Manifest};

const KEY_FILE_ENV: &str = "CARDIO_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "CARDIO_SIGNING_KEY_B64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Sign { dir: PathBuf, unsigned: bool },
    GenerateKey,
}

fn usage() -> anyhow::Error {
    anyhow!("Usage: sign_artifacts <artifact_dir> [--unsigned] | sign_artifacts --generate-key")
}

fn parse_args() -> Result<Command> {
    let mut dir: Option<PathBuf> = None;
    let mut unsigned = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--generate-key" => return Ok(Command::GenerateKey),
            "--unsigned" => unsigned = true,
            "-h" | "--help" => return Err(usage()),
            _ if dir.is_none() && !arg.starts_with('-') => dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    let dir = dir.ok_or_else(usage)?;
    Ok(Command::Sign { dir, unsigned })
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        );
        let secret = content.trim_end_matches(['\n', '\r']).to_string();
        if secret.is_empty() {
            bail!("Empty signing key");
        }
        return Ok(Zeroizing::new(secret));
    }

    // Dev-only fallback for convenience.
    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_ENV) {
            let secret = v.trim_end_matches(['\n', '\r']).to_string();
            if secret.is_empty() {
                bail!("Empty signing key");
            }
            return Ok(Zeroizing::new(secret));
        }
    }

    bail!("Missing signing key. Provide {KEY_FILE_ENV} ({KEY_ENV} is accepted in debug builds only), or pass --unsigned.")
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing key")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }
    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn generate_key() {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());

    println!("SIGNING_SEED_B64={}", seed_b64.as_str());
    println!("SIGNING_PUBKEY_B64={pub_b64}");
    eprintln!("Store the seed in a file readable only by the signer and point {KEY_FILE_ENV} at it.");
}

fn sign(dir: &Path, unsigned: bool) -> Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let files = discover_artifacts(dir)?;
    if files.is_empty() {
        bail!("No .json artifacts found in {}", dir.display());
    }
    let manifest = Manifest::build(dir, files)?;

    let signing_key = if unsigned {
        None
    } else {
        let seed = read_signing_seed()?;
        Some(SigningKey::from_bytes(&seed.0))
    };

    let (manifest_path, sig_path) = write_manifest(dir, &manifest, signing_key.as_ref())?;

    println!(
        "Wrote manifest: {} ({} files)",
        manifest_path.display(),
        manifest.files.len()
    );
    if let (Some(sig_path), Some(key)) = (sig_path, &signing_key) {
        println!("Wrote signature: {}", sig_path.display());
        println!(
            "SIGNING_PUBKEY_B64={}",
            general_purpose::STANDARD.encode(key.verifying_key().as_bytes())
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    match parse_args()? {
        Command::GenerateKey => {
            generate_key();
            Ok(())
        }
        Command::Sign { dir, unsigned } => sign(&dir, unsigned),
    }
}
