//! Artifact manifest: SHA-256 hashes of every artifact file, optionally
//! signed with Ed25519.
//!
//! # Layout
//!
//! ```text
//! <artifact dir>/manifest.json   {"version": 1, "created_at": ..., "files": {"rel/path": "<sha256 hex>"}}
//! <artifact dir>/manifest.sig    raw 64-byte Ed25519 signature over manifest.json bytes
//! ```
//!
//! When a manifest is present, every file it lists must hash correctly and
//! every artifact the store loads must be listed. With `require_signed`, a
//! missing manifest, signature or public key is an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::fs::ArtifactError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "manifest.sig";
pub const MANIFEST_VERSION: u32 = 1;

/// Hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// A relative path that stays inside the artifact directory.
#[must_use]
pub fn is_contained(rel: &str) -> bool {
    let path = Path::new(rel);
    !rel.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns `ArtifactError::Integrity` for bad base64 or a malformed key.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Integrity("Invalid public key base64".into()))?;
    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Integrity("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| ArtifactError::Integrity("Invalid verifying key".into()))
}

/// How strictly the artifact directory is verified.
#[derive(Debug, Clone, Default)]
pub struct IntegrityPolicy {
    /// Refuse to load without a manifest signed by `verifying_key`
    pub require_signed: bool,
    pub verifying_key: Option<VerifyingKey>,
}

/// Hash list over the artifact directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    /// Hash the given files (relative to `dir`) into a new manifest.
    ///
    /// # Errors
    /// Returns an error if a path escapes `dir` or a file cannot be read.
    pub fn build<I, S>(dir: &Path, files: I) -> Result<Self, ArtifactError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut hashes = BTreeMap::new();
        for rel in files {
            let rel = rel.into();
            if !is_contained(&rel) {
                return Err(ArtifactError::Integrity(format!(
                    "Path {rel} escapes the artifact directory"
                )));
            }
            let path = dir.join(&rel);
            let bytes = fs::read(&path).map_err(|source| ArtifactError::Io { path, source })?;
            hashes.insert(rel, sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: Some(Utc::now()),
            files: hashes,
        })
    }

    /// Whether `rel` is listed.
    #[must_use]
    pub fn binds(&self, rel: &str) -> bool {
        self.files.contains_key(rel)
    }

    /// Check loaded bytes against the recorded hash.
    ///
    /// # Errors
    /// Returns `ArtifactError::Integrity` if `rel` is unlisted or its hash differs.
    pub fn check(&self, rel: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let expected = self.files.get(rel).ok_or_else(|| {
            ArtifactError::Integrity(format!("{rel} is not bound by {MANIFEST_FILE}"))
        })?;
        if constant_time_eq_str(&sha256_hex(bytes), &expected.to_ascii_lowercase()) {
            Ok(())
        } else {
            Err(ArtifactError::Integrity(format!("File hash mismatch for {rel}")))
        }
    }

    fn parse(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| ArtifactError::Parse {
            path: MANIFEST_FILE.into(),
            message: e.to_string(),
        })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::Integrity(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }
        if manifest.files.is_empty() {
            return Err(ArtifactError::Integrity(format!(
                "{MANIFEST_FILE} contains no files"
            )));
        }
        if let Some(rel) = manifest.files.keys().find(|rel| !is_contained(rel)) {
            return Err(ArtifactError::Integrity(format!(
                "Path {rel} escapes the artifact directory"
            )));
        }
        Ok(manifest)
    }
}

/// Write `manifest.json` and, with a key, `manifest.sig` into `dir`.
///
/// Without a key any existing `manifest.sig` is removed, since it would no
/// longer match the new manifest.
///
/// # Errors
/// Returns an error if either file cannot be written or a stale signature
/// cannot be removed.
pub fn write_manifest(
    dir: &Path,
    manifest: &Manifest,
    signing_key: Option<&SigningKey>,
) -> Result<(PathBuf, Option<PathBuf>), ArtifactError> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| ArtifactError::Parse {
        path: MANIFEST_FILE.into(),
        message: e.to_string(),
    })?;
    let manifest_path = dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &bytes).map_err(|source| ArtifactError::Io {
        path: manifest_path.clone(),
        source,
    })?;

    let sig_path = match signing_key {
        Some(key) => {
            let signature: Signature = key.sign(&bytes);
            let path = dir.join(SIGNATURE_FILE);
            fs::write(&path, signature.to_bytes()).map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
            Some(path)
        }
        None => {
            let path = dir.join(SIGNATURE_FILE);
            match fs::remove_file(&path) {
                Ok(()) => tracing::info!("Removed stale {SIGNATURE_FILE}"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(ArtifactError::Io { path, source }),
            }
            None
        }
    };
    Ok((manifest_path, sig_path))
}

/// Collect every `.json` artifact under `dir` except the manifest itself.
///
/// Paths are relative, `/`-separated and sorted.
///
/// # Errors
/// Returns an error if the directory cannot be walked.
pub fn discover_artifacts(dir: &Path) -> Result<Vec<String>, ArtifactError> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), ArtifactError> {
        let entries = fs::read_dir(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| ArtifactError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            if path.is_dir() {
                walk(root, &path, out)?;
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(root) {
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if rel != MANIFEST_FILE {
                    out.push(rel);
                }
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn verify_signature(
    manifest_bytes: &[u8],
    sig_bytes: &[u8],
    key: &VerifyingKey,
) -> Result<(), ArtifactError> {
    let sig: [u8; 64] = sig_bytes.try_into().map_err(|_| {
        ArtifactError::Integrity("Invalid signature length (expected 64 bytes)".into())
    })?;
    key.verify(manifest_bytes, &Signature::from_bytes(&sig))
        .map_err(|_| ArtifactError::Integrity("Invalid manifest signature".into()))
}

/// Verify the manifest of an artifact directory.
///
/// # Returns
/// `None` when no manifest exists and the policy allows unsigned artifacts.
///
/// # Errors
/// Returns `ArtifactError::Integrity` on a missing required manifest or
/// signature, a bad signature, or any listed file that is missing or does not
/// match its hash.
pub fn verify_dir(dir: &Path, policy: &IntegrityPolicy) -> Result<Option<Manifest>, ArtifactError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);

    if !manifest_path.exists() {
        if policy.require_signed {
            return Err(ArtifactError::Integrity(format!(
                "Signed artifacts required but {MANIFEST_FILE} is missing"
            )));
        }
        tracing::debug!("No {MANIFEST_FILE}; artifacts load unverified");
        return Ok(None);
    }

    let manifest_bytes = fs::read(&manifest_path).map_err(|source| ArtifactError::Io {
        path: manifest_path.clone(),
        source,
    })?;

    match (sig_path.exists(), &policy.verifying_key) {
        (true, Some(key)) => {
            let sig_bytes = fs::read(&sig_path).map_err(|source| ArtifactError::Io {
                path: sig_path.clone(),
                source,
            })?;
            verify_signature(&manifest_bytes, &sig_bytes, key)?;
            tracing::info!("Manifest signature verified");
        }
        (false, _) if policy.require_signed => {
            return Err(ArtifactError::Integrity(format!(
                "Signed artifacts required but {SIGNATURE_FILE} is missing"
            )));
        }
        (true, None) if policy.require_signed => {
            return Err(ArtifactError::Integrity(
                "Signed artifacts required but no signing public key is configured".into(),
            ));
        }
        (true, None) => {
            tracing::warn!("{SIGNATURE_FILE} present but no public key configured; checking hashes only");
        }
        (false, _) => {
            tracing::info!("{MANIFEST_FILE} is unsigned; checking hashes only");
        }
    }

    let manifest = Manifest::parse(&manifest_bytes)?;
    for rel in manifest.files.keys() {
        let path = dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| {
            ArtifactError::Integrity(format!(
                "Manifest references missing/unreadable file {rel}: {e}"
            ))
        })?;
        manifest.check(rel, &bytes)?;
    }

    tracing::info!(files = manifest.files.len(), "Artifact hashes verified");
    Ok(Some(manifest))
}
