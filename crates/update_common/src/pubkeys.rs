//! Trusted maintainer keys
//!
//! The allow-list of OpenPGP public keys whose Gitian attestations count
//! toward the signature quorum. Keys are injected at construction; the CLI
//! sources them from a directory of ASCII-armored `.asc` files where the
//! file stem is the owner label.

use anyhow::{Context, Result};
use std::path::Path;

const ARMOR_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";

/// One allow-listed maintainer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    /// Owner label, e.g. the maintainer's handle.
    pub owner: String,
    /// ASCII-armored public key block.
    pub armored: String,
}

impl TrustedKey {
    pub fn new(owner: impl Into<String>, armored: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            armored: armored.into(),
        }
    }
}

/// Load armored keys from a directory: every `*.asc` file becomes one
/// [`TrustedKey`] with the file stem as owner label. Sorted by owner so
/// the import order is stable.
pub fn load_trusted_keys(dir: &Path) -> Result<Vec<TrustedKey>> {
    let mut keys = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read key directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("asc") {
            continue;
        }
        let owner = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        let armored = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;
        if !armored.contains(ARMOR_HEADER) {
            anyhow::bail!("{} is not an ASCII-armored public key", path.display());
        }
        keys.push(TrustedKey::new(owner, armored));
    }

    keys.sort_by(|a, b| a.owner.cmp(&b.owner));
    Ok(keys)
}
