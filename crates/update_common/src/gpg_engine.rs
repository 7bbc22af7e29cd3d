//! OpenPGP engine adapter
//!
//! Drives the external `gpg` binary against a private, owner-only home
//! directory passed explicitly via `--homedir`; the process environment
//! is never touched. Verification reads the machine-readable
//! `--status-fd` stream. The trait exists so tests can inject an engine
//! with scripted verdicts.

use crate::tristate::TriState;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PgpError {
    #[error("failed to run gpg: {0}")]
    Io(#[from] std::io::Error),
    #[error("gpg error: {0}")]
    Engine(String),
}

/// Outcome of one detached-signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCheck {
    /// Fingerprint of the signing key, when the engine could identify it.
    pub fingerprint: Option<String>,
    /// True = cryptographically valid; False = definitely bad;
    /// Unknown = the engine could not decide (e.g. unknown key).
    pub verdict: TriState,
}

/// OpenPGP collaborator interface.
#[async_trait]
pub trait PgpEngine: Send + Sync {
    /// Import an armored public key, returning its fingerprint.
    async fn import_key(&self, armored: &str) -> Result<String, PgpError>;

    /// Set the per-key trust policy to good (TOFU-GOOD equivalent).
    async fn mark_key_good(&self, fingerprint: &str) -> Result<(), PgpError>;

    /// Verify a detached signature over `contents`.
    async fn verify_detached(
        &self,
        contents: &[u8],
        signature: &[u8],
    ) -> Result<SignatureCheck, PgpError>;
}

/// Creates a [`PgpEngine`] bound to a working directory. The driver makes
/// a fresh private directory per run, so the engine is constructed inside
/// the key-import stage rather than up front.
#[async_trait]
pub trait PgpEngineFactory: Send + Sync {
    async fn create(&self, homedir: &Path) -> Result<std::sync::Arc<dyn PgpEngine>, PgpError>;
}

/// Factory for the production gpg engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpgEngineFactory;

#[async_trait]
impl PgpEngineFactory for GpgEngineFactory {
    async fn create(&self, homedir: &Path) -> Result<std::sync::Arc<dyn PgpEngine>, PgpError> {
        Ok(std::sync::Arc::new(GpgCommandEngine::init(homedir).await?))
    }
}

/// Production engine: the system `gpg` with an isolated home directory.
pub struct GpgCommandEngine {
    homedir: PathBuf,
}

impl GpgCommandEngine {
    /// Create the home directory with owner-only permissions and confirm
    /// the gpg binary is usable.
    pub async fn init(homedir: &Path) -> Result<Self, PgpError> {
        create_private_dir(homedir)?;

        let output = Command::new("gpg").arg("--version").output().await?;
        if !output.status.success() {
            return Err(PgpError::Engine("gpg --version failed".into()));
        }

        Ok(Self {
            homedir: homedir.to_path_buf(),
        })
    }

    pub fn homedir(&self) -> &Path {
        &self.homedir
    }

    async fn run_gpg(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<GpgOutput, PgpError> {
        let mut cmd = Command::new("gpg");
        cmd.arg("--homedir")
            .arg(&self.homedir)
            .arg("--batch")
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let Some(bytes) = stdin {
            let mut handle = child.stdin.take().ok_or_else(|| {
                PgpError::Engine("failed to open gpg stdin".into())
            })?;
            handle.write_all(bytes).await?;
            drop(handle);
        }

        let output = child.wait_with_output().await?;
        Ok(GpgOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

struct GpgOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

#[async_trait]
impl PgpEngine for GpgCommandEngine {
    async fn import_key(&self, armored: &str) -> Result<String, PgpError> {
        // show-only pass first: the fingerprint identifies the key we are
        // about to trust, so it must come from the key material itself
        let shown = self
            .run_gpg(
                &[
                    "--with-colons",
                    "--import-options",
                    "show-only",
                    "--import",
                ],
                Some(armored.as_bytes()),
            )
            .await?;
        let fingerprint = parse_first_fingerprint(&shown.stdout)
            .ok_or_else(|| PgpError::Engine("no fingerprint in key".into()))?;

        let imported = self.run_gpg(&["--import"], Some(armored.as_bytes())).await?;
        if !imported.success {
            return Err(PgpError::Engine(format!(
                "key import failed: {}",
                imported.stderr.trim()
            )));
        }

        debug!("imported key {fingerprint}");
        Ok(fingerprint)
    }

    async fn mark_key_good(&self, fingerprint: &str) -> Result<(), PgpError> {
        let output = self
            .run_gpg(
                &[
                    "--trust-model",
                    "tofu+pgp",
                    "--tofu-policy",
                    "good",
                    fingerprint,
                ],
                None,
            )
            .await?;
        if !output.success {
            return Err(PgpError::Engine(format!(
                "setting tofu policy failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn verify_detached(
        &self,
        contents: &[u8],
        signature: &[u8],
    ) -> Result<SignatureCheck, PgpError> {
        let sig_file = tempfile::NamedTempFile::new_in(&self.homedir)?;
        let contents_file = tempfile::NamedTempFile::new_in(&self.homedir)?;
        std::fs::write(sig_file.path(), signature)?;
        std::fs::write(contents_file.path(), contents)?;

        let sig_path = sig_file.path().to_string_lossy().into_owned();
        let contents_path = contents_file.path().to_string_lossy().into_owned();
        let output = self
            .run_gpg(
                &[
                    "--status-fd",
                    "1",
                    "--trust-model",
                    "tofu+pgp",
                    "--verify",
                    &sig_path,
                    &contents_path,
                ],
                None,
            )
            .await?;

        Ok(parse_verify_status(&output.stdout, output.success))
    }
}

fn create_private_dir(path: &Path) -> Result<(), PgpError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(path)?;
    }
    #[cfg(not(unix))]
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// First `fpr:` line of `--with-colons` output; field 10 is the
/// fingerprint.
fn parse_first_fingerprint(colons: &str) -> Option<String> {
    for line in colons.lines() {
        if let Some(rest) = line.strip_prefix("fpr:") {
            let fields: Vec<&str> = rest.split(':').collect();
            if let Some(fpr) = fields.get(8).filter(|f| !f.is_empty()) {
                return Some(fpr.to_string());
            }
        }
    }
    None
}

/// Map the gpg status stream onto the tri-state verdict:
/// BADSIG is definitely bad; GOODSIG+VALIDSIG with a clean exit is good;
/// anything else (unknown key, unusable signature, nonzero exit without a
/// bad signature) is inconclusive.
fn parse_verify_status(status_out: &str, exit_ok: bool) -> SignatureCheck {
    let mut fingerprint = None;
    let mut good = false;
    let mut bad = false;

    for line in status_out.lines() {
        let Some(rest) = line.strip_prefix("[GNUPG:] ") else {
            continue;
        };
        let mut tokens = rest.split_whitespace();
        match tokens.next() {
            Some("VALIDSIG") => {
                fingerprint = tokens.next().map(str::to_string);
            }
            Some("GOODSIG") => good = true,
            Some("BADSIG") => bad = true,
            _ => {}
        }
    }

    let verdict = if bad {
        TriState::False
    } else if good && exit_ok {
        TriState::True
    } else {
        TriState::Unknown
    };

    SignatureCheck {
        fingerprint,
        verdict,
    }
}
