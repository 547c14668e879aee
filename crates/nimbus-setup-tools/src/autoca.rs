//! Internal certificate authority and Java keystore management.

use std::path::{Path, PathBuf};

use nimbus_setup_common::constants::CA_CERTS_DIR;
use nimbus_setup_common::error::{Result, SetupError};

use crate::pathutil;
use crate::toolkit::JavaTool;

const GENERATE_CA_CLASS: &str = "org.nimbustools.auto_common.ezpz_ca.GenerateNewCA";
const KEYSTORE_FROM_PEM_CLASS: &str = "org.nimbustools.auto_common.ezpz_ca.KeystoreFromPEM";
const KEYSTORE_MATCH_CLASS: &str = "org.nimbustools.auto_common.ezpz_ca.KeystoreMatch";

/// Exit status of the keystore match tool when the keystore holds a
/// different certificate or key.
const KEYSTORE_MISMATCH_STATUS: i32 = 3;

/// Trusted certificates directory the CA tool populates, relative to the CA
/// directory.
const CA_TRUSTED_CERTS_DIR: &str = "trusted-certs";

/// Path of the CA certificate for the CA called `name`.
#[must_use]
pub fn ca_cert_path(ca_dir: &Path, name: &str) -> PathBuf {
    ca_dir.join(CA_CERTS_DIR).join(format!("{name}.pem"))
}

/// Path of the CA private key for the CA called `name`.
#[must_use]
pub fn ca_key_path(ca_dir: &Path, name: &str) -> PathBuf {
    ca_dir.join(CA_CERTS_DIR).join(format!("private-key-{name}.pem"))
}

/// Creates the CA directory layout and generates a new CA into it.
///
/// # Errors
///
/// Returns an error if the directories cannot be created or the CA tool
/// fails.
pub fn create_ca(tool: &JavaTool<'_>, name: &str, ca_dir: &Path) -> Result<()> {
    let certs_dir = ca_dir.join(CA_CERTS_DIR);
    let trusted_dir = ca_dir.join(CA_TRUSTED_CERTS_DIR);
    for dir in [&certs_dir, &trusted_dir] {
        std::fs::create_dir_all(dir).map_err(|e| SetupError::io(dir, e))?;
    }

    tracing::info!(name, ca_dir = %ca_dir.display(), "creating certificate authority");
    let _ = tool.run_checked(
        GENERATE_CA_CLASS,
        &[
            certs_dir.display().to_string(),
            trusted_dir.display().to_string(),
            name.to_owned(),
        ],
    )?;

    let key = ca_key_path(ca_dir, name);
    if key.is_file() {
        pathutil::make_private(&key)?;
    }
    Ok(())
}

/// Inputs for [`ensure_keystore`].
#[derive(Debug, Clone, Copy)]
pub struct KeystoreRequest<'a> {
    /// Host certificate (PEM).
    pub cert: &'a Path,
    /// Host private key (PEM).
    pub key: &'a Path,
    /// Keystore file.
    pub keystore: &'a Path,
    /// Keystore password.
    pub password: &'a str,
}

/// What [`ensure_keystore`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreStatus {
    /// No keystore existed; one was built from the certificate and key.
    Created,
    /// The existing keystore holds the certificate and key.
    Matched,
    /// The existing keystore holds something else. It was left untouched.
    Mismatched,
}

/// Creates the keystore if absent, otherwise checks that it holds the
/// configured certificate and key.
///
/// # Errors
///
/// Returns an error if the keystore tool fails for any reason other than a
/// mismatch.
pub fn ensure_keystore(tool: &JavaTool<'_>, request: &KeystoreRequest<'_>) -> Result<KeystoreStatus> {
    let args = [
        request.cert.display().to_string(),
        request.key.display().to_string(),
        request.keystore.display().to_string(),
        request.password.to_owned(),
    ];

    if request.keystore.exists() {
        let output = tool.run_class(KEYSTORE_MATCH_CLASS, &args)?;
        if output.exit_code == KEYSTORE_MISMATCH_STATUS {
            tracing::warn!(keystore = %request.keystore.display(), "keystore does not hold the host credentials");
            return Ok(KeystoreStatus::Mismatched);
        }
        let _ = output.success_or(KEYSTORE_MATCH_CLASS)?;
        tracing::debug!(keystore = %request.keystore.display(), "keystore matches host credentials");
        return Ok(KeystoreStatus::Matched);
    }

    pathutil::ensure_parent_dir(request.keystore)?;
    let _ = tool.run_checked(KEYSTORE_FROM_PEM_CLASS, &args)?;
    tracing::info!(keystore = %request.keystore.display(), "created keystore");
    Ok(KeystoreStatus::Created)
}
