//! Filesystem locations derived from the base directory and configuration.

use std::path::{Path, PathBuf};

use nimbus_setup_common::constants::{CONTAINER_DIR, ENV_FILE, WEB_DIR};
use nimbus_setup_common::error::{Result, SetupError};
use nimbus_setup_tools::pathutil;

use crate::config::SetupConfig;

/// Every location the setup run touches, resolved once.
///
/// Relative values are joined against the base directory; absolute values are
/// kept as they are. Path settings that are unset resolve to `None` and only
/// fail when a step actually needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Installation base directory.
    pub basedir: PathBuf,
    /// Web application directory.
    pub webdir: PathBuf,
    /// GT container directory.
    pub gtdir: PathBuf,
    /// Internal CA directory.
    pub cadir: Option<PathBuf>,
    /// Trusted CA certificates directory.
    pub trustedcertsdir: Option<PathBuf>,
    /// Host certificate.
    pub hostcert: Option<PathBuf>,
    /// Host private key.
    pub hostkey: Option<PathBuf>,
    /// Java keystore.
    pub keystore: Option<PathBuf>,
    /// Container grid-mapfile.
    pub gridmap: Option<PathBuf>,
    /// Shell environment file.
    pub envfile: PathBuf,
}

impl ResolvedPaths {
    /// Resolves every location for `basedir` under `config`.
    #[must_use]
    pub fn resolve(basedir: &Path, config: &SetupConfig) -> Self {
        let from_config = |value: &Option<PathBuf>| value.as_ref().map(|p| pathutil::resolve(basedir, p));
        Self {
            basedir: basedir.to_path_buf(),
            webdir: pathutil::resolve(basedir, WEB_DIR),
            gtdir: pathutil::resolve(basedir, CONTAINER_DIR),
            cadir: from_config(&config.ca_dir),
            trustedcertsdir: from_config(&config.ca_trustedcerts_dir),
            hostcert: from_config(&config.hostcert),
            hostkey: from_config(&config.hostkey),
            keystore: from_config(&config.keystore),
            gridmap: from_config(&config.gridmap),
            envfile: pathutil::resolve(basedir, ENV_FILE),
        }
    }
}

/// Unwraps an optional location, failing with invalid-config naming `key`.
///
/// # Errors
///
/// Returns [`SetupError::InvalidConfig`] when `value` is `None`.
pub fn require<'a>(value: Option<&'a PathBuf>, key: &str) -> Result<&'a Path> {
    value
        .map(PathBuf::as_path)
        .ok_or_else(|| SetupError::invalid_config(format!("no value configured for '{key}'")))
}
