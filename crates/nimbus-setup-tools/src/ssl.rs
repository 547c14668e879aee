//! Host certificate validation and generation.

use std::path::Path;

use nimbus_setup_common::error::{Result, SetupError};

use crate::pathutil;
use crate::toolkit::JavaTool;

const GENERATE_CERT_CLASS: &str = "org.nimbustools.auto_common.ezpz_ca.GenerateNewCert";

/// Inputs for [`check_host_cert`].
#[derive(Debug, Clone, Copy)]
pub struct HostCertRequest<'a> {
    /// Fully qualified hostname the certificate is issued for.
    pub hostname: &'a str,
    /// Host certificate (PEM).
    pub cert: &'a Path,
    /// Host private key (PEM).
    pub key: &'a Path,
    /// CA certificate used to sign a generated host certificate.
    pub ca_cert: &'a Path,
    /// CA private key used to sign a generated host certificate.
    pub ca_key: &'a Path,
}

/// What [`check_host_cert`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCertStatus {
    /// Both files were already present.
    Present,
    /// Neither existed; a pair was issued by the internal CA.
    Generated,
}

/// Accepts an existing certificate/key pair or issues a new one from the
/// internal CA when both are missing.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if exactly one of the pair
/// exists or the generator leaves one missing, or a command error if the
/// generator fails.
pub fn check_host_cert(tool: &JavaTool<'_>, request: &HostCertRequest<'_>) -> Result<HostCertStatus> {
    let have_cert = request.cert.is_file();
    let have_key = request.key.is_file();

    match (have_cert, have_key) {
        (true, true) => {
            tracing::debug!(
                cert = %request.cert.display(),
                key = %request.key.display(),
                "using existing host certificate and key"
            );
            return Ok(HostCertStatus::Present);
        }
        (true, false) => {
            return Err(SetupError::incompatible(format!(
                "host certificate exists but its private key does not: {}",
                request.key.display()
            )));
        }
        (false, true) => {
            return Err(SetupError::incompatible(format!(
                "host private key exists but its certificate does not: {}",
                request.cert.display()
            )));
        }
        (false, false) => {}
    }

    tracing::info!(hostname = request.hostname, "issuing host certificate from internal CA");
    pathutil::ensure_parent_dir(request.cert)?;
    pathutil::ensure_parent_dir(request.key)?;
    let _ = tool.run_checked(
        GENERATE_CERT_CLASS,
        &[
            request.ca_cert.display().to_string(),
            request.ca_key.display().to_string(),
            request.hostname.to_owned(),
            request.cert.display().to_string(),
            request.key.display().to_string(),
        ],
    )?;

    pathutil::ensure_file_exists(request.cert, "generated host certificate")?;
    pathutil::ensure_file_exists(request.key, "generated host private key")?;
    pathutil::make_private(request.key)?;
    Ok(HostCertStatus::Generated)
}
