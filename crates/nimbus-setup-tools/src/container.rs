//! GT container configuration adjustments.
//!
//! Each adjustment hands one setting to a confmgr tool that edits the
//! container's XML deployment files in place.

use std::path::Path;

use nimbus_setup_common::error::Result;

use crate::toolkit::JavaTool;

const CONFMGR: &str = "org.nimbustools.auto_config.confmgr";

/// Container server configuration, relative to the container directory.
pub const SERVER_CONFIG: &str = "etc/globus_wsrf_core/server-config.wsdd";

/// Container-wide security descriptor, relative to the container directory.
pub const SECURITY_DESCRIPTOR: &str = "etc/globus_wsrf_core/global_security_descriptor.xml";

/// Context broker JNDI configuration, relative to the container directory.
pub const BROKER_CONFIG: &str = "etc/nimbus-context-broker/jndi-config.xml";

/// Credentials handed to the context broker.
#[derive(Debug, Clone, Copy)]
pub struct BrokerSettings<'a> {
    /// CA certificate the broker signs with.
    pub ca_cert: &'a Path,
    /// CA private key the broker signs with.
    pub ca_key: &'a Path,
    /// Keystore holding the host credentials.
    pub keystore: &'a Path,
    /// Keystore password.
    pub password: &'a str,
}

fn confmgr(tool: &JavaTool<'_>, tool_name: &str, args: &[String]) -> Result<()> {
    let class = format!("{CONFMGR}.{tool_name}");
    let _ = tool.run_checked(&class, args)?;
    Ok(())
}

fn path_arg(gtdir: &Path, relative: &str) -> String {
    gtdir.join(relative).display().to_string()
}

/// Sets the container's logical host to `hostname`.
///
/// # Errors
///
/// Returns an error if the confmgr tool fails.
pub fn adjust_hostname(tool: &JavaTool<'_>, gtdir: &Path, hostname: &str) -> Result<()> {
    tracing::info!(hostname, "setting container hostname");
    confmgr(
        tool,
        "ReplaceLogicalHost",
        &[path_arg(gtdir, SERVER_CONFIG), hostname.to_owned()],
    )
}

/// Points the server configuration at the global security descriptor.
///
/// # Errors
///
/// Returns an error if the confmgr tool fails.
pub fn adjust_secdesc_path(tool: &JavaTool<'_>, gtdir: &Path) -> Result<()> {
    confmgr(
        tool,
        "ReplaceSecDescPath",
        &[path_arg(gtdir, SERVER_CONFIG), path_arg(gtdir, SECURITY_DESCRIPTOR)],
    )
}

/// Sets the host certificate and key in the security descriptor.
///
/// # Errors
///
/// Returns an error if the confmgr tool fails.
pub fn adjust_host_cert(tool: &JavaTool<'_>, gtdir: &Path, cert: &Path, key: &Path) -> Result<()> {
    tracing::info!(cert = %cert.display(), key = %key.display(), "setting container host credentials");
    confmgr(
        tool,
        "ReplaceCertFile",
        &[
            path_arg(gtdir, SECURITY_DESCRIPTOR),
            cert.display().to_string(),
            key.display().to_string(),
        ],
    )
}

/// Sets the grid-mapfile in the security descriptor.
///
/// # Errors
///
/// Returns an error if the confmgr tool fails.
pub fn adjust_gridmap_file(tool: &JavaTool<'_>, gtdir: &Path, gridmap: &Path) -> Result<()> {
    confmgr(
        tool,
        "ReplaceGridmap",
        &[path_arg(gtdir, SECURITY_DESCRIPTOR), gridmap.display().to_string()],
    )
}

/// Configures the context broker's CA and keystore.
///
/// # Errors
///
/// Returns an error if the confmgr tool fails.
pub fn adjust_broker_config(tool: &JavaTool<'_>, gtdir: &Path, broker: &BrokerSettings<'_>) -> Result<()> {
    tracing::info!("configuring context broker");
    confmgr(
        tool,
        "ReplaceBrokerConfig",
        &[
            path_arg(gtdir, BROKER_CONFIG),
            broker.ca_cert.display().to_string(),
            broker.ca_key.display().to_string(),
            broker.keystore.display().to_string(),
            broker.password.to_owned(),
        ],
    )
}
