//! Fixed file names, layout conventions and exit codes.

/// Name of the single section in the setup configuration file.
pub const CONFIG_SECTION: &str = "nimbussetup";

/// State file, relative to the base directory, holding the merged settings
/// of the last run.
pub const CONFIG_STATE_PATH: &str = "nimbus-setup.conf";

/// Web application directory, relative to the base directory.
pub const WEB_DIR: &str = "web/";

/// GT container directory, relative to the base directory.
pub const CONTAINER_DIR: &str = "services/";

/// Shell environment file, relative to the base directory.
pub const ENV_FILE: &str = "libexec/environment.sh";

/// Web service configuration file, relative to the web directory.
pub const WEB_CONF_FILE: &str = "nimbusweb.conf";

/// Section of the web service configuration holding the SSL settings.
pub const WEB_CONF_SECTION: &str = "nimbusweb";

/// Web reconfiguration script, relative to the web directory.
pub const WEB_NEWCONF_SCRIPT: &str = "sbin/new-conf.sh";

/// Marker left in the web directory once it has been configured.
pub const WEB_CONFIGURED_MARKER: &str = ".nimbusconfigured";

/// Autoconfig probe, relative to the container directory.
pub const AUTOCONFIG_SCRIPT: &str = "share/nimbus-autoconfig/autoconfig.sh";

/// Derby launcher jar, relative to the container directory.
pub const DERBYRUN_JAR: &str = "lib/derbyrun.jar";

/// Live accounting database, relative to the container directory.
pub const ACCOUNTING_DB: &str = "var/nimbus/WorkspaceAccountingDB";

/// Database persistence properties, relative to the container directory.
pub const DB_PROPS_FILE: &str = "share/nimbus/workspace.persistence.conf";

/// Cumulus properties consumed by the workspace service, relative to the
/// container directory.
pub const CUMULUS_PROPS_FILE: &str = "etc/nimbus/workspace-service/cumulus.conf";

/// Cumulus INI file, relative to the base directory.
pub const CUMULUS_INI_FILE: &str = "cumulus/etc/cumulus.ini";

/// Cumulus authorization database, relative to the base directory.
pub const CUMULUS_AUTHZ_DB: &str = "cumulus/etc/authz.db";

/// Cumulus POSIX storage root, relative to the base directory.
pub const CUMULUS_REPO_DIR: &str = "cumulus/posixdata";

/// Bucket holding VM images in the Cumulus repository.
pub const CUMULUS_REPO_BUCKET: &str = "Repo";

/// Key prefix for VM images inside the repository bucket.
pub const CUMULUS_REPO_PREFIX: &str = "VMS";

/// Subdirectory of the CA directory holding the CA certificate and key.
pub const CA_CERTS_DIR: &str = "ca-certs";

/// Process exit codes.
pub mod exit {
    /// Read-only action succeeded.
    pub const OK: u8 = 0;
    /// Bad command-line input, missing probe, or unset value.
    pub const INVALID_INPUT: u8 = 1;
    /// Required configuration missing or unusable.
    pub const INVALID_CONFIG: u8 = 2;
    /// Environment prerequisites unmet, or not a POSIX system.
    pub const INCOMPATIBLE_ENVIRONMENT: u8 = 3;
    /// Java runtime too old.
    pub const UNSUPPORTED_RUNTIME: u8 = 4;
    /// Interrupted by the user.
    pub const INTERRUPTED: u8 = 5;
    /// Full setup completed. The wrapper script treats this as success.
    pub const SETUP_COMPLETE: u8 = 42;
    /// Anything else.
    pub const INTERNAL_ERROR: u8 = 97;
}
