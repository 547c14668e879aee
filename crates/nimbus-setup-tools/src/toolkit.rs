//! The collaborator seam between the setup orchestrator and the outside
//! world.
//!
//! [`Toolkit`] lists every black-box operation the setup sequence needs.
//! [`JavaToolkit`] is the production implementation, which drives the Java
//! tools shipped in the web directory's `lib/`.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use nimbus_setup_common::error::{Result, SetupError};

use crate::autoca::{self, KeystoreRequest, KeystoreStatus};
use crate::container::{self, BrokerSettings};
use crate::derby;
use crate::java;
use crate::process::{ExecOutput, Invocation, ProcessRunner};
use crate::ssl::{self, HostCertRequest, HostCertStatus};

/// External operations invoked by the setup sequence.
///
/// Implementors handle the details of each tool; the orchestrator only sees
/// success, a typed status, or an error.
pub trait Toolkit {
    /// Checks that a compatible Java runtime is available.
    ///
    /// # Errors
    ///
    /// Returns an error if no runtime is found or it is too old.
    fn check_runtime(&self) -> Result<()>;

    /// Creates a new certificate authority called `name` in `ca_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA tool fails.
    fn create_ca(&self, name: &str, ca_dir: &Path) -> Result<()>;

    /// Validates the host certificate and key, generating them from the CA
    /// if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if only one of the pair exists or generation fails.
    fn check_host_cert(&self, request: &HostCertRequest<'_>) -> Result<HostCertStatus>;

    /// Creates the keystore from the host certificate and key, or checks that
    /// an existing keystore holds them.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore tool fails.
    fn ensure_keystore(&self, request: &KeystoreRequest<'_>) -> Result<KeystoreStatus>;

    /// Points the container at `hostname`.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjustment tool fails.
    fn adjust_hostname(&self, hostname: &str) -> Result<()>;

    /// Points the container at its security descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjustment tool fails.
    fn adjust_secdesc_path(&self) -> Result<()>;

    /// Points the container's security descriptor at the host credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjustment tool fails.
    fn adjust_host_cert(&self, cert: &Path, key: &Path) -> Result<()>;

    /// Points the container's security descriptor at the grid-mapfile.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjustment tool fails.
    fn adjust_gridmap_file(&self, gridmap: &Path) -> Result<()>;

    /// Configures the context broker with CA material and keystore
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjustment tool fails.
    fn adjust_broker_config(&self, broker: &BrokerSettings<'_>) -> Result<()>;

    /// Copies accounting records from `old_db` into `new_db` using the Derby
    /// tools in `derbyrun`.
    ///
    /// # Errors
    ///
    /// Returns an error if the migration utility reports a failure.
    fn import_accounting_db(&self, derbyrun: &Path, old_db: &Path, new_db: &Path) -> Result<()>;
}

/// A located `java` plus the classpath of the installation's tools.
pub struct JavaTool<'a> {
    runner: &'a dyn ProcessRunner,
    java: &'a Path,
    classpath: String,
}

impl<'a> JavaTool<'a> {
    /// Creates a tool handle.
    pub fn new(runner: &'a dyn ProcessRunner, java: &'a Path, classpath: impl Into<String>) -> Self {
        Self {
            runner,
            java,
            classpath: classpath.into(),
        }
    }

    /// Runs `class` with `args` and returns its output whatever the exit
    /// status.
    ///
    /// # Errors
    ///
    /// Returns an error if `java` cannot be started.
    pub fn run_class(&self, class: &str, args: &[String]) -> Result<ExecOutput> {
        tracing::debug!(class, "invoking Java tool");
        let mut invocation = Invocation::new(self.java)
            .arg("-cp")
            .arg(self.classpath.clone())
            .arg(class);
        invocation.args.extend(args.iter().cloned());
        self.runner.run(&invocation)
    }

    /// Like [`JavaTool::run_class`] but a nonzero exit is an error.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::CommandFailed`] on a nonzero exit.
    pub fn run_checked(&self, class: &str, args: &[String]) -> Result<ExecOutput> {
        self.run_class(class, args)?.success_or(class)
    }
}

/// Builds a classpath from every `.jar` in `lib_dir`, sorted by name.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if the directory cannot be
/// read.
pub fn classpath_from_dir(lib_dir: &Path) -> Result<String> {
    let entries = std::fs::read_dir(lib_dir).map_err(|e| {
        SetupError::incompatible(format!(
            "cannot read Java library directory {}: {e}",
            lib_dir.display()
        ))
    })?;
    let mut jars: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jar"))
        .collect();
    jars.sort();
    let joined = std::env::join_paths(&jars).map_err(|e| {
        SetupError::incompatible(format!("unusable Java library path in {}: {e}", lib_dir.display()))
    })?;
    Ok(joined.to_string_lossy().into_owned())
}

/// Production [`Toolkit`] that runs the installation's Java tools.
pub struct JavaToolkit {
    webdir: PathBuf,
    gtdir: PathBuf,
    runner: Box<dyn ProcessRunner>,
    java_home: Option<PathBuf>,
    java: OnceCell<PathBuf>,
}

impl JavaToolkit {
    /// Creates a toolkit for the installation with the given web and
    /// container directories. `JAVA_HOME` is read from the environment.
    pub fn new(webdir: impl Into<PathBuf>, gtdir: impl Into<PathBuf>, runner: Box<dyn ProcessRunner>) -> Self {
        Self {
            webdir: webdir.into(),
            gtdir: gtdir.into(),
            runner,
            java_home: std::env::var_os("JAVA_HOME").map(PathBuf::from),
            java: OnceCell::new(),
        }
    }

    /// Uses `java` as the Java executable instead of searching for one.
    #[must_use]
    pub fn with_java(self, java: impl Into<PathBuf>) -> Self {
        let _ = self.java.set(java.into());
        self
    }

    fn java(&self) -> Result<&Path> {
        if let Some(found) = self.java.get() {
            return Ok(found.as_path());
        }
        let found = java::locate(self.java_home.as_deref())?;
        Ok(self.java.get_or_init(|| found).as_path())
    }

    fn tool(&self) -> Result<JavaTool<'_>> {
        let classpath = classpath_from_dir(&self.webdir.join("lib"))?;
        Ok(JavaTool::new(self.runner.as_ref(), self.java()?, classpath))
    }
}

impl Toolkit for JavaToolkit {
    fn check_runtime(&self) -> Result<()> {
        let _ = java::check(self.runner.as_ref(), self.java()?)?;
        Ok(())
    }

    fn create_ca(&self, name: &str, ca_dir: &Path) -> Result<()> {
        autoca::create_ca(&self.tool()?, name, ca_dir)
    }

    fn check_host_cert(&self, request: &HostCertRequest<'_>) -> Result<HostCertStatus> {
        ssl::check_host_cert(&self.tool()?, request)
    }

    fn ensure_keystore(&self, request: &KeystoreRequest<'_>) -> Result<KeystoreStatus> {
        autoca::ensure_keystore(&self.tool()?, request)
    }

    fn adjust_hostname(&self, hostname: &str) -> Result<()> {
        container::adjust_hostname(&self.tool()?, &self.gtdir, hostname)
    }

    fn adjust_secdesc_path(&self) -> Result<()> {
        container::adjust_secdesc_path(&self.tool()?, &self.gtdir)
    }

    fn adjust_host_cert(&self, cert: &Path, key: &Path) -> Result<()> {
        container::adjust_host_cert(&self.tool()?, &self.gtdir, cert, key)
    }

    fn adjust_gridmap_file(&self, gridmap: &Path) -> Result<()> {
        container::adjust_gridmap_file(&self.tool()?, &self.gtdir, gridmap)
    }

    fn adjust_broker_config(&self, broker: &BrokerSettings<'_>) -> Result<()> {
        container::adjust_broker_config(&self.tool()?, &self.gtdir, broker)
    }

    fn import_accounting_db(&self, derbyrun: &Path, old_db: &Path, new_db: &Path) -> Result<()> {
        derby::update_db(self.runner.as_ref(), self.java()?, derbyrun, old_db, new_db)
    }
}
