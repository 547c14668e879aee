//! The setup orchestrator.
//!
//! [`NimbusSetup::perform_setup`] runs the whole configuration sequence. Each
//! step either completes or aborts the run with a typed error; nothing is
//! retried and earlier steps are not rolled back.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use nimbus_setup_common::constants::{WEB_CONFIGURED_MARKER, WEB_NEWCONF_SCRIPT};
use nimbus_setup_common::error::{Result, SetupError};
use nimbus_setup_tools::autoca::{self, KeystoreRequest, KeystoreStatus};
use nimbus_setup_tools::container::BrokerSettings;
use nimbus_setup_tools::pathutil;
use nimbus_setup_tools::process::{Invocation, ProcessRunner};
use nimbus_setup_tools::ssl::HostCertRequest;
use nimbus_setup_tools::toolkit::Toolkit;

use crate::artifacts;
use crate::config::SetupConfig;
use crate::paths::{self, ResolvedPaths};
use crate::prompt::{self, Prompter, TerminalPrompter};

/// Source of the machine's hostname, used as the default answer.
pub type HostnameDetector = fn() -> Result<String>;

/// Explanation shown before asking for a CA name.
#[must_use]
pub fn ca_name_question(ca_dir: &Path) -> String {
    format!(
        r#"
Nimbus uses an internal Certificate Authority (CA) for some services. This CA
is also used to generate host and user certificates if you do not have your own.

This CA will be created in {}

Please pick a unique, one word CA name or hit ENTER to use a UUID.

For example, if you are installing this on the "Jupiter" cluster, you might use
"JupiterNimbusCA" as the name.
"#,
        ca_dir.display()
    )
}

/// Explains a keystore that holds different credentials than the configured
/// host certificate and key.
#[must_use]
pub fn keystore_mismatch_message(keystore: &Path, hostcert: &Path, hostkey: &Path) -> String {
    format!(
        "
A Java keystore already exists at:
    {}
However, it does not contain the host certificate and private key which are
being configured.
    Certificate: {}
    Private key: {}
This may be because you have switched certificates and the keystore contains
the old version. If so, the best solution is to delete (or relocate) the
keystore and rerun nimbus-configure to generate a new one.
",
        keystore.display(),
        hostcert.display(),
        hostkey.display()
    )
}

/// The system hostname.
///
/// # Errors
///
/// Returns [`SetupError::Unexpected`] if the hostname cannot be read or is
/// not valid UTF-8.
pub fn detect_hostname() -> Result<String> {
    nix::unistd::gethostname()
        .map_err(|e| SetupError::unexpected(format!("could not determine hostname: {e}")))?
        .into_string()
        .map_err(|_| SetupError::unexpected("hostname is not valid UTF-8"))
}

/// Drives one configuration run against an installation.
pub struct NimbusSetup<'a> {
    pub(crate) config: SetupConfig,
    pub(crate) paths: ResolvedPaths,
    pub(crate) interactive: bool,
    pub(crate) toolkit: &'a dyn Toolkit,
    pub(crate) runner: &'a dyn ProcessRunner,
    prompter: Box<dyn Prompter + 'a>,
    detect_hostname: HostnameDetector,
}

impl<'a> NimbusSetup<'a> {
    /// Creates an orchestrator for the installation at `basedir`.
    ///
    /// Questions go to the terminal. The run is interactive when standard
    /// input is a terminal.
    pub fn new(
        basedir: impl Into<PathBuf>,
        config: SetupConfig,
        toolkit: &'a dyn Toolkit,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        let basedir = basedir.into();
        let paths = ResolvedPaths::resolve(&basedir, &config);
        Self {
            config,
            paths,
            interactive: std::io::stdin().is_terminal(),
            toolkit,
            runner,
            prompter: Box::new(TerminalPrompter::stdio()),
            detect_hostname,
        }
    }

    /// Forces interactive or non-interactive mode.
    #[must_use]
    pub const fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Sends messages and questions through `prompter`.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Box<dyn Prompter + 'a>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Replaces the hostname lookup.
    #[must_use]
    pub fn with_hostname_detector(mut self, detector: HostnameDetector) -> Self {
        self.detect_hostname = detector;
        self
    }

    /// Current settings, including values settled during the run.
    pub const fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Locations resolved for this run.
    pub const fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Checks the installation layout and the Java runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::IncompatibleEnvironment`] if the base directory
    /// is relative or a required directory is missing, or the runtime check
    /// error.
    pub fn validate_environment(&self) -> Result<()> {
        if !self.paths.basedir.is_absolute() {
            return Err(SetupError::incompatible("Base directory setting is not absolute"));
        }
        pathutil::ensure_dir_exists(&self.paths.basedir, "base")?;
        pathutil::ensure_dir_exists(&self.paths.webdir, "web")?;
        pathutil::ensure_dir_exists(&self.paths.gtdir, "GT container")?;
        self.toolkit.check_runtime()
    }

    /// Settles the hostname: asks in interactive mode, otherwise announces
    /// and uses the configured or detected name.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails or the question cannot be asked.
    pub fn ask_hostname(&mut self) -> Result<String> {
        let guess = match &self.config.hostname {
            Some(hostname) => hostname.clone(),
            None => (self.detect_hostname)()?,
        };

        if !self.interactive {
            self.prompter.say(&format!("Using hostname: '{guess}'"))?;
            return Ok(guess);
        }

        self.prompter
            .say("\nWhat is the fully qualified hostname of this machine?\n")?;
        self.prompter
            .say(&format!("Press ENTER to use the detected value ({guess})\n"))?;
        let answer = prompt::get_user_input(self.prompter.as_mut(), "Hostname", Some(guess.as_str()), true)?;
        Ok(answer.unwrap_or(guess))
    }

    /// Settles a name for a new CA, falling back to a random UUID.
    ///
    /// # Errors
    ///
    /// Returns an error if the question cannot be asked or `ca.dir` is unset.
    pub fn ask_ca_name(&mut self) -> Result<String> {
        let configured = self.config.ca_name.clone();

        if !self.interactive {
            let name = configured.unwrap_or_else(pathutil::uuidgen);
            self.prompter.say(&format!("Creating CA with name: '{name}'"))?;
            return Ok(name);
        }

        let cadir = paths::require(self.paths.cadir.as_ref(), "ca.dir")?;
        self.prompter.say(&ca_name_question(cadir))?;
        match prompt::get_user_input(self.prompter.as_mut(), "CA Name", configured.as_deref(), false)? {
            Some(name) => Ok(name),
            None => {
                let name = pathutil::uuidgen();
                self.prompter
                    .say(&format!("You did not enter a name, using '{name}'"))?;
                Ok(name)
            }
        }
    }

    /// Returns the configured hostname, or settles and records one.
    ///
    /// # Errors
    ///
    /// Returns an error from [`Self::ask_hostname`].
    pub fn get_hostname_or_ask(&mut self) -> Result<String> {
        if let Some(hostname) = &self.config.hostname {
            tracing::debug!(hostname = %hostname, "Using configured hostname. Run with --hostname to change.");
            return Ok(hostname.clone());
        }
        let hostname = self.ask_hostname()?;
        self.config.hostname = Some(hostname.clone());
        Ok(hostname)
    }

    /// Runs the full configuration sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error hit; later steps are skipped.
    pub fn perform_setup(&mut self) -> Result<()> {
        let paths = self.paths.clone();
        let cadir = paths::require(paths.cadir.as_ref(), "ca.dir")?;

        let mut ca_name = self.config.ca_name.clone();
        if !cadir.exists() {
            let name = self.ask_ca_name()?;
            self.config.ca_name = Some(name.clone());
            self.toolkit.create_ca(&name, cadir)?;
            ca_name = Some(name);
        }
        let ca_name = ca_name.ok_or_else(|| SetupError::invalid_config("CA name is unknown"))?;

        let ca_cert = autoca::ca_cert_path(cadir, &ca_name);
        let ca_key = autoca::ca_key_path(cadir, &ca_name);
        pathutil::ensure_file_exists(&ca_cert, "CA certificate")?;
        pathutil::ensure_file_exists(&ca_key, "CA private key")?;

        let hostname = self.get_hostname_or_ask()?;

        let hostcert = paths::require(paths.hostcert.as_ref(), "hostcert")?;
        let hostkey = paths::require(paths.hostkey.as_ref(), "hostkey")?;
        let _ = self.toolkit.check_host_cert(&HostCertRequest {
            hostname: &hostname,
            cert: hostcert,
            key: hostkey,
            ca_cert: &ca_cert,
            ca_key: &ca_key,
        })?;

        let password = self
            .config
            .keystore_pass
            .clone()
            .ok_or_else(|| SetupError::invalid_config("Keystore password is unknown"))?;
        let keystore = paths::require(paths.keystore.as_ref(), "keystore")?;
        let status = self.toolkit.ensure_keystore(&KeystoreRequest {
            cert: hostcert,
            key: hostkey,
            keystore,
            password: &password,
        })?;
        if status == KeystoreStatus::Mismatched {
            return Err(SetupError::incompatible(keystore_mismatch_message(
                keystore, hostcert, hostkey,
            )));
        }
        pathutil::make_private(keystore)?;

        artifacts::update_web_conf(&paths.webdir, hostcert, hostkey, cadir)?;

        self.toolkit.adjust_hostname(&hostname)?;
        self.toolkit.adjust_secdesc_path()?;
        self.toolkit.adjust_host_cert(hostcert, hostkey)?;
        self.toolkit
            .adjust_gridmap_file(paths::require(paths.gridmap.as_ref(), "gridmap")?)?;
        self.toolkit.adjust_broker_config(&BrokerSettings {
            ca_cert: &ca_cert,
            ca_key: &ca_key,
            keystore,
            password: &password,
        })?;

        if self.config.web_enabled {
            self.run_web_newconf()?;
        }

        let trusted = paths::require(paths.trustedcertsdir.as_ref(), "ca.trustedcerts.dir")?;
        artifacts::write_env_file(&paths.envfile, &paths.basedir, &paths.gtdir, trusted)?;
        artifacts::write_db_props(&paths.gtdir)?;
        artifacts::write_cumulus_props(&paths.basedir, &paths.gtdir, self.config.hostname.as_deref())?;
        artifacts::update_cumulus_ini(&paths.basedir, hostkey, hostcert, &hostname)?;

        tracing::info!(hostname = %hostname, ca_name = %ca_name, "setup complete");
        Ok(())
    }

    /// Runs [`Self::perform_setup`], then writes the settings to the state
    /// file at `state_path` whether or not the run finished.
    ///
    /// Values settled before a failure, such as the name of a CA created in
    /// this run, are kept for the next run. A failure to save is logged and
    /// never replaces the setup result.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Self::perform_setup`].
    pub fn perform_setup_and_save(&mut self, state_path: &Path) -> Result<()> {
        let outcome = self.perform_setup();
        tracing::debug!(path = %state_path.display(), "saving settings");
        if let Err(e) = self.config.save_state(state_path) {
            tracing::info!(error = %e, "Failed to save settings to {}!", state_path.display());
        }
        outcome
    }

    /// Regenerates the web application's configuration, then leaves the
    /// configured marker behind.
    fn run_web_newconf(&self) -> Result<()> {
        let script = self.paths.webdir.join(WEB_NEWCONF_SCRIPT);
        tracing::info!(script = %script.display(), "running web configuration script");
        let _ = self
            .runner
            .run(
                &Invocation::new(&script)
                    .current_dir(&self.paths.webdir)
                    .interactive(),
            )?
            .success_or(&script.display().to_string())?;

        let marker = self.paths.webdir.join(WEB_CONFIGURED_MARKER);
        if !marker.is_file() {
            artifacts::write_text(&marker, "")?;
        }
        Ok(())
    }
}
