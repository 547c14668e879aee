//! One-off actions that run instead of the full setup.

use std::path::{Path, PathBuf};

use nimbus_setup_common::constants::{ACCOUNTING_DB, AUTOCONFIG_SCRIPT, CUMULUS_REPO_BUCKET, DERBYRUN_JAR};
use nimbus_setup_common::error::{Result, SetupError};
use nimbus_setup_tools::pathutil;
use nimbus_setup_tools::process::Invocation;

use crate::setup::NimbusSetup;

/// Result of [`NimbusSetup::autoconfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoconfigOutcome {
    /// The probe ran and exited with this status.
    Ran(i32),
    /// The probe is missing or not executable.
    Missing(PathBuf),
}

impl NimbusSetup<'_> {
    /// Runs the autoconfig probe attached to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe cannot be started.
    pub fn autoconfig(&self) -> Result<AutoconfigOutcome> {
        let script = self.paths.gtdir.join(AUTOCONFIG_SCRIPT);
        if !pathutil::is_executable(&script) {
            return Ok(AutoconfigOutcome::Missing(script));
        }
        tracing::info!(script = %script.display(), "running autoconfig");
        let output = self.runner.run(&Invocation::new(&script).interactive())?;
        Ok(AutoconfigOutcome::Ran(output.exit_code))
    }

    /// Copies accounting records from the database at `old_db` into this
    /// installation's database.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::IncompatibleEnvironment`] if the Derby launcher
    /// or the current database is missing, [`SetupError::InvalidInput`] if
    /// `old_db` is not a directory, or the migration error.
    pub fn import_db(&self, old_db: &Path) -> Result<()> {
        let derbyrun = self.paths.gtdir.join(DERBYRUN_JAR);
        if !derbyrun.exists() {
            return Err(SetupError::incompatible(format!(
                "derbyrun.jar does not exist: {}",
                derbyrun.display()
            )));
        }

        let new_db = self.paths.gtdir.join(ACCOUNTING_DB);
        if !new_db.is_dir() {
            return Err(SetupError::incompatible(format!(
                "Could not find current Accounting DB: {}",
                new_db.display()
            )));
        }

        if !old_db.is_dir() {
            return Err(SetupError::invalid_input(
                "Specified DB does not exist or is not a directory",
            ));
        }

        self.toolkit.import_accounting_db(&derbyrun, old_db, &new_db)
    }

    /// The recorded hostname, without asking or detecting.
    pub fn hostname_no_asking(&self) -> Option<&str> {
        self.config.hostname.as_deref()
    }

    /// The Cumulus bucket VM images are stored in.
    #[allow(clippy::unused_self)]
    pub const fn repo_bucket_no_asking(&self) -> Option<&'static str> {
        Some(CUMULUS_REPO_BUCKET)
    }
}
