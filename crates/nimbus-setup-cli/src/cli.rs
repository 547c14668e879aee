//! Command-line definition and argument checks.

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser};
use nimbus_setup_common::error::{Result, SetupError};
use nimbus_setup_core::config::ConfigOverrides;

/// Configure a Nimbus installation: CA, host credentials, keystore and
/// service settings.
#[derive(Parser, Debug)]
#[command(name = "nimbus-configure", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["autoconfig", "import_db", "print_hostname", "print_repobucket"])
        .multiple(false)
))]
pub struct Cli {
    /// Path to base Nimbus directory.
    #[arg(short = 'b', long, value_name = "PATH")]
    pub basedir: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub conf: Option<PathBuf>,

    /// Log debug messages.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Fully qualified hostname of machine.
    #[arg(short = 'H', long, value_name = "HOST")]
    pub hostname: Option<String>,

    /// Unique name to give CA.
    #[arg(short = 'n', long, value_name = "NAME")]
    pub caname: Option<String>,

    /// Path to PEM-encoded host private key.
    #[arg(short = 'k', long, value_name = "PATH")]
    pub hostkey: Option<PathBuf>,

    /// Path to PEM-encoded host certificate.
    #[arg(short = 'C', long, value_name = "PATH")]
    pub hostcert: Option<PathBuf>,

    /// Run the Nimbus autoconfig tool to test VMM communication.
    #[arg(long)]
    pub autoconfig: bool,

    /// Import a Nimbus accounting database from another install.
    #[arg(long, value_name = "PATH")]
    pub import_db: Option<PathBuf>,

    /// Print chosen hostname or error if none chosen.
    #[arg(short = 'Z', long)]
    pub print_hostname: bool,

    /// Print repo bucket for Cumulus.
    #[arg(short = 'R', long)]
    pub print_repobucket: bool,
}

/// What the invocation was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Full configuration run.
    Setup,
    /// Run the autoconfig probe.
    Autoconfig,
    /// Import accounting records from another install.
    ImportDb(&'a Path),
    /// Print the repository bucket.
    PrintRepoBucket,
    /// Print the recorded hostname.
    PrintHostname,
}

impl Cli {
    /// Checks argument combinations and referenced files, returning the base
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidInput`] describing the first problem.
    pub fn validate(&self) -> Result<&Path> {
        let see_help = "see help (-h)";

        let Some(basedir) = self.basedir.as_deref() else {
            return Err(SetupError::invalid_input(format!("--basedir required, {see_help}.")));
        };

        if let Some(conf) = &self.conf {
            if !conf.exists() {
                return Err(SetupError::invalid_input(format!(
                    "--conf file specified does not exist: '{}'",
                    conf.display()
                )));
            }
        }

        match (&self.hostkey, &self.hostcert) {
            (None, None) => {}
            (Some(hostkey), Some(hostcert)) => {
                if !hostkey.exists() {
                    return Err(SetupError::invalid_input(format!(
                        "The specified host key does not exist: {}",
                        hostkey.display()
                    )));
                }
                if !hostcert.exists() {
                    return Err(SetupError::invalid_input(format!(
                        "The specified host cert does not exist: {}",
                        hostcert.display()
                    )));
                }
            }
            _ => {
                return Err(SetupError::invalid_input(
                    "You must specify both --hostcert and --hostkey paths, or neither",
                ));
            }
        }

        Ok(basedir)
    }

    /// The requested action. Defaults to the full setup.
    pub fn action(&self) -> Action<'_> {
        if self.autoconfig {
            Action::Autoconfig
        } else if let Some(path) = &self.import_db {
            Action::ImportDb(path)
        } else if self.print_repobucket {
            Action::PrintRepoBucket
        } else if self.print_hostname {
            Action::PrintHostname
        } else {
            Action::Setup
        }
    }

    /// Values that take precedence over every configuration file.
    ///
    /// Host key and cert paths are made absolute against the current
    /// directory, the same place [`Self::validate`] looked for them.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidInput`] if a path cannot be made absolute.
    pub fn overrides(&self) -> Result<ConfigOverrides> {
        Ok(ConfigOverrides {
            hostname: self.hostname.clone(),
            ca_name: self.caname.clone(),
            hostkey: self.hostkey.as_deref().map(absolute).transpose()?,
            hostcert: self.hostcert.as_deref().map(absolute).transpose()?,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        SetupError::invalid_input(format!("Cannot resolve path '{}': {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nimbus-configure").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_map_to_fields() {
        let cli = parse(&["-b", "/opt/nimbus", "-H", "cloud.example.org", "-n", "SiteCA", "-d"]);
        assert_eq!(cli.basedir.as_deref(), Some(Path::new("/opt/nimbus")));
        assert_eq!(cli.hostname.as_deref(), Some("cloud.example.org"));
        assert_eq!(cli.caname.as_deref(), Some("SiteCA"));
        assert!(cli.debug);
        assert_eq!(cli.action(), Action::Setup);
    }

    #[test]
    fn actions_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["nimbus-configure", "-b", "/x", "--autoconfig", "-Z"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn action_selection() {
        assert_eq!(parse(&["--autoconfig"]).action(), Action::Autoconfig);
        assert_eq!(parse(&["-R"]).action(), Action::PrintRepoBucket);
        assert_eq!(parse(&["--print-hostname"]).action(), Action::PrintHostname);
        assert_eq!(
            parse(&["--import-db", "/old/db"]).action(),
            Action::ImportDb(Path::new("/old/db"))
        );
    }

    #[test]
    fn basedir_is_required() {
        let err = parse(&["-Z"]).validate().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "--basedir required, see help (-h).");
    }

    #[test]
    fn missing_conf_file_is_invalid_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conf = dir.path().join("absent.conf");
        let cli = parse(&["-b", "/opt/nimbus", "-c", conf.to_str().unwrap()]);
        let err = cli.validate().unwrap_err();
        assert!(matches!(err, SetupError::InvalidInput { .. }));
    }

    #[test]
    fn hostkey_without_hostcert_is_invalid_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = dir.path().join("hostkey.pem");
        std::fs::write(&key, "KEY").unwrap();
        let cli = parse(&["-b", "/opt/nimbus", "-k", key.to_str().unwrap()]);
        let err = cli.validate().unwrap_err();
        assert_eq!(err.to_string(), "You must specify both --hostcert and --hostkey paths, or neither");
    }

    #[test]
    fn missing_host_credentials_are_invalid_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = dir.path().join("hostkey.pem");
        let cert = dir.path().join("hostcert.pem");
        std::fs::write(&key, "KEY").unwrap();
        let cli = parse(&[
            "-b",
            "/opt/nimbus",
            "-k",
            key.to_str().unwrap(),
            "-C",
            cert.to_str().unwrap(),
        ]);
        let err = cli.validate().unwrap_err();
        assert!(err.to_string().starts_with("The specified host cert does not exist"));

        std::fs::write(&cert, "CERT").unwrap();
        assert_eq!(cli.validate().unwrap(), Path::new("/opt/nimbus"));
        let overrides = cli.overrides().unwrap();
        assert_eq!(overrides.hostkey, Some(key));
        assert_eq!(overrides.hostcert, Some(cert));
    }

    #[test]
    fn relative_host_credentials_resolve_against_working_directory() {
        let cli = parse(&["-b", "/opt/nimbus", "-k", "keys/hostkey.pem", "-C", "keys/hostcert.pem"]);
        let cwd = std::env::current_dir().unwrap();
        let overrides = cli.overrides().unwrap();
        assert_eq!(overrides.hostkey, Some(cwd.join("keys/hostkey.pem")));
        assert_eq!(overrides.hostcert, Some(cwd.join("keys/hostcert.pem")));
        assert!(overrides.hostkey.unwrap().is_absolute());
        assert_eq!(cli.overrides().unwrap().hostname, None);
    }
}
