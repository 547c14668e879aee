//! One invocation: load settings, validate the installation, dispatch the
//! requested action, and map failures to exit codes.

use nimbus_setup_common::constants::{CONFIG_STATE_PATH, exit};
use nimbus_setup_common::error::SetupError;
use nimbus_setup_core::actions::AutoconfigOutcome;
use nimbus_setup_core::config::SetupConfig;
use nimbus_setup_core::paths::ResolvedPaths;
use nimbus_setup_core::setup::NimbusSetup;
use nimbus_setup_tools::process::SystemRunner;
use nimbus_setup_tools::toolkit::JavaToolkit;

use crate::cli::{Action, Cli};

/// Runs the invocation described by `cli` and returns its exit code.
///
/// # Errors
///
/// Returns the first failure; [`report`] turns it into an exit code.
#[allow(clippy::print_stderr)]
pub fn execute(cli: &Cli) -> anyhow::Result<u8> {
    let basedir = cli.validate()?;
    let _span = tracing::info_span!("nimbus_configure", basedir = %basedir.display()).entered();
    tracing::debug!(basedir = %basedir.display(), "base directory");

    let state_path = basedir.join(CONFIG_STATE_PATH);
    let mut layers = vec![state_path.clone()];
    layers.extend(cli.conf.clone());
    let mut config = SetupConfig::load_layered(&layers)?;
    config.fold_overrides(&cli.overrides()?);

    let paths = ResolvedPaths::resolve(basedir, &config);
    let runner = SystemRunner;
    let toolkit = JavaToolkit::new(paths.webdir, paths.gtdir, Box::new(SystemRunner));
    let mut setup = NimbusSetup::new(basedir, config, &toolkit, &runner);
    setup.validate_environment()?;

    match cli.action() {
        Action::Autoconfig => {
            return Ok(match setup.autoconfig()? {
                AutoconfigOutcome::Ran(_) => exit::OK,
                AutoconfigOutcome::Missing(script) => {
                    eprintln!(
                        "\nERROR: autoconfig script not found or not executable: {}",
                        script.display()
                    );
                    exit::INVALID_INPUT
                }
            });
        }
        Action::ImportDb(old_db) => {
            setup.import_db(old_db)?;
            return Ok(exit::OK);
        }
        Action::PrintRepoBucket => return Ok(print_value(setup.repo_bucket_no_asking())),
        Action::PrintHostname => return Ok(print_value(setup.hostname_no_asking())),
        Action::Setup => setup.perform_setup_and_save(&state_path)?,
    }

    Ok(exit::SETUP_COMPLETE)
}

/// Prints a stored value, or reports that it is unset.
#[allow(clippy::print_stdout)]
fn print_value(value: Option<&str>) -> u8 {
    match value {
        Some(value) => {
            println!("{value}");
            exit::OK
        }
        None => exit::INVALID_INPUT,
    }
}

/// Prints `err` the way its kind calls for and returns the exit code.
#[allow(clippy::print_stderr)]
pub fn report(err: &anyhow::Error, debug: bool) -> u8 {
    let Some(setup_err) = err.downcast_ref::<SetupError>() else {
        return report_uncaught(err);
    };

    match setup_err {
        SetupError::InvalidInput { .. } => eprintln!("\nProblem with input: {setup_err}"),
        SetupError::InvalidConfig { .. } => eprintln!("\nProblem with configuration: {setup_err}"),
        SetupError::IncompatibleEnvironment { location, .. } => {
            eprintln!("\nCannot validate environment: {setup_err}");
            if debug {
                eprintln!("\n---------- raised at ----------");
                eprintln!("{location}");
                eprintln!("-------------------------------");
            }
        }
        SetupError::UnsupportedRuntime { .. } => eprintln!("\nUnsupported runtime: {setup_err}"),
        SetupError::Unexpected { .. } | SetupError::Io { .. } | SetupError::CommandFailed { .. } => {
            return report_uncaught(err);
        }
    }
    setup_err.exit_code()
}

#[allow(clippy::print_stderr)]
fn report_uncaught(err: &anyhow::Error) -> u8 {
    eprintln!("\n==> Uncaught problem, please report all following output:\n  {err:?}");
    exit::INTERNAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_exit_codes() {
        let cases = [
            (SetupError::invalid_input("x"), exit::INVALID_INPUT),
            (SetupError::invalid_config("x"), exit::INVALID_CONFIG),
            (SetupError::incompatible("x"), exit::INCOMPATIBLE_ENVIRONMENT),
            (
                SetupError::UnsupportedRuntime {
                    found: "1.4.2".into(),
                    required: "1.5",
                },
                exit::UNSUPPORTED_RUNTIME,
            ),
            (SetupError::unexpected("x"), exit::INTERNAL_ERROR),
        ];
        for (err, code) in cases {
            assert_eq!(report(&anyhow::Error::new(err), true), code);
        }
    }

    #[test]
    fn foreign_errors_are_uncaught() {
        assert_eq!(report(&anyhow::anyhow!("boom"), false), exit::INTERNAL_ERROR);
    }

    #[test]
    fn unset_value_prints_nothing_and_fails() {
        assert_eq!(print_value(None), exit::INVALID_INPUT);
        assert_eq!(print_value(Some("Repo")), exit::OK);
    }

    #[test]
    fn missing_basedir_fails_before_loading() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["nimbus-configure", "-Z"]).expect("parse");
        let err = execute(&cli).unwrap_err();
        assert_eq!(report(&err, false), exit::INVALID_INPUT);
    }

    #[test]
    fn missing_install_is_incompatible() {
        use clap::Parser;

        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().to_str().unwrap().to_owned();
        let cli = Cli::try_parse_from(["nimbus-configure", "-b", base.as_str(), "-Z"]).expect("parse");
        let err = execute(&cli).unwrap_err();
        assert_eq!(report(&err, false), exit::INCOMPATIBLE_ENVIRONMENT);
        assert!(!dir.path().join(CONFIG_STATE_PATH).exists());
    }
}
