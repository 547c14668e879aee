//! Blocking execution of external programs.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nimbus_setup_common::error::{Result, SetupError};

/// A program invocation: what to run, with which arguments, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program path or name looked up on `PATH`.
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory, inherited when `None`.
    pub current_dir: Option<PathBuf>,
    /// Let the child use the terminal instead of capturing its output.
    pub inherit_stdio: bool,
}

impl Invocation {
    /// Starts an invocation of `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            inherit_stdio: false,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a path argument.
    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Runs the child in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Connects the child to this process's stdin, stdout and stderr.
    #[must_use]
    pub const fn interactive(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    /// Program name for log lines and error messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Output from a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output. Empty when stdio was inherited.
    pub stdout: String,
    /// Standard error. Empty when stdio was inherited.
    pub stderr: String,
    /// Exit code, or -1 if the child was killed by a signal.
    pub exit_code: i32,
}

impl ExecOutput {
    /// Returns whether the program exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Passes a successful output through and turns any other into
    /// [`SetupError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the exit code is nonzero.
    pub fn success_or(self, program: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        Err(SetupError::CommandFailed {
            program: program.to_owned(),
            exit_code: self.exit_code,
            stderr: self.stderr.trim().to_owned(),
        })
    }
}

/// Something that can run an [`Invocation`] to completion.
pub trait ProcessRunner {
    /// Runs the invocation and waits for it to exit.
    ///
    /// A nonzero exit is not an error at this level; callers decide what an
    /// exit code means.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started.
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput>;
}

/// Runs programs with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput> {
        tracing::debug!(program = %invocation.display_name(), args = ?invocation.args, "running");

        let mut cmd = Command::new(&invocation.program);
        let _ = cmd.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            let _ = cmd.current_dir(dir);
        }

        if invocation.inherit_stdio {
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|e| SetupError::io(&invocation.program, e))?;
            return Ok(ExecOutput {
                exit_code: status.code().unwrap_or(-1),
                ..ExecOutput::default()
            });
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SetupError::io(&invocation.program, e))?;
        let result = ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };
        tracing::debug!(program = %invocation.display_name(), exit_code = result.exit_code, "finished");
        Ok(result)
    }
}
