//! Unified error types for the nimbus-configure workspace.
//!
//! Every failure a setup run can hit falls into one of a handful of kinds.
//! The kind decides the process exit code and the message prefix the CLI
//! prints; see [`SetupError::exit_code`].

use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

use crate::constants::exit;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A command-line argument is missing or unusable.
    #[error("{message}")]
    InvalidInput {
        /// Description of the bad input.
        message: String,
    },

    /// A required configuration value is missing or unusable.
    #[error("{message}")]
    InvalidConfig {
        /// Description of the configuration problem.
        message: String,
    },

    /// A filesystem or tooling prerequisite is not met.
    #[error("{message}")]
    IncompatibleEnvironment {
        /// Description of the unmet prerequisite.
        message: String,
        /// Where the problem was detected, shown in debug mode.
        location: &'static Location<'static>,
    },

    /// The Java runtime is present but too old.
    #[error("Java {found} found, {required} or later is required")]
    UnsupportedRuntime {
        /// Version string reported by the runtime.
        found: String,
        /// Minimum supported version.
        required: &'static str,
    },

    /// An internal invariant was violated.
    #[error("{message}")]
    Unexpected {
        /// Description of the violated invariant.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("{program} exited with status {exit_code}: {stderr}")]
    CommandFailed {
        /// Program that was run.
        program: String,
        /// Exit status, or -1 if it was killed by a signal.
        exit_code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

impl SetupError {
    /// Builds an [`SetupError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Builds an [`SetupError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Builds an [`SetupError::IncompatibleEnvironment`] tagged with the
    /// caller's source location.
    #[track_caller]
    pub fn incompatible(message: impl Into<String>) -> Self {
        Self::IncompatibleEnvironment {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Builds an [`SetupError::Unexpected`].
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Builds an [`SetupError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this kind of failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput { .. } => exit::INVALID_INPUT,
            Self::InvalidConfig { .. } => exit::INVALID_CONFIG,
            Self::IncompatibleEnvironment { .. } => exit::INCOMPATIBLE_ENVIRONMENT,
            Self::UnsupportedRuntime { .. } => exit::UNSUPPORTED_RUNTIME,
            Self::Unexpected { .. } | Self::Io { .. } | Self::CommandFailed { .. } => {
                exit::INTERNAL_ERROR
            }
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SetupError>;
