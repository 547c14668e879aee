//! Java runtime discovery and version check.
//!
//! The CA, keystore and container tools are all Java programs, so a usable
//! `java` has to be found before any of them can run.

use std::fmt;
use std::path::{Path, PathBuf};

use nimbus_setup_common::error::{Result, SetupError};

use crate::pathutil;
use crate::process::{Invocation, ProcessRunner};

/// Oldest Java feature release the tools run on (Java 1.5).
pub const MINIMUM_FEATURE_RELEASE: u32 = 5;

/// Human-readable form of [`MINIMUM_FEATURE_RELEASE`].
pub const MINIMUM_VERSION: &str = "1.5";

/// A Java version as reported by `java -version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaVersion {
    /// The quoted version string, e.g. `1.8.0_292` or `17.0.2`.
    pub raw: String,
    /// Feature release: 8 for `1.8.0_292`, 17 for `17.0.2`.
    pub feature: u32,
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Extracts the version from `java -version` output.
///
/// Handles both the legacy `1.x` scheme and the modern `N.x.y` scheme.
#[must_use]
pub fn parse_version(output: &str) -> Option<JavaVersion> {
    let start = output.find("version \"")? + "version \"".len();
    let len = output[start..].find('"')?;
    let raw = &output[start..start + len];

    let mut numbers = raw
        .split(['.', '_', '-', '+'])
        .map(str::parse::<u32>);
    let major = numbers.next()?.ok()?;
    let feature = if major == 1 {
        numbers.next()?.ok()?
    } else {
        major
    };
    Some(JavaVersion {
        raw: raw.to_owned(),
        feature,
    })
}

/// Finds the `java` executable, preferring `$JAVA_HOME/bin/java`.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if no `java` can be found.
pub fn locate(java_home: Option<&Path>) -> Result<PathBuf> {
    if let Some(home) = java_home {
        let candidate = home.join("bin").join("java");
        if pathutil::is_executable(&candidate) {
            return Ok(candidate);
        }
        tracing::warn!(java_home = %home.display(), "JAVA_HOME has no usable bin/java, searching PATH");
    }
    which::which("java").map_err(|_| {
        SetupError::incompatible(format!(
            "Cannot find a Java executable. Install Java {MINIMUM_VERSION} or later, \
             or set JAVA_HOME."
        ))
    })
}

/// Runs `java -version` and checks the result against the minimum.
///
/// An unrecognizable version string is logged and accepted.
///
/// # Errors
///
/// Returns [`SetupError::UnsupportedRuntime`] if the runtime is too old, or
/// [`SetupError::IncompatibleEnvironment`] if `java -version` fails.
pub fn check(runner: &dyn ProcessRunner, java: &Path) -> Result<Option<JavaVersion>> {
    let output = runner.run(&Invocation::new(java).arg("-version"))?;
    if !output.success() {
        return Err(SetupError::incompatible(format!(
            "'{} -version' failed: {}",
            java.display(),
            output.stderr.trim()
        )));
    }

    // Older runtimes print the banner on stderr, some newer ones on stdout.
    let banner = format!("{}\n{}", output.stderr, output.stdout);
    let Some(version) = parse_version(&banner) else {
        tracing::warn!(java = %java.display(), "could not determine Java version, continuing");
        return Ok(None);
    };

    if version.feature < MINIMUM_FEATURE_RELEASE {
        return Err(SetupError::UnsupportedRuntime {
            found: version.raw,
            required: MINIMUM_VERSION,
        });
    }
    tracing::debug!(java = %java.display(), version = %version, "found Java");
    Ok(Some(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExecOutput;

    struct Banner(&'static str, i32);

    impl ProcessRunner for Banner {
        fn run(&self, _invocation: &Invocation) -> Result<ExecOutput> {
            Ok(ExecOutput {
                stdout: String::new(),
                stderr: self.0.to_owned(),
                exit_code: self.1,
            })
        }
    }

    #[test]
    fn parses_legacy_scheme() {
        let v = parse_version("java version \"1.8.0_292\"\nJava(TM) SE Runtime Environment").unwrap();
        assert_eq!(v.feature, 8);
        assert_eq!(v.raw, "1.8.0_292");
    }

    #[test]
    fn parses_modern_scheme() {
        let v = parse_version("openjdk version \"17.0.2\" 2022-01-18").unwrap();
        assert_eq!(v.feature, 17);
        let v = parse_version("openjdk version \"21\" 2023-09-19").unwrap();
        assert_eq!(v.feature, 21);
        let v = parse_version("openjdk version \"11-ea\"").unwrap();
        assert_eq!(v.feature, 11);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_version("no version here").is_none());
        assert!(parse_version("version \"abc\"").is_none());
    }

    #[test]
    fn old_runtime_is_unsupported() {
        let err = check(&Banner("java version \"1.4.2_19\"", 0), Path::new("java")).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("1.4.2_19"));
    }

    #[test]
    fn current_runtime_passes() {
        let v = check(&Banner("openjdk version \"11.0.20\"", 0), Path::new("java")).unwrap();
        assert_eq!(v.map(|v| v.feature), Some(11));
    }

    #[test]
    fn unknown_banner_is_accepted() {
        assert_eq!(check(&Banner("gij (GNU libgcj)", 0), Path::new("java")).unwrap(), None);
    }

    #[test]
    fn failing_java_is_incompatible() {
        let err = check(&Banner("Error occurred", 1), Path::new("java")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn java_home_without_binary_falls_back_to_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        match locate(Some(dir.path())) {
            Ok(found) => assert!(!found.starts_with(dir.path())),
            Err(err) => assert_eq!(err.exit_code(), 3),
        }
    }
}
