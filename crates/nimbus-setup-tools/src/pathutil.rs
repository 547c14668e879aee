//! Path helpers shared by the setup steps.

use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use nimbus_setup_common::error::{Result, SetupError};

/// Returns `path` unchanged if absolute, otherwise joined onto `base`.
#[must_use]
pub fn resolve(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }
    base.join(path)
}

/// Fails unless `path` is an existing directory. `name` describes it in the
/// error message.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if the directory is missing.
#[track_caller]
pub fn ensure_dir_exists(path: &Path, name: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    Err(SetupError::incompatible(format!(
        "{name} directory does not exist: {}",
        path.display()
    )))
}

/// Fails unless `path` is an existing file. `name` describes it in the error
/// message.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if the file is missing.
#[track_caller]
pub fn ensure_file_exists(path: &Path, name: &str) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(SetupError::incompatible(format!(
        "{name} file does not exist: {}",
        path.display()
    )))
}

/// Restricts `path` to owner read/write (mode 0600).
///
/// # Errors
///
/// Returns [`SetupError::Io`] if the permissions cannot be changed.
pub fn make_private(path: &Path) -> Result<()> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| SetupError::io(path, e))?;
    tracing::debug!(path = %path.display(), "restricted to owner read/write");
    Ok(())
}

/// Returns whether `path` is a regular file with any execute bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Creates the parent directory of `path` if it is missing.
///
/// # Errors
///
/// Returns [`SetupError::Io`] if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SetupError::io(parent, e))?;
    }
    Ok(())
}

/// Lexically normalizes `path`, folding `.` and `..` components.
fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    let _ = parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts
}

/// Expresses `path` relative to the directory `start` without touching the
/// filesystem. Both should be absolute, or both relative to the same place.
#[must_use]
pub fn relpath(path: &Path, start: &Path) -> PathBuf {
    let target = normalize(path);
    let base = normalize(start);
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Generates a random UUID string, used as a default CA name.
#[must_use]
pub fn uuidgen() -> String {
    uuid::Uuid::new_v4().to_string()
}
