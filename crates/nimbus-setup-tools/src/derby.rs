//! Accounting database migration with Derby's `ij` tool.
//!
//! Records are exported from the old database into delimited files in a
//! scratch directory and imported into the current database. `ij` exits 0
//! even when a statement fails, so its output is scanned for `ERROR` lines.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use nimbus_setup_common::error::{Result, SetupError};

use crate::process::{Invocation, ProcessRunner};

/// Accounting tables copied from the old database, in import order.
pub const ACCOUNTING_TABLES: &[&str] = &["DEPLOYMENTS"];

/// Quotes a value as an SQL string literal.
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Builds the `ij` script that moves every accounting table from `old_db`
/// to `new_db`, staging data files in `scratch`.
#[must_use]
pub fn migration_script(old_db: &Path, new_db: &Path, scratch: &Path) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "connect {};", sql_literal(&format!("jdbc:derby:{}", old_db.display())));
    for table in ACCOUNTING_TABLES {
        let data = scratch.join(format!("{}.del", table.to_lowercase()));
        let _ = writeln!(
            script,
            "CALL SYSCS_UTIL.SYSCS_EXPORT_TABLE(null, {}, {}, null, null, null);",
            sql_literal(table),
            sql_literal(&data.display().to_string())
        );
    }
    let _ = writeln!(script, "disconnect;");
    let _ = writeln!(script, "connect {};", sql_literal(&format!("jdbc:derby:{}", new_db.display())));
    for table in ACCOUNTING_TABLES {
        let data = scratch.join(format!("{}.del", table.to_lowercase()));
        let _ = writeln!(
            script,
            "CALL SYSCS_UTIL.SYSCS_IMPORT_TABLE(null, {}, {}, null, null, null, 0);",
            sql_literal(table),
            sql_literal(&data.display().to_string())
        );
    }
    let _ = writeln!(script, "disconnect;");
    let _ = writeln!(script, "exit;");
    script
}

/// Lines of `ij` output that report a failed statement.
fn error_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .map(|line| line.trim().trim_start_matches("ij>").trim_start())
        .filter(|line| line.starts_with("ERROR"))
        .collect()
}

/// Copies the accounting records of `old_db` into `new_db`.
///
/// # Errors
///
/// Returns [`SetupError::Unexpected`] if `ij` fails or reports an error, or an
/// I/O error if the scratch space cannot be prepared.
pub fn update_db(
    runner: &dyn ProcessRunner,
    java: &Path,
    derbyrun: &Path,
    old_db: &Path,
    new_db: &Path,
) -> Result<()> {
    let scratch = tempfile::Builder::new()
        .prefix("nimbus-db-import")
        .tempdir()
        .map_err(|e| SetupError::io(std::env::temp_dir(), e))?;
    let script_path = scratch.path().join("import.sql");
    {
        let mut file = std::fs::File::create(&script_path).map_err(|e| SetupError::io(&script_path, e))?;
        file.write_all(migration_script(old_db, new_db, scratch.path()).as_bytes())
            .map_err(|e| SetupError::io(&script_path, e))?;
    }

    tracing::info!(from = %old_db.display(), to = %new_db.display(), "importing accounting database");
    let output = runner.run(
        &Invocation::new(java)
            .arg("-jar")
            .path_arg(derbyrun)
            .arg("ij")
            .path_arg(&script_path),
    )?;

    let errors = error_lines(&output.stdout);
    if !output.success() || !errors.is_empty() {
        for line in &errors {
            tracing::error!(ij = %line, "database import statement failed");
        }
        return Err(SetupError::unexpected("Failed to update Accounting DB"));
    }
    Ok(())
}
