//! Files generated or rewritten by a setup run.
//!
//! Rendering and writing are split so the exact contents can be checked
//! without a filesystem. Writers create missing parent directories.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use nimbus_setup_common::constants::{
    CUMULUS_AUTHZ_DB, CUMULUS_INI_FILE, CUMULUS_PROPS_FILE, CUMULUS_REPO_BUCKET, CUMULUS_REPO_DIR,
    CUMULUS_REPO_PREFIX, DB_PROPS_FILE, WEB_CONF_FILE, WEB_CONF_SECTION,
};
use nimbus_setup_common::error::{Result, SetupError};
use nimbus_setup_ini::IniDocument;
use nimbus_setup_tools::pathutil;

/// Local time in the `%c` format used by generated headers.
#[must_use]
pub fn timestamp() -> String {
    chrono::Local::now().format("%c").to_string()
}

/// Writes `text` to `path`, replacing any previous contents.
///
/// # Errors
///
/// Returns [`SetupError::Io`] if the file or its parent cannot be created.
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    pathutil::ensure_parent_dir(path)?;
    let mut file = std::fs::File::create(path).map_err(|e| SetupError::io(path, e))?;
    file.write_all(text.as_bytes()).map_err(|e| SetupError::io(path, e))?;
    tracing::debug!(path = %path.display(), "wrote");
    Ok(())
}

/// Shell environment exporting the install locations.
#[must_use]
pub fn env_file_body(time: &str, basedir: &Path, gtdir: &Path, trusted_certs: &Path) -> String {
    format!(
        "
# Autogenerated at {time}
#
# This file contains environment variables which are necessary to use some of
# the Nimbus internal tools directly

NIMBUS_HOME={}
export NIMBUS_HOME

GLOBUS_LOCATION={}
export GLOBUS_LOCATION

X509_CERT_DIR={}
export X509_CERT_DIR
",
        basedir.display(),
        gtdir.display(),
        trusted_certs.display()
    )
}

fn properties_header(time: &str) -> String {
    format!("#Autogenerated by nimbus-configure\n#{time}\n")
}

/// Persistence properties read by the workspace service's database tooling.
#[must_use]
pub fn db_props_body(time: &str, gtdir: &Path) -> String {
    let under = |rel: &str| gtdir.join(rel).display().to_string();
    let mut body = properties_header(time);
    let lines = [
        ("workspace.dbdir.prop", under("var/nimbus")),
        ("workspace.sqldir.prop", under("share/nimbus/lib")),
        ("workspace.notifdir.prop", under("share/nimbus/lib")),
        ("derby.system.home.prop", under("var")),
        ("derby.relative.dir.prop", "nimbus".to_owned()),
        ("derby.classpath.dir.prop", under("lib")),
        (
            "pwGen.path.prop",
            under("etc/nimbus/workspace-service/other/shared-secret-suggestion.py"),
        ),
    ];
    for (key, value) in lines {
        let _ = writeln!(body, "{key}={value}");
    }
    body
}

/// Cumulus settings read by the workspace service.
#[must_use]
pub fn cumulus_props_body(time: &str, basedir: &Path, hostname: &str) -> String {
    let mut body = properties_header(time);
    body.push_str("\n# Generally these settings are auto-generated by nimbus-configure.\n\n");
    let _ = writeln!(body, "cumulus.authz.db={}", basedir.join(CUMULUS_AUTHZ_DB).display());
    let _ = writeln!(body, "cumulus.repo.dir={}", basedir.join(CUMULUS_REPO_DIR).display());
    let _ = writeln!(body, "cumulus.host={hostname}");
    let _ = writeln!(body, "cumulus.repo.bucket={CUMULUS_REPO_BUCKET}");
    let _ = writeln!(body, "cumulus.repo.prefix={CUMULUS_REPO_PREFIX}");
    body
}

/// Writes the environment file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_env_file(path: &Path, basedir: &Path, gtdir: &Path, trusted_certs: &Path) -> Result<()> {
    write_text(path, &env_file_body(&timestamp(), basedir, gtdir, trusted_certs))
}

/// Writes the database persistence properties under `gtdir`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_db_props(gtdir: &Path) -> Result<()> {
    write_text(&gtdir.join(DB_PROPS_FILE), &db_props_body(&timestamp(), gtdir))
}

/// Writes the Cumulus properties under `gtdir`.
///
/// # Errors
///
/// Returns [`SetupError::Unexpected`] if no hostname has been settled yet, or
/// an I/O error if the file cannot be written.
pub fn write_cumulus_props(basedir: &Path, gtdir: &Path, hostname: Option<&str>) -> Result<()> {
    let hostname = hostname.ok_or_else(|| SetupError::unexpected("hostname should have been determined already"))?;
    write_text(
        &gtdir.join(CUMULUS_PROPS_FILE),
        &cumulus_props_body(&timestamp(), basedir, hostname),
    )
}

/// Points the Cumulus INI at the host credentials and hostname. The file must
/// already exist with `[https]` and `[cb]` sections.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if the file cannot be read,
/// [`SetupError::InvalidConfig`] if it does not parse or lacks a section, or
/// an I/O error if it cannot be written back.
pub fn update_cumulus_ini(basedir: &Path, hostkey: &Path, hostcert: &Path, hostname: &str) -> Result<()> {
    let path = basedir.join(CUMULUS_INI_FILE);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Err(SetupError::incompatible(format!(
            "Could not open {} for parsing",
            path.display()
        )));
    };
    let mut doc = IniDocument::parse(&text)?;
    doc.set("https", "enabled", "False")?;
    doc.set("https", "key", &hostkey.display().to_string())?;
    doc.set("https", "cert", &hostcert.display().to_string())?;
    doc.set("cb", "hostname", hostname)?;
    doc.save(&path)?;
    tracing::debug!(path = %path.display(), "updated cumulus settings");
    Ok(())
}

/// Points the web application's SSL settings at the host credentials and CA,
/// each expressed relative to `webdir`.
///
/// # Errors
///
/// Returns [`SetupError::IncompatibleEnvironment`] if the web config is
/// missing, [`SetupError::InvalidConfig`] if it is malformed, or an I/O error
/// if it cannot be written back.
pub fn update_web_conf(webdir: &Path, hostcert: &Path, hostkey: &Path, cadir: &Path) -> Result<()> {
    let path = webdir.join(WEB_CONF_FILE);
    if !path.is_file() {
        return Err(SetupError::incompatible(format!(
            "nimbus web config does not exist: {}",
            path.display()
        )));
    }
    let mut doc = IniDocument::load(&path)?;
    let rel = |p: &Path| pathutil::relpath(p, webdir).display().to_string();
    doc.set(WEB_CONF_SECTION, "ssl.cert", &rel(hostcert))?;
    doc.set(WEB_CONF_SECTION, "ssl.key", &rel(hostkey))?;
    doc.set(WEB_CONF_SECTION, "ca.dir", &rel(cadir))?;
    doc.save(&path)?;
    tracing::debug!(path = %path.display(), "updated web config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_file_exports_three_variables() {
        let body = env_file_body(
            "Mon Jan  1 00:00:00 2024",
            Path::new("/opt/nimbus"),
            Path::new("/opt/nimbus/services/"),
            Path::new("/opt/nimbus/var/ca/trusted-certs"),
        );
        assert!(body.contains("# Autogenerated at Mon Jan  1 00:00:00 2024\n"));
        assert!(body.contains("NIMBUS_HOME=/opt/nimbus\nexport NIMBUS_HOME\n"));
        assert!(body.contains("GLOBUS_LOCATION=/opt/nimbus/services/\n"));
        assert!(body.contains("X509_CERT_DIR=/opt/nimbus/var/ca/trusted-certs\nexport X509_CERT_DIR\n"));
    }

    #[test]
    fn db_props_has_seven_settings() {
        let body = db_props_body("now", Path::new("/gt"));
        let settings: Vec<&str> = body.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(
            settings,
            vec![
                "workspace.dbdir.prop=/gt/var/nimbus",
                "workspace.sqldir.prop=/gt/share/nimbus/lib",
                "workspace.notifdir.prop=/gt/share/nimbus/lib",
                "derby.system.home.prop=/gt/var",
                "derby.relative.dir.prop=nimbus",
                "derby.classpath.dir.prop=/gt/lib",
                "pwGen.path.prop=/gt/etc/nimbus/workspace-service/other/shared-secret-suggestion.py",
            ]
        );
    }

    #[test]
    fn cumulus_props_name_host_and_bucket() {
        let body = cumulus_props_body("now", Path::new("/opt/nimbus"), "cloud.example.org");
        assert!(body.starts_with("#Autogenerated by nimbus-configure\n#now\n"));
        assert!(body.contains("cumulus.authz.db=/opt/nimbus/cumulus/etc/authz.db\n"));
        assert!(body.contains("cumulus.repo.dir=/opt/nimbus/cumulus/posixdata\n"));
        assert!(body.contains("cumulus.host=cloud.example.org\n"));
        assert!(body.ends_with("cumulus.repo.bucket=Repo\ncumulus.repo.prefix=VMS\n"));
    }

    #[test]
    fn cumulus_props_need_hostname() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = write_cumulus_props(dir.path(), dir.path(), None).unwrap_err();
        assert!(matches!(err, SetupError::Unexpected { .. }));
        assert!(!dir.path().join(CUMULUS_PROPS_FILE).exists());
    }

    #[test]
    fn cumulus_ini_keeps_other_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ini = dir.path().join(CUMULUS_INI_FILE);
        write_text(
            &ini,
            "[https]\n# managed by nimbus-configure\nenabled: True\n\n[cb]\nport: 8888\n",
        )
        .unwrap();

        update_cumulus_ini(
            dir.path(),
            Path::new("/opt/nimbus/var/hostkey.pem"),
            Path::new("/opt/nimbus/var/hostcert.pem"),
            "cloud.example.org",
        )
        .unwrap();

        let doc = IniDocument::load(&ini).unwrap();
        assert_eq!(doc.get("https", "enabled"), Some("False"));
        assert_eq!(doc.get("https", "key"), Some("/opt/nimbus/var/hostkey.pem"));
        assert_eq!(doc.get("https", "cert"), Some("/opt/nimbus/var/hostcert.pem"));
        assert_eq!(doc.get("cb", "hostname"), Some("cloud.example.org"));
        assert_eq!(doc.get("cb", "port"), Some("8888"));
        assert!(std::fs::read_to_string(&ini).unwrap().contains("# managed by nimbus-configure"));
    }

    #[test]
    fn missing_cumulus_ini_is_incompatible() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = update_cumulus_ini(dir.path(), Path::new("k"), Path::new("c"), "h").unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("Could not open "));
    }

    #[test]
    fn cumulus_ini_without_cb_section_is_invalid_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_text(&dir.path().join(CUMULUS_INI_FILE), "[https]\nenabled: True\n").unwrap();
        let err = update_cumulus_ini(dir.path(), Path::new("k"), Path::new("c"), "h").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn web_conf_paths_are_relative_to_webdir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path();
        let webdir = base.join("web");
        write_text(&webdir.join(WEB_CONF_FILE), "[nimbusweb]\nssl.cert: old\nport: 1443\n").unwrap();

        update_web_conf(
            &webdir,
            &base.join("var/hostcert.pem"),
            &base.join("var/hostkey.pem"),
            &base.join("var/ca"),
        )
        .unwrap();

        let doc = IniDocument::load(&webdir.join(WEB_CONF_FILE)).unwrap();
        assert_eq!(doc.get("nimbusweb", "ssl.cert"), Some("../var/hostcert.pem"));
        assert_eq!(doc.get("nimbusweb", "ssl.key"), Some("../var/hostkey.pem"));
        assert_eq!(doc.get("nimbusweb", "ca.dir"), Some("../var/ca"));
        assert_eq!(doc.get("nimbusweb", "port"), Some("1443"));
    }

    #[test]
    fn missing_web_conf_is_incompatible() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = update_web_conf(dir.path(), Path::new("/c"), Path::new("/k"), Path::new("/ca")).unwrap_err();
        assert!(err.to_string().starts_with("nimbus web config does not exist"));
    }
}
