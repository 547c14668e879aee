//! Setup configuration: typed settings, layered loading and the state file.
//!
//! Settings come from three layers, later ones winning key by key: the
//! built-in [`DEFAULT_CONFIG`], the state file left by the previous run, and
//! an optional file named on the command line. Command-line values are folded
//! in on top with [`SetupConfig::fold_overrides`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use nimbus_setup_common::constants::CONFIG_SECTION;
use nimbus_setup_common::error::{Result, SetupError};
use nimbus_setup_ini::IniDocument;

/// Built-in defaults, the lowest configuration layer.
pub const DEFAULT_CONFIG: &str = "
[nimbussetup]

# relative to base directory
hostcert: var/hostcert.pem
hostkey: var/hostkey.pem
ca.dir: var/ca
ca.trustedcerts.dir: var/ca/trusted-certs

gridmap: services/etc/nimbus/nimbus-grid-mapfile

keystore: var/keystore.jks
keystore.pass: changeit

services.enabled: True
services.wait: 10
web.enabled: False
cumulus.enabled: True
";

const KEY_HOSTNAME: &str = "hostname";
const KEY_CA_NAME: &str = "ca.name";
const KEY_HOSTCERT: &str = "hostcert";
const KEY_HOSTKEY: &str = "hostkey";
const KEY_CA_DIR: &str = "ca.dir";
const KEY_CA_TRUSTEDCERTS_DIR: &str = "ca.trustedcerts.dir";
const KEY_GRIDMAP: &str = "gridmap";
const KEY_KEYSTORE: &str = "keystore";
const KEY_KEYSTORE_PASS: &str = "keystore.pass";
const KEY_SERVICES_ENABLED: &str = "services.enabled";
const KEY_SERVICES_WAIT: &str = "services.wait";
const KEY_WEB_ENABLED: &str = "web.enabled";
const KEY_CUMULUS_ENABLED: &str = "cumulus.enabled";

/// Settings of the `nimbussetup` section.
///
/// Relative paths are relative to the installation's base directory; see
/// [`crate::paths::ResolvedPaths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupConfig {
    /// Fully qualified hostname of this machine.
    pub hostname: Option<String>,
    /// Name of the internal CA.
    pub ca_name: Option<String>,
    /// Host certificate (PEM).
    pub hostcert: Option<PathBuf>,
    /// Host private key (PEM).
    pub hostkey: Option<PathBuf>,
    /// Internal CA directory.
    pub ca_dir: Option<PathBuf>,
    /// Trusted CA certificates directory.
    pub ca_trustedcerts_dir: Option<PathBuf>,
    /// Container grid-mapfile.
    pub gridmap: Option<PathBuf>,
    /// Java keystore for the host credentials.
    pub keystore: Option<PathBuf>,
    /// Keystore password.
    pub keystore_pass: Option<String>,
    /// Whether the services start after configuration.
    pub services_enabled: bool,
    /// Seconds to wait for the services to start.
    pub services_wait: u32,
    /// Whether the web application is in use.
    pub web_enabled: bool,
    /// Whether Cumulus is in use.
    pub cumulus_enabled: bool,
    /// Keys this program does not interpret, kept so they survive a save.
    pub extra: BTreeMap<String, String>,
}

/// Values given on the command line that take precedence over every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--hostname`.
    pub hostname: Option<String>,
    /// `--caname`.
    pub ca_name: Option<String>,
    /// `--hostkey`.
    pub hostkey: Option<PathBuf>,
    /// `--hostcert`.
    pub hostcert: Option<PathBuf>,
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(SetupError::invalid_config(format!(
            "'{key}' must be a boolean (True/False), found '{value}'"
        ))),
    }
}

const fn bool_str(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Takes `key` out of `entries`, treating an empty value as absent.
fn take(entries: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    entries.remove(key).filter(|v| !v.is_empty())
}

fn take_bool(entries: &mut BTreeMap<String, String>, key: &str, default: bool) -> Result<bool> {
    take(entries, key).map_or(Ok(default), |v| parse_bool(key, &v))
}

impl SetupConfig {
    /// Builds the configuration from [`DEFAULT_CONFIG`] and then each of
    /// `paths` in order. Paths that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if a file does not parse or a
    /// value has the wrong type, or [`SetupError::Io`] if an existing file
    /// cannot be read.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let defaults = IniDocument::parse(DEFAULT_CONFIG)?;
        let mut merged = section_entries(&defaults);

        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "no config file, skipping");
                continue;
            }
            let doc = IniDocument::load(path)?;
            tracing::debug!(path = %path.display(), "read config from");
            merged.extend(section_entries(&doc));
        }

        Self::from_entries(merged)
    }

    /// Builds the configuration from raw `nimbussetup` entries.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if a boolean or numeric key has
    /// an unusable value.
    pub fn from_entries(mut entries: BTreeMap<String, String>) -> Result<Self> {
        let services_wait = match take(&mut entries, KEY_SERVICES_WAIT) {
            Some(v) => v.parse().map_err(|_| {
                SetupError::invalid_config(format!(
                    "'{KEY_SERVICES_WAIT}' must be a whole number of seconds, found '{v}'"
                ))
            })?,
            None => 10,
        };

        Ok(Self {
            hostname: take(&mut entries, KEY_HOSTNAME),
            ca_name: take(&mut entries, KEY_CA_NAME),
            hostcert: take(&mut entries, KEY_HOSTCERT).map(PathBuf::from),
            hostkey: take(&mut entries, KEY_HOSTKEY).map(PathBuf::from),
            ca_dir: take(&mut entries, KEY_CA_DIR).map(PathBuf::from),
            ca_trustedcerts_dir: take(&mut entries, KEY_CA_TRUSTEDCERTS_DIR).map(PathBuf::from),
            gridmap: take(&mut entries, KEY_GRIDMAP).map(PathBuf::from),
            keystore: take(&mut entries, KEY_KEYSTORE).map(PathBuf::from),
            keystore_pass: take(&mut entries, KEY_KEYSTORE_PASS),
            services_enabled: take_bool(&mut entries, KEY_SERVICES_ENABLED, true)?,
            services_wait,
            web_enabled: take_bool(&mut entries, KEY_WEB_ENABLED, false)?,
            cumulus_enabled: take_bool(&mut entries, KEY_CUMULUS_ENABLED, true)?,
            extra: entries,
        })
    }

    /// Applies command-line values over whatever the files said.
    pub fn fold_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(hostname) = &overrides.hostname {
            self.hostname = Some(hostname.clone());
        }
        if let Some(ca_name) = &overrides.ca_name {
            self.ca_name = Some(ca_name.clone());
        }
        if let Some(hostkey) = &overrides.hostkey {
            self.hostkey = Some(hostkey.clone());
        }
        if let Some(hostcert) = &overrides.hostcert {
            self.hostcert = Some(hostcert.clone());
        }
    }

    /// Renders the settings as an INI document with a single section.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidConfig`] if an entry cannot be placed in
    /// the section.
    pub fn to_document(&self) -> Result<IniDocument> {
        let mut entries: Vec<(&str, String)> = Vec::new();
        let mut push_path = |key, value: &Option<PathBuf>| {
            if let Some(path) = value {
                entries.push((key, path.display().to_string()));
            }
        };
        push_path(KEY_HOSTCERT, &self.hostcert);
        push_path(KEY_HOSTKEY, &self.hostkey);
        push_path(KEY_CA_DIR, &self.ca_dir);
        push_path(KEY_CA_TRUSTEDCERTS_DIR, &self.ca_trustedcerts_dir);
        push_path(KEY_GRIDMAP, &self.gridmap);
        push_path(KEY_KEYSTORE, &self.keystore);

        let optional = [
            (KEY_KEYSTORE_PASS, &self.keystore_pass),
            (KEY_HOSTNAME, &self.hostname),
            (KEY_CA_NAME, &self.ca_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                entries.push((key, value.clone()));
            }
        }
        entries.push((KEY_SERVICES_ENABLED, bool_str(self.services_enabled).to_owned()));
        entries.push((KEY_SERVICES_WAIT, self.services_wait.to_string()));
        entries.push((KEY_WEB_ENABLED, bool_str(self.web_enabled).to_owned()));
        entries.push((KEY_CUMULUS_ENABLED, bool_str(self.cumulus_enabled).to_owned()));

        let mut doc = IniDocument::new();
        doc.add_section(CONFIG_SECTION);
        for (key, value) in entries
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        {
            doc.set(CONFIG_SECTION, key, value)?;
        }
        Ok(doc)
    }

    /// Writes the settings to the state file at `path`, preceded by a
    /// generated header.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Io`] if the file cannot be written.
    pub fn save_state(&self, path: &Path) -> Result<()> {
        let doc = self.to_document()?;
        let mut file = std::fs::File::create(path).map_err(|e| SetupError::io(path, e))?;
        let text = format!("{}{}", state_header(&crate::artifacts::timestamp()), doc);
        file.write_all(text.as_bytes()).map_err(|e| SetupError::io(path, e))?;
        tracing::debug!(path = %path.display(), "saved settings");
        Ok(())
    }
}

fn section_entries(doc: &IniDocument) -> BTreeMap<String, String> {
    doc.entries(CONFIG_SECTION)
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// Header written at the top of the state file.
#[must_use]
pub fn state_header(time: &str) -> String {
    format!(
        "
# Autogenerated at {time}
#
# This file contains configuration values used by the nimbus-configure program.
# If you want to change any of these values, you may edit this file, but you
# must run nimbus-configure before the change will take effect.

"
    )
}
