//! Configuration loading and the typed [`MontageConfig`].
//!
//! The base configuration lives in `montage-config.yaml`. An optional
//! `montage-local.yaml` next to it is merged key-by-key over the base
//! before deserializing, so a host can override a handful of settings
//! without copying the whole file. Every field has a default; a missing
//! or broken file degrades to defaults rather than stopping the router.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::args::is_true_value;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Router configuration, mirroring `montage-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MontageConfig {
    /// Name of this host, used in logs and GUI notifications.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Fixed identity on the bus. A fresh one is generated when absent.
    #[serde(default)]
    pub nuid: Option<String>,

    /// Republish live gestures on the bus.
    #[serde(default, deserialize_with = "flag")]
    pub publishcursor: bool,

    /// Republish local MIDI device input on the bus.
    #[serde(default, deserialize_with = "flag")]
    pub publishmidi: bool,

    /// Let Reactors generate visuals.
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub generatevisuals: bool,

    /// Let Reactors generate sound.
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub generatesound: bool,

    /// Comma-separated MIDI input port names.
    #[serde(default)]
    pub midiinput: String,

    /// Send `/notify` messages to the GUI.
    #[serde(default, deserialize_with = "flag")]
    pub notifygui: bool,

    /// Comma-separated debug flags turned on at startup.
    #[serde(default)]
    pub debug: String,

    /// Region letters, in assignment order.
    #[serde(default = "default_region_letters")]
    pub region_letters: String,

    /// Clicks per second at tempo factor 1.
    #[serde(default = "default_clicks_per_second")]
    pub clicks_per_second: f64,

    /// Clicks in one beat.
    #[serde(default = "default_clicks_per_beat")]
    pub clicks_per_beat: u64,

    /// Directory holding recordings.
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: PathBuf,

    /// Directory holding MIDI files for `global.midi_midifile`.
    #[serde(default = "default_midifiles_dir")]
    pub midifiles_dir: PathBuf,

    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying API requests.
    #[serde(default = "default_api_subject")]
    pub api_subject: String,

    /// Subject carrying event notifications.
    #[serde(default = "default_event_subject")]
    pub event_subject: String,

    /// Address the OSC listener binds.
    #[serde(default = "default_osc_listen")]
    pub osc_listen: String,

    /// Address of the GUI's OSC port.
    #[serde(default = "default_gui_addr")]
    pub gui_addr: String,

    /// Address of the audio engine's OSC port.
    #[serde(default = "default_audio_engine_addr")]
    pub audio_engine_addr: String,

    /// Pause between audio transport off and on during an audio reset.
    #[serde(default = "default_audio_reset_settle_ms")]
    pub audio_reset_settle_ms: u64,
}

impl Default for MontageConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            nuid: None,
            publishcursor: false,
            publishmidi: false,
            generatevisuals: true,
            generatesound: true,
            midiinput: String::new(),
            notifygui: false,
            debug: String::new(),
            region_letters: default_region_letters(),
            clicks_per_second: default_clicks_per_second(),
            clicks_per_beat: default_clicks_per_beat(),
            recordings_dir: default_recordings_dir(),
            midifiles_dir: default_midifiles_dir(),
            nats_url: default_nats_url(),
            api_subject: default_api_subject(),
            event_subject: default_event_subject(),
            osc_listen: default_osc_listen(),
            gui_addr: default_gui_addr(),
            audio_engine_addr: default_audio_engine_addr(),
            audio_reset_settle_ms: default_audio_reset_settle_ms(),
        }
    }
}

impl MontageConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied (see
    /// [`apply_env_overrides`](Self::apply_env_overrides)).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse_without_env(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_yml::Value = serde_yml::from_str(yaml)?;
        Self::from_value(value)
    }

    fn from_value(value: serde_yml::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_value(value)?)
    }

    /// Load `base`, then merge `local` over it when that file exists.
    ///
    /// A missing base file counts as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either file exists but cannot be read
    /// or parsed.
    pub fn load(base: &Path, local: &Path) -> Result<Self, ConfigError> {
        let mut merged = read_yaml(base)?;
        let overlay = read_yaml(local)?;
        merge_yaml(&mut merged, overlay);
        let mut config = Self::from_value(merged)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`load`](Self::load), but logs failures and falls back to
    /// defaults.
    pub fn load_or_default(base: &Path, local: &Path) -> Self {
        match Self::load(base, local) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, path = %base.display(), "Config load failed, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Override values from the environment:
    /// - `NATS_URL` overrides `nats_url`
    /// - `MONTAGE_HOSTNAME` overrides `hostname`
    /// - `MONTAGE_NUID` overrides `nuid`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("NATS_URL") {
            self.nats_url = val;
        }
        if let Some(val) = lookup("MONTAGE_HOSTNAME") {
            self.hostname = val;
        }
        if let Some(val) = lookup("MONTAGE_NUID") {
            self.nuid = Some(val);
        }
    }

    /// The configured MIDI input port names.
    pub fn midi_inputs(&self) -> Vec<String> {
        self.midiinput
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// The OSC listener address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `osc_listen` is not `host:port`.
    pub fn osc_listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("osc_listen", &self.osc_listen)
    }

    /// The GUI notification address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `gui_addr` is not `host:port`.
    pub fn gui_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("gui_addr", &self.gui_addr)
    }

    /// The audio engine address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `audio_engine_addr` is not
    /// `host:port`.
    pub fn audio_engine_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_addr("audio_engine_addr", &self.audio_engine_addr)
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{value}: {e}"),
    })
}

/// Read a YAML file, treating a missing file as an empty document.
fn read_yaml(path: &Path) -> Result<serde_yml::Value, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, skipping");
        return Ok(serde_yml::Value::Null);
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yml::from_str(&contents)?)
}

/// Overlay the top-level keys of `overlay` onto `base`.
fn merge_yaml(base: &mut serde_yml::Value, overlay: serde_yml::Value) {
    match (base, overlay) {
        (_, serde_yml::Value::Null) => {}
        (serde_yml::Value::Mapping(base), serde_yml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// A boolean written as a YAML bool or one of the accepted strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    match FlagValue::deserialize(deserializer)? {
        FlagValue::Bool(b) => Ok(b),
        FlagValue::Int(0) => Ok(false),
        FlagValue::Int(1) => Ok(true),
        FlagValue::Int(n) => Err(D::Error::custom(format!("invalid boolean value {n}"))),
        FlagValue::Text(s) => {
            is_true_value(&s).ok_or_else(|| D::Error::custom(format!("invalid boolean value {s:?}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_hostname() -> String {
    "localhost".to_owned()
}

const fn default_true() -> bool {
    true
}

fn default_region_letters() -> String {
    "ABCD".to_owned()
}

const fn default_clicks_per_second() -> f64 {
    192.0
}

const fn default_clicks_per_beat() -> u64 {
    96
}

fn default_recordings_dir() -> PathBuf {
    PathBuf::from("recordings")
}

fn default_midifiles_dir() -> PathBuf {
    PathBuf::from("midifiles")
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_api_subject() -> String {
    "montage.api".to_owned()
}

fn default_event_subject() -> String {
    "montage.event".to_owned()
}

fn default_osc_listen() -> String {
    "127.0.0.1:3333".to_owned()
}

fn default_gui_addr() -> String {
    "127.0.0.1:3943".to_owned()
}

fn default_audio_engine_addr() -> String {
    "127.0.0.1:3210".to_owned()
}

const fn default_audio_reset_settle_ms() -> u64 {
    400
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_match_installation() {
        let config = MontageConfig::default();
        assert_eq!(config.region_letters, "ABCD");
        assert_eq!(config.clicks_per_beat, 96);
        assert_eq!(config.api_subject, "montage.api");
        assert_eq!(config.event_subject, "montage.event");
        assert_eq!(config.audio_reset_settle_ms, 400);
        assert!(config.generatesound);
        assert!(!config.publishcursor);
    }

    #[test]
    fn flags_accept_strings_and_bools() {
        let yaml = r#"
publishcursor: "on"
publishmidi: true
notifygui: "False"
generatesound: 0
midiinput: "Keystation, nanoKONTROL2 "
"#;
        let config = MontageConfig::parse_without_env(yaml).unwrap();
        assert!(config.publishcursor);
        assert!(config.publishmidi);
        assert!(!config.notifygui);
        assert!(!config.generatesound);
        assert_eq!(config.midi_inputs(), vec!["Keystation", "nanoKONTROL2"]);
    }

    #[test]
    fn bad_flag_is_a_yaml_error() {
        assert!(matches!(
            MontageConfig::parse_without_env("publishcursor: maybe"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn empty_document_is_default() {
        let config = MontageConfig::parse_without_env("").unwrap();
        assert_eq!(config, MontageConfig::default());
    }

    #[test]
    fn local_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("montage-config.yaml");
        let local = dir.path().join("montage-local.yaml");
        std::fs::write(&base, "hostname: stage\nnotifygui: true\nregion_letters: AB\n").unwrap();
        std::fs::write(&local, "hostname: booth\n").unwrap();

        let mut merged = read_yaml(&base).unwrap();
        merge_yaml(&mut merged, read_yaml(&local).unwrap());
        let config = MontageConfig::from_value(merged).unwrap();
        assert_eq!(config.hostname, "booth");
        assert!(config.notifygui);
        assert_eq!(config.region_letters, "AB");
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let merged = read_yaml(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(MontageConfig::from_value(merged).unwrap(), MontageConfig::default());
    }

    #[test]
    fn overrides_replace_values() {
        let mut config = MontageConfig::default();
        config.apply_overrides(no_env);
        assert_eq!(config, MontageConfig::default());
        config.apply_overrides(|key| (key == "MONTAGE_NUID").then(|| "fixed".to_owned()));
        assert_eq!(config.nuid.as_deref(), Some("fixed"));
    }

    #[test]
    fn addresses_parse() {
        let config = MontageConfig::default();
        assert_eq!(config.gui_socket_addr().unwrap().port(), 3943);
        assert_eq!(config.audio_engine_socket_addr().unwrap().port(), 3210);
        assert_eq!(config.osc_listen_addr().unwrap().port(), 3333);
    }
}
