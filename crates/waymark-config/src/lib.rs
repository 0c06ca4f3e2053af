//! Shared configuration for the waymark CLI.
//!
//! TOML profiles merged with `WAYMARK_` environment variables, plus
//! translation to `waymark_core::SyncConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use waymark_core::{Coordinates, DEFAULT_API_URL, MarkerType, SyncConfig, TlsVerification, Viewport};

const IDENTITY_FILE_NAME: &str = "identity.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Where the device identifier is kept (defaults to the data dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Initial map view.
    #[serde(default)]
    pub map: MapDefaults,

    /// Named marker-service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            identity_file: None,
            defaults: Defaults::default(),
            map: MapDefaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// `[map]` section: where a session opens and how clicks are tagged.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapDefaults {
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Type tag for markers created by clicking the map.
    #[serde(default = "default_marker_type")]
    pub marker_type: String,
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            zoom: default_zoom(),
            marker_type: default_marker_type(),
        }
    }
}

fn default_latitude() -> f64 {
    waymark_core::model::DEFAULT_CENTER.latitude()
}
fn default_longitude() -> f64 {
    waymark_core::model::DEFAULT_CENTER.longitude()
}
fn default_zoom() -> u8 {
    waymark_core::model::DEFAULT_ZOOM
}
fn default_marker_type() -> String {
    waymark_core::model::CUSTOM_MARKER_TYPE.into()
}

impl MapDefaults {
    pub fn viewport(&self) -> Result<Viewport, ConfigError> {
        let center =
            Coordinates::new(self.latitude, self.longitude).map_err(|e| ConfigError::Validation {
                field: "map".into(),
                reason: e.to_string(),
            })?;
        if self.zoom > 22 {
            return Err(ConfigError::Validation {
                field: "map.zoom".into(),
                reason: format!("expected 0..=22, got {}", self.zoom),
            });
        }
        Ok(Viewport::new(center, self.zoom))
    }
}

/// A named marker-service profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Service base URL (e.g., "http://localhost:5000/api").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "waymark", "waymark")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("waymark");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the device identifier lives when `identity_file` is unset.
pub fn default_identity_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share").join(IDENTITY_FILE_NAME),
        |dirs| dirs.data_dir().join(IDENTITY_FILE_NAME),
    )
}

impl Config {
    pub fn identity_path(&self) -> PathBuf {
        self.identity_file
            .clone()
            .unwrap_or_else(default_identity_path)
    }

    /// Resolve a profile by explicit name, else the default profile.
    ///
    /// The implicit `default` profile always exists, pointing at the
    /// local development server.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());

        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile.clone())),
            None if name == "default" => Ok((name, Profile::default())),
            None => Err(ConfigError::UnknownProfile { profile: name }),
        }
    }
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, then `WAYMARK_` variables
/// (`__` separates nesting, e.g. `WAYMARK_DEFAULTS__TIMEOUT=5`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WAYMARK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SyncConfig` from a profile, falling back to global defaults.
pub fn profile_to_sync_config(
    profile: &Profile,
    defaults: &Defaults,
    map: &MapDefaults,
) -> Result<SyncConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(SyncConfig {
        api_url,
        tls,
        timeout,
        initial_view: map.viewport()?,
        click_marker_type: MarkerType::from(map.marker_type.as_str()),
    })
}
