//! CLI configuration -- thin wrapper around `waymark_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --insecure, --timeout, --output).

use clap::ValueEnum;
use tracing::debug;

use waymark_core::{DeviceIdentity, FileIdentityStore, SyncConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use waymark_config::{Config, Profile, config_path, load_config, save_config};

/// Everything a service-bound command needs, resolved once per run.
pub struct Context {
    pub config: Config,
    pub sync: SyncConfig,
    pub output: OutputFormat,
    pub quiet: bool,
    pub yes: bool,
}

impl Context {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load_config()?;
        let sync = resolve_sync_config(global, &config)?;
        Ok(Self {
            output: output_format(global, &config),
            quiet: global.quiet,
            yes: global.yes,
            sync,
            config,
        })
    }

    /// The persisted identity of this installation.
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(FileIdentityStore::new(self.config.identity_path()))
    }
}

/// Flag, then `[defaults].output`, then table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Translate the active profile + global flags into a `SyncConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_sync_config(global: &GlobalOpts, config: &Config) -> Result<SyncConfig, CliError> {
    let (name, mut profile) = config.resolve_profile(global.profile.as_deref())?;

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }

    let sync = waymark_config::profile_to_sync_config(&profile, &config.defaults, &config.map)?;
    debug!(profile = %name, api_url = %sync.api_url, "resolved service config");
    Ok(sync)
}
