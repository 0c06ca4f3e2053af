//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use waymark_config::ConfigError;
use waymark_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the marker service: {reason}")]
    #[diagnostic(
        code(waymark::connection_failed),
        help(
            "Check that the service is running and the URL is right.\n\
             Override it with --api-url, or run: waymark config show"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Marker service did not answer in time")]
    #[diagnostic(
        code(waymark::timeout),
        help("Increase the timeout with --timeout or check service responsiveness.")
    )]
    Timeout,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(waymark::not_found),
        help("Run: waymark {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Marker service error: {message}")]
    #[diagnostic(code(waymark::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(waymark::validation))]
    Validation { field: String, reason: String },

    // ── Device ───────────────────────────────────────────────────────
    #[error("Position unavailable: {reason}")]
    #[diagnostic(code(waymark::sensor_unavailable))]
    SensorUnavailable { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(waymark::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: waymark config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("{source}")]
    #[diagnostic(code(waymark::config), help("Config file: {path}"))]
    Config {
        #[source]
        source: ConfigError,
        path: String,
    },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(waymark::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Session script ───────────────────────────────────────────────
    #[error("line {line}: {reason}")]
    #[diagnostic(
        code(waymark::script),
        help(
            "Commands: click LAT LNG | delete ID | refresh | fix LAT LNG [ACCURACY] \
             | lost REASON | show"
        )
    )]
    Script { line: usize, reason: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(waymark::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. }
            | Self::Script { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport {
                message,
                status: None,
            } => CliError::ConnectionFailed { reason: message },

            CoreError::Transport {
                message,
                status: Some(_),
            } => CliError::ApiError { message },

            CoreError::Timeout => CliError::Timeout,

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => {
                let list_command = match entity_type.as_str() {
                    "device" => "locations latest".to_owned(),
                    other => format!("{other}s list"),
                };
                CliError::NotFound {
                    resource_type: entity_type,
                    identifier,
                    list_command,
                }
            }

            CoreError::SensorUnavailable { reason } => CliError::SensorUnavailable { reason },

            CoreError::Config { message } => CliError::Validation {
                field: "api_url".into(),
                reason: message,
            },

            CoreError::ViewClosed => CliError::Internal("map session already closed".into()),

            CoreError::InvalidState { message } | CoreError::Internal(message) => {
                CliError::Internal(message)
            }
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: available_profiles(),
            },
            source => CliError::Config {
                source,
                path: waymark_config::config_path().display().to_string(),
            },
        }
    }
}

fn available_profiles() -> String {
    let cfg = waymark_config::load_config_or_default();
    let names: Vec<&str> = std::iter::once("default")
        .chain(
            cfg.profiles
                .keys()
                .map(String::as_str)
                .filter(|n| *n != "default"),
        )
        .collect();
    names.join(", ")
}
