// ── Runtime sync configuration ──
//
// These types describe *how* to reach the marker service and how a map
// view starts out. They never touch disk: the CLI builds a `SyncConfig`
// from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::model::{MarkerType, Viewport};

/// Default service address for local development servers.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for waymark_api::TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Configuration for one map session against one marker service.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Service base URL (e.g., `http://localhost:5000/api`).
    pub api_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Viewport used before the first position fix arrives.
    pub initial_view: Viewport,
    /// Type tag for markers created from map clicks.
    pub click_marker_type: MarkerType,
}

impl SyncConfig {
    pub(crate) fn transport(&self) -> waymark_api::TransportConfig {
        waymark_api::TransportConfig {
            tls: (&self.tls).into(),
            timeout: self.timeout,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            initial_view: Viewport::default(),
            click_marker_type: MarkerType::Custom,
        }
    }
}
