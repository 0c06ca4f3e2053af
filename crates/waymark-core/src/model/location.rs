// ── Device and location types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::marker::Coordinates;

/// Stable per-installation identifier attached to every location report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random (v4) UUID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// One sample from the position sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub position: Coordinates,
    /// Horizontal accuracy radius in meters, when the sensor reports one.
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(position: Coordinates) -> Self {
        Self {
            position,
            accuracy_m: None,
            captured_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy_m = Some(meters);
        self
    }
}

/// Payload sent to the location store.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub device_id: DeviceId,
    pub position: Coordinates,
}

/// A stored location report as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLocation {
    pub device_id: DeviceId,
    #[serde(flatten)]
    pub position: Coordinates,
    pub reported_at: Option<DateTime<Utc>>,
}
