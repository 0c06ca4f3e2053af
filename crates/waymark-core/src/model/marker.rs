// ── Marker domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Type tag the server assigns when a client does not pick one.
pub const CUSTOM_MARKER_TYPE: &str = "custom";

// ── Identifiers ──────────────────────────────────────────────────────

/// Opaque server-assigned marker identifier.
///
/// Clients never mint these; they are compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MarkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MarkerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ── Coordinates ──────────────────────────────────────────────────────

/// A validated WGS84 position in decimal degrees.
///
/// Construction goes through [`Coordinates::new`], so every value in
/// circulation is finite, with latitude in [-90, 90] and longitude in
/// [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::validation(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::validation(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// For compile-time constants that are known to be in range.
    pub(crate) const fn from_degrees_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Four decimal places, roughly 11 m at the equator.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

// ── Marker type ──────────────────────────────────────────────────────

/// Free-form category tag carried by each marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MarkerType {
    #[default]
    Custom,
    Other(String),
}

impl MarkerType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Custom => CUSTOM_MARKER_TYPE,
            Self::Other(s) => s,
        }
    }
}

impl From<String> for MarkerType {
    fn from(s: String) -> Self {
        if s == CUSTOM_MARKER_TYPE {
            Self::Custom
        } else {
            Self::Other(s)
        }
    }
}

impl From<&str> for MarkerType {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<MarkerType> for String {
    fn from(t: MarkerType) -> Self {
        match t {
            MarkerType::Custom => CUSTOM_MARKER_TYPE.to_owned(),
            MarkerType::Other(s) => s,
        }
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Marker ───────────────────────────────────────────────────────────

/// A persisted, shared point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: MarkerId,
    pub title: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub position: Coordinates,
    pub marker_type: MarkerType,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for a marker the server has not stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDraft {
    pub title: String,
    pub description: Option<String>,
    pub position: Coordinates,
    pub marker_type: MarkerType,
}

impl MarkerDraft {
    /// A draft with the generated title `Marker at <lat>, <lng>`.
    pub fn at(position: Coordinates) -> Self {
        Self {
            title: format!("Marker at {position}"),
            description: None,
            position,
            marker_type: MarkerType::Custom,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, marker_type: MarkerType) -> Self {
        self.marker_type = marker_type;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)?;
        validate_type(&self.marker_type)
    }
}

/// A partial update; `None` leaves the stored field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<Coordinates>,
    pub marker_type: Option<MarkerType>,
}

impl MarkerPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.position.is_none()
            && self.marker_type.is_none()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.is_empty() {
            return Err(CoreError::validation("update carries no fields"));
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(marker_type) = &self.marker_type {
            validate_type(marker_type)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::validation("title must not be empty"));
    }
    Ok(())
}

fn validate_type(marker_type: &MarkerType) -> Result<(), CoreError> {
    if marker_type.as_str().trim().is_empty() {
        return Err(CoreError::validation("marker type must not be empty"));
    }
    Ok(())
}
