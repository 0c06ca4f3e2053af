// Wire types for the waymark REST API.
//
// Field names follow the server's camelCase JSON. Marker identifiers are
// document ids serialized as `_id`; `id` is accepted as well, and a record
// carrying both (virtual `id` enabled on the server) prefers `_id`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

fn default_marker_type() -> String {
    "custom".into()
}

// ── List elements ────────────────────────────────────────────────────

/// One element of a list response, decoded on its own.
///
/// A malformed element becomes [`Record::Invalid`] instead of failing the
/// whole response, so callers can drop it and keep the rest of the set.
#[derive(Debug, Clone, PartialEq)]
pub enum Record<T> {
    Valid(T),
    Invalid { reason: String, raw: serde_json::Value },
}

impl<T> Record<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid { .. } => None,
        }
    }

    pub fn as_valid(&self) -> Option<&T> {
        match self {
            Self::Valid(v) => Some(v),
            Self::Invalid { .. } => None,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Record<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match T::deserialize(&raw) {
            Ok(v) => Self::Valid(v),
            Err(e) => Self::Invalid {
                reason: e.to_string(),
                raw,
            },
        })
    }
}

// ── Markers ──────────────────────────────────────────────────────────

/// A marker as returned by `GET /markers`, `POST /markers`, `PUT /markers/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MarkerWire")]
pub struct MarkerResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_marker_type")]
    pub marker_type: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkerWire {
    #[serde(rename = "_id", default)]
    document_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    title: String,
    #[serde(default)]
    description: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_marker_type")]
    marker_type: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<MarkerWire> for MarkerResponse {
    type Error = String;

    fn try_from(w: MarkerWire) -> Result<Self, Self::Error> {
        let id = w
            .document_id
            .or(w.id)
            .ok_or_else(|| "missing field `_id`".to_owned())?;
        Ok(Self {
            id,
            title: w.title,
            description: w.description,
            latitude: w.latitude,
            longitude: w.longitude,
            marker_type: w.marker_type,
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
    }
}

/// Body of `POST /markers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub marker_type: String,
}

/// Body of `PUT /markers/:id`: only the fields being changed are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,
}

// ── Locations ────────────────────────────────────────────────────────

/// Body of `POST /locations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCreate {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A stored location report from `GET /locations[/:deviceId]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "LocationWire")]
pub struct LocationResponse {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationWire {
    #[serde(rename = "_id", default)]
    document_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    device_id: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<LocationWire> for LocationResponse {
    fn from(w: LocationWire) -> Self {
        Self {
            id: w.document_id.or(w.id),
            device_id: w.device_id,
            latitude: w.latitude,
            longitude: w.longitude,
            timestamp: w.timestamp,
            created_at: w.created_at,
        }
    }
}

impl LocationResponse {
    /// When the report was recorded: the explicit `timestamp`, else `createdAt`.
    pub fn reported_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.or(self.created_at)
    }
}
