// ── API-to-domain type conversions ──
//
// Bridges raw `waymark_api` wire types into canonical `crate::model`
// types. Server payloads are validated here; a record with coordinates
// outside the valid range never reaches a map layer.

use waymark_api::types::{
    LocationCreate, LocationResponse, MarkerCreate, MarkerResponse, MarkerUpdate,
};

use crate::error::CoreError;
use crate::model::{
    Coordinates, DeviceId, DeviceLocation, LocationReport, Marker, MarkerDraft, MarkerId,
    MarkerPatch, MarkerType,
};

// ── Markers ──────────────────────────────────────────────────────────

impl TryFrom<MarkerResponse> for Marker {
    type Error = CoreError;

    fn try_from(m: MarkerResponse) -> Result<Self, Self::Error> {
        if m.id.is_empty() {
            return Err(CoreError::validation("marker without an id"));
        }
        let position = Coordinates::new(m.latitude, m.longitude)?;
        Ok(Marker {
            id: MarkerId::from(m.id),
            title: m.title,
            description: m.description.filter(|d| !d.is_empty()),
            position,
            marker_type: MarkerType::from(m.marker_type),
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<&MarkerDraft> for MarkerCreate {
    fn from(d: &MarkerDraft) -> Self {
        MarkerCreate {
            title: d.title.clone(),
            description: d.description.clone(),
            latitude: d.position.latitude(),
            longitude: d.position.longitude(),
            marker_type: d.marker_type.as_str().to_owned(),
        }
    }
}

impl From<&MarkerPatch> for MarkerUpdate {
    fn from(p: &MarkerPatch) -> Self {
        MarkerUpdate {
            title: p.title.clone(),
            description: p.description.clone(),
            latitude: p.position.map(|c| c.latitude()),
            longitude: p.position.map(|c| c.longitude()),
            marker_type: p.marker_type.as_ref().map(|t| t.as_str().to_owned()),
        }
    }
}

// ── Locations ────────────────────────────────────────────────────────

impl From<&LocationReport> for LocationCreate {
    fn from(r: &LocationReport) -> Self {
        LocationCreate {
            device_id: r.device_id.as_str().to_owned(),
            latitude: r.position.latitude(),
            longitude: r.position.longitude(),
        }
    }
}

impl TryFrom<LocationResponse> for DeviceLocation {
    type Error = CoreError;

    fn try_from(l: LocationResponse) -> Result<Self, Self::Error> {
        let reported_at = l.reported_at();
        Ok(DeviceLocation {
            device_id: DeviceId::new(l.device_id),
            position: Coordinates::new(l.latitude, l.longitude)?,
            reported_at,
        })
    }
}
