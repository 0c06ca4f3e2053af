// ── Render-ready marker values ──
//
// What a map widget needs to draw: the marker itself, a style, and popup
// content. The delete affordance carries the id it was rendered for, so a
// stale popup can only ever delete its own marker.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Coordinates, Marker, MarkerId, PositionFix};

/// Popup heading for the device's own position.
pub const SELF_MARKER_LABEL: &str = "Your Location";

/// Visual treatment of a marker pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// Shared markers from the marker store.
    Standard,
    /// The device's own live position.
    SelfPosition,
}

/// Delete event raised from a marker popup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeleteRequest {
    pub marker_id: MarkerId,
}

impl DeleteRequest {
    pub fn new(marker_id: MarkerId) -> Self {
        Self { marker_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub heading: String,
    pub lines: Vec<String>,
    /// Present on store-backed markers only.
    pub delete: Option<DeleteRequest>,
}

/// One shared marker as it appears on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMarker {
    pub marker: Marker,
    pub style: MarkerStyle,
    pub popup: Popup,
}

impl RenderedMarker {
    pub(crate) fn render(marker: Marker) -> Self {
        let mut lines = Vec::with_capacity(2);
        if let Some(description) = &marker.description {
            lines.push(description.clone());
        }
        lines.push(format!(
            "Lat: {:.4}, Lng: {:.4}",
            marker.position.latitude(),
            marker.position.longitude()
        ));
        let popup = Popup {
            heading: marker.title.clone(),
            lines,
            delete: Some(DeleteRequest::new(marker.id.clone())),
        };
        Self {
            marker,
            style: MarkerStyle::Standard,
            popup,
        }
    }

    pub fn id(&self) -> &MarkerId {
        &self.marker.id
    }

    /// The delete event this marker's popup raises.
    pub fn delete_request(&self) -> Option<&DeleteRequest> {
        self.popup.delete.as_ref()
    }
}

/// The distinguished marker at the device's last published position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfMarker {
    pub position: Coordinates,
    pub accuracy_m: Option<f64>,
    pub fixed_at: DateTime<Utc>,
    pub style: MarkerStyle,
    pub popup: Popup,
}

impl SelfMarker {
    pub(crate) fn from_fix(fix: &PositionFix) -> Self {
        let mut lines = vec![fix.position.to_string()];
        if let Some(accuracy) = fix.accuracy_m {
            lines.push(format!("±{accuracy:.0} m"));
        }
        Self {
            position: fix.position,
            accuracy_m: fix.accuracy_m,
            fixed_at: fix.captured_at,
            style: MarkerStyle::SelfPosition,
            popup: Popup {
                heading: SELF_MARKER_LABEL.into(),
                lines,
                delete: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::MarkerType;

    fn marker(id: &str, description: Option<&str>) -> Marker {
        Marker {
            id: MarkerId::new(id),
            title: format!("Title {id}"),
            description: description.map(str::to_owned),
            position: Coordinates::new(48.856_61, 2.352_22).unwrap(),
            marker_type: MarkerType::Custom,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn popup_binds_delete_to_its_own_marker() {
        let rendered = RenderedMarker::render(marker("a", None));
        assert_eq!(rendered.popup.heading, "Title a");
        assert_eq!(rendered.popup.lines, vec!["Lat: 48.8566, Lng: 2.3522"]);
        assert_eq!(
            rendered.delete_request(),
            Some(&DeleteRequest::new(MarkerId::new("a")))
        );
        assert_eq!(rendered.style, MarkerStyle::Standard);
    }

    #[test]
    fn description_precedes_coordinates() {
        let rendered = RenderedMarker::render(marker("a", Some("Meet here")));
        assert_eq!(rendered.popup.lines[0], "Meet here");
    }

    #[test]
    fn self_marker_has_no_delete_affordance() {
        let fix = PositionFix::new(Coordinates::new(1.0, 2.0).unwrap()).with_accuracy(12.4);
        let me = SelfMarker::from_fix(&fix);
        assert_eq!(me.popup.heading, SELF_MARKER_LABEL);
        assert_eq!(me.popup.delete, None);
        assert_eq!(me.style, MarkerStyle::SelfPosition);
        assert_eq!(me.popup.lines, vec!["1.0000, 2.0000", "±12 m"]);
    }
}
