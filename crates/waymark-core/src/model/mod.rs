// ── Domain model ──
//
// Canonical marker, location, and viewport types. Wire types from
// waymark-api are converted into these in `crate::convert`.

pub mod location;
pub mod map;
pub mod marker;

pub use location::{DeviceId, DeviceLocation, LocationReport, PositionFix};
pub use map::{DEFAULT_CENTER, DEFAULT_ZOOM, Viewport};
pub use marker::{
    CUSTOM_MARKER_TYPE, Coordinates, Marker, MarkerDraft, MarkerId, MarkerPatch, MarkerType,
};
