// ── Map viewport ──

use serde::Serialize;

use super::marker::Coordinates;

/// Where the map opens when nothing else is known (Paris).
pub const DEFAULT_CENTER: Coordinates = Coordinates::from_degrees_unchecked(48.8566, 2.3522);
pub const DEFAULT_ZOOM: u8 = 13;

/// Visible map region: a center and a tile zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: Coordinates,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(center: Coordinates, zoom: u8) -> Self {
        Self { center, zoom }
    }

    /// Same zoom, new center.
    #[must_use]
    pub fn recentered(self, center: Coordinates) -> Self {
        Self { center, ..self }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}
