// ── Map view state ──
//
// Everything a map widget renders, held in `watch` channels: the shared
// marker layer, the device's own marker, and the viewport. Writers are
// the sync engine and the location reporter; readers subscribe.

mod layer;
mod render;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{Marker, PositionFix, Viewport};
use crate::stream::ViewStream;

pub use layer::{LayerDiff, MarkerSnapshot};
pub use render::{
    DeleteRequest, MarkerStyle, Popup, RenderedMarker, SELF_MARKER_LABEL, SelfMarker,
};

use layer::MarkerLayer;

pub struct MapViewState {
    markers: MarkerLayer,
    self_marker: watch::Sender<Option<Arc<SelfMarker>>>,
    viewport: watch::Sender<Viewport>,
    last_reconciled: watch::Sender<Option<DateTime<Utc>>>,
}

impl MapViewState {
    pub fn new(initial_view: Viewport) -> Self {
        let (self_marker, _) = watch::channel(None);
        let (viewport, _) = watch::channel(initial_view);
        let (last_reconciled, _) = watch::channel(None);
        Self {
            markers: MarkerLayer::new(),
            self_marker,
            viewport,
            last_reconciled,
        }
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn markers(&self) -> Arc<MarkerSnapshot> {
        self.markers.snapshot()
    }

    pub fn self_marker(&self) -> Option<Arc<SelfMarker>> {
        self.self_marker.borrow().clone()
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.borrow()
    }

    /// When the marker layer last matched the server.
    pub fn last_reconciled(&self) -> Option<DateTime<Utc>> {
        *self.last_reconciled.borrow()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_markers(&self) -> ViewStream<Arc<MarkerSnapshot>> {
        ViewStream::new(self.markers.subscribe())
    }

    pub fn subscribe_self_marker(&self) -> ViewStream<Option<Arc<SelfMarker>>> {
        ViewStream::new(self.self_marker.subscribe())
    }

    pub fn subscribe_viewport(&self) -> ViewStream<Viewport> {
        ViewStream::new(self.viewport.subscribe())
    }

    // ── Mutation (crate-internal) ────────────────────────────────────

    pub(crate) fn replace_markers(&self, markers: Vec<Marker>) -> LayerDiff {
        let diff = self.markers.replace_all(markers);
        self.last_reconciled.send_replace(Some(Utc::now()));
        diff
    }

    /// Move the self marker to `fix` and center the view on it.
    pub(crate) fn place_self_marker(&self, fix: &PositionFix) {
        self.self_marker
            .send_replace(Some(Arc::new(SelfMarker::from_fix(fix))));
        self.viewport
            .send_modify(|view| *view = view.recentered(fix.position));
    }
}

impl Default for MapViewState {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl std::fmt::Debug for MapViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapViewState")
            .field("markers", &self.markers.snapshot().len())
            .field("self_marker", &self.self_marker.borrow().is_some())
            .field("viewport", &*self.viewport.borrow())
            .finish_non_exhaustive()
    }
}
