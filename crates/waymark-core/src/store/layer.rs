// ── Marker layer ──
//
// The rendered set of shared markers. Mutation is all-or-nothing: a
// reconciliation builds the next snapshot off to the side and publishes
// it with a single `watch` send, so subscribers never see a half-applied
// set.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use super::render::RenderedMarker;
use crate::model::{Marker, MarkerId};

/// Immutable view of the layer at one version.
#[derive(Debug, Default)]
pub struct MarkerSnapshot {
    version: u64,
    markers: Vec<Arc<RenderedMarker>>,
    index: HashMap<MarkerId, usize>,
}

impl MarkerSnapshot {
    /// Bumped on every replacement, starting at 0 for the empty layer.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers in server order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RenderedMarker>> {
        self.markers.iter()
    }

    pub fn get(&self, id: &MarkerId) -> Option<&Arc<RenderedMarker>> {
        self.index.get(id).and_then(|&i| self.markers.get(i))
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> Vec<MarkerId> {
        self.markers.iter().map(|m| m.id().clone()).collect()
    }
}

/// Counts describing one replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerDiff {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub total: usize,
}

pub(crate) struct MarkerLayer {
    snapshot: watch::Sender<Arc<MarkerSnapshot>>,
}

impl MarkerLayer {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(MarkerSnapshot::default()));
        Self { snapshot }
    }

    pub(crate) fn snapshot(&self) -> Arc<MarkerSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<MarkerSnapshot>> {
        self.snapshot.subscribe()
    }

    /// Replace the whole layer with `markers`.
    ///
    /// Duplicate ids keep their first occurrence. Markers identical to the
    /// previous snapshot reuse its `Arc`.
    pub(crate) fn replace_all(&self, markers: Vec<Marker>) -> LayerDiff {
        let previous = self.snapshot();

        let mut next = Vec::with_capacity(markers.len());
        let mut index = HashMap::with_capacity(markers.len());
        let mut diff = LayerDiff::default();

        for marker in markers {
            if index.contains_key(&marker.id) {
                warn!(id = %marker.id, "duplicate marker id from server; keeping first");
                continue;
            }
            let rendered = match previous.get(&marker.id) {
                Some(existing) if existing.marker == marker => Arc::clone(existing),
                Some(_) => {
                    diff.changed += 1;
                    Arc::new(RenderedMarker::render(marker))
                }
                None => {
                    diff.added += 1;
                    Arc::new(RenderedMarker::render(marker))
                }
            };
            index.insert(rendered.id().clone(), next.len());
            next.push(rendered);
        }

        diff.removed = previous
            .iter()
            .filter(|m| !index.contains_key(m.id()))
            .count();
        diff.total = next.len();

        let snapshot = Arc::new(MarkerSnapshot {
            version: previous.version + 1,
            markers: next,
            index,
        });
        // `send_replace` updates even with zero receivers.
        self.snapshot.send_replace(snapshot);
        diff
    }
}
