// ── Gesture queue types ──
//
// Every marker mutation and refresh travels through one mpsc channel as a
// `GestureEnvelope`; the owner task answers on the oneshot.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::model::{Marker, MarkerDraft, MarkerId};
use crate::store::{DeleteRequest, LayerDiff};

#[derive(Debug, Clone)]
pub(crate) enum Gesture {
    Create { draft: MarkerDraft },
    Delete { request: DeleteRequest },
    Refresh,
}

pub(crate) struct GestureEnvelope {
    pub gesture: Gesture,
    pub response_tx: oneshot::Sender<Result<GestureOutcome, CoreError>>,
}

/// Result of one processed gesture.
#[derive(Debug, Clone)]
pub enum GestureOutcome {
    Created(Marker),
    Deleted(MarkerId),
    Reconciled(Reconciliation),
}

/// What a reconciliation changed on the marker layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub diff: LayerDiff,
    pub version: u64,
    pub completed_at: DateTime<Utc>,
}
