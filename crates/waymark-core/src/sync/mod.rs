// ── Map view synchronization ──
//
// Owns the shared marker layer. Clicks, popup deletes, and refreshes are
// queued on one channel and handled by a single task, so a mutation and
// the reconciliation that follows it never interleave with another
// gesture.

mod gesture;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Coordinates, Marker, MarkerDraft, MarkerId, MarkerType};
use crate::repository::MarkerRepository;
use crate::store::{DeleteRequest, MapViewState};

pub use gesture::{GestureOutcome, Reconciliation};

use gesture::{Gesture, GestureEnvelope};

const GESTURE_CHANNEL_SIZE: usize = 64;

/// Lifecycle of a [`MapViewSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Running,
    Closed,
}

// ── MapViewSync ──────────────────────────────────────────────────────

/// Keeps the rendered marker layer equal to the remote marker set.
///
/// Cheaply cloneable; all clones feed the same gesture queue. Call
/// [`teardown`](Self::teardown) when the view goes away, otherwise the
/// owner task keeps running.
pub struct MapViewSync<R: MarkerRepository> {
    inner: Arc<SyncInner<R>>,
}

impl<R: MarkerRepository> Clone for MapViewSync<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SyncInner<R> {
    repo: Arc<R>,
    view: Arc<MapViewState>,
    click_marker_type: MarkerType,
    state: watch::Sender<SyncState>,
    gesture_tx: mpsc::Sender<GestureEnvelope>,
    gesture_rx: Mutex<Option<mpsc::Receiver<GestureEnvelope>>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<R: MarkerRepository> MapViewSync<R> {
    pub fn new(repo: Arc<R>, view: Arc<MapViewState>) -> Self {
        Self::with_marker_type(repo, view, MarkerType::Custom)
    }

    /// Like [`new`](Self::new), tagging click-created markers with `click_marker_type`.
    pub fn with_marker_type(
        repo: Arc<R>,
        view: Arc<MapViewState>,
        click_marker_type: MarkerType,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        let (gesture_tx, gesture_rx) = mpsc::channel(GESTURE_CHANNEL_SIZE);

        Self {
            inner: Arc::new(SyncInner {
                repo,
                view,
                click_marker_type,
                state,
                gesture_tx,
                gesture_rx: Mutex::new(Some(gesture_rx)),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn view(&self) -> &Arc<MapViewState> {
        &self.inner.view
    }

    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the owner task and load the initial marker set.
    ///
    /// The task keeps running when the initial load fails; a later
    /// [`refresh`](Self::refresh) can recover.
    pub async fn start(&self) -> Result<Reconciliation, CoreError> {
        {
            let mut task = self.inner.task.lock().await;
            if self.inner.cancel.is_cancelled() {
                return Err(CoreError::ViewClosed);
            }
            let Some(rx) = self.inner.gesture_rx.lock().await.take() else {
                return Err(CoreError::InvalidState {
                    message: "map view sync is already running".into(),
                });
            };
            *task = Some(tokio::spawn(gesture_task(Arc::clone(&self.inner), rx)));
            self.inner.state.send_replace(SyncState::Running);
        }
        info!("map view sync started");
        self.refresh().await
    }

    /// Stop processing gestures.
    ///
    /// A mutation already sent to the server runs to completion; any
    /// reconciliation still in flight is discarded. Returns once that
    /// mutation has settled, so teardown can take up to one request
    /// timeout. Later calls fail with [`CoreError::ViewClosed`].
    pub async fn teardown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        self.inner.state.send_replace(SyncState::Closed);
        debug!("map view sync torn down");
    }

    // ── Gestures ─────────────────────────────────────────────────────

    /// Create a marker where the map was clicked.
    pub async fn click(&self, latitude: f64, longitude: f64) -> Result<Marker, CoreError> {
        let position = Coordinates::new(latitude, longitude)
            .inspect_err(|e| warn!(error = %e, "ignoring click outside valid coordinates"))?;
        let draft = MarkerDraft::at(position).with_type(self.inner.click_marker_type.clone());
        self.create(draft).await
    }

    /// Create a marker from an explicit draft.
    pub async fn create(&self, draft: MarkerDraft) -> Result<Marker, CoreError> {
        match self.submit(Gesture::Create { draft }).await? {
            GestureOutcome::Created(marker) => Ok(marker),
            other => Err(unexpected(&other)),
        }
    }

    /// Delete the marker a popup was rendered for.
    pub async fn delete(&self, request: DeleteRequest) -> Result<MarkerId, CoreError> {
        match self.submit(Gesture::Delete { request }).await? {
            GestureOutcome::Deleted(id) => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    /// Re-fetch the marker set and replace the layer.
    pub async fn refresh(&self) -> Result<Reconciliation, CoreError> {
        match self.submit(Gesture::Refresh).await? {
            GestureOutcome::Reconciled(r) => Ok(r),
            other => Err(unexpected(&other)),
        }
    }

    async fn submit(&self, gesture: Gesture) -> Result<GestureOutcome, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ViewClosed);
        }
        if *self.inner.state.borrow() == SyncState::Idle {
            return Err(CoreError::InvalidState {
                message: "map view sync has not been started".into(),
            });
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .gesture_tx
            .send(GestureEnvelope {
                gesture,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ViewClosed)?;

        rx.await.map_err(|_| CoreError::ViewClosed)?
    }
}

fn unexpected(outcome: &GestureOutcome) -> CoreError {
    CoreError::Internal(format!("unexpected gesture outcome: {outcome:?}"))
}

// ── Owner task ───────────────────────────────────────────────────────

/// Drain the gesture queue one envelope at a time.
///
/// A refresh absorbs every refresh queued directly behind it; the first
/// non-refresh gesture found while absorbing is handled next.
async fn gesture_task<R: MarkerRepository>(
    inner: Arc<SyncInner<R>>,
    mut rx: mpsc::Receiver<GestureEnvelope>,
) {
    let cancel = inner.cancel.clone();
    let mut deferred: Option<GestureEnvelope> = None;

    loop {
        let envelope = if let Some(envelope) = deferred.take() {
            envelope
        } else {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    envelope
                }
            }
        };
        if cancel.is_cancelled() {
            break;
        }

        match envelope.gesture {
            Gesture::Refresh => {
                let mut waiters = vec![envelope.response_tx];
                while let Ok(next) = rx.try_recv() {
                    if matches!(next.gesture, Gesture::Refresh) {
                        waiters.push(next.response_tx);
                    } else {
                        deferred = Some(next);
                        break;
                    }
                }
                if waiters.len() > 1 {
                    debug!(requests = waiters.len(), "coalesced refresh requests");
                }

                let result = reconcile(&inner).await.map(GestureOutcome::Reconciled);
                for tx in waiters {
                    let _ = tx.send(result.clone());
                }
            }
            Gesture::Create { draft } => {
                let result = create_marker(&inner, &draft).await;
                let _ = envelope.response_tx.send(result);
            }
            Gesture::Delete { request } => {
                let result = delete_marker(&inner, &request).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }

    debug!("gesture task stopped");
}

async fn create_marker<R: MarkerRepository>(
    inner: &SyncInner<R>,
    draft: &MarkerDraft,
) -> Result<GestureOutcome, CoreError> {
    let marker = inner.repo.create(draft).await.inspect_err(|e| {
        warn!(error = %e, title = %draft.title, "marker creation failed; view unchanged");
    })?;
    info!(id = %marker.id, title = %marker.title, "marker created");

    // A failed follow-up reconciliation is logged and leaves the layer as is.
    let _ = reconcile(inner).await;
    Ok(GestureOutcome::Created(marker))
}

async fn delete_marker<R: MarkerRepository>(
    inner: &SyncInner<R>,
    request: &DeleteRequest,
) -> Result<GestureOutcome, CoreError> {
    let id = &request.marker_id;
    inner.repo.remove(id).await.inspect_err(|e| {
        warn!(id = %id, error = %e, "marker deletion failed; view unchanged");
    })?;
    info!(id = %id, "marker deleted");

    let _ = reconcile(inner).await;
    Ok(GestureOutcome::Deleted(id.clone()))
}

/// Fetch the full remote set, then swap the layer in one publication.
async fn reconcile<R: MarkerRepository>(inner: &SyncInner<R>) -> Result<Reconciliation, CoreError> {
    let listed = tokio::select! {
        biased;
        () = inner.cancel.cancelled() => {
            debug!("view closed during reconciliation; discarding");
            return Err(CoreError::ViewClosed);
        }
        listed = inner.repo.list() => listed,
    };
    let markers = listed.inspect_err(|e| {
        warn!(error = %e, "reconciliation failed; keeping rendered markers");
    })?;

    let diff = inner.view.replace_markers(markers);
    let version = inner.view.markers().version();
    debug!(
        total = diff.total,
        added = diff.added,
        removed = diff.removed,
        changed = diff.changed,
        version,
        "marker layer reconciled"
    );

    Ok(Reconciliation {
        diff,
        version,
        completed_at: Utc::now(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::{FakeMarkers, marker};

    fn setup(markers: Vec<Marker>) -> (Arc<FakeMarkers>, MapViewSync<FakeMarkers>) {
        let repo = Arc::new(FakeMarkers::with(markers));
        let sync = MapViewSync::new(Arc::clone(&repo), Arc::new(MapViewState::default()));
        (repo, sync)
    }

    fn rendered_ids(sync: &MapViewSync<FakeMarkers>) -> Vec<MarkerId> {
        sync.view().markers().ids()
    }

    #[tokio::test]
    async fn start_renders_remote_set() {
        let (_repo, sync) = setup(vec![marker("a", 1.0, 1.0), marker("b", 2.0, 2.0)]);
        let r = sync.start().await.unwrap();
        assert_eq!(r.diff.added, 2);
        assert_eq!(rendered_ids(&sync), vec![MarkerId::new("a"), MarkerId::new("b")]);
        assert_eq!(*sync.state().borrow(), SyncState::Running);
        sync.teardown().await;
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (_repo, sync) = setup(vec![]);
        sync.start().await.unwrap();
        assert!(matches!(
            sync.start().await,
            Err(CoreError::InvalidState { .. })
        ));
        sync.teardown().await;
    }

    #[tokio::test]
    async fn gestures_before_start_are_rejected() {
        let (_repo, sync) = setup(vec![]);
        assert!(matches!(
            sync.click(1.0, 1.0).await,
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn click_creates_then_reconciles() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();

        let created = sync.click(3.0, 3.0).await.unwrap();

        assert_eq!(created.title, "Marker at 3.0000, 3.0000");
        assert_eq!(created.marker_type, MarkerType::Custom);
        assert_eq!(rendered_ids(&sync), repo.ids());
        assert!(sync.view().markers().contains(&created.id));
        sync.teardown().await;
    }

    #[tokio::test]
    async fn invalid_click_never_reaches_repository() {
        let (repo, sync) = setup(vec![]);
        sync.start().await.unwrap();

        let err = sync.click(91.0, 0.0).await.unwrap_err();

        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(repo.ids().is_empty());
        sync.teardown().await;
    }

    #[tokio::test]
    async fn failed_create_leaves_layer_unchanged() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();
        let before = sync.view().markers();
        repo.fail_create.store(true, Ordering::SeqCst);

        let err = sync.click(3.0, 3.0).await.unwrap_err();

        assert!(err.is_transport());
        assert!(Arc::ptr_eq(&before, &sync.view().markers()));
        sync.teardown().await;
    }

    #[tokio::test]
    async fn delete_removes_marker_named_by_request() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0), marker("b", 2.0, 2.0)]);
        sync.start().await.unwrap();

        let request = sync
            .view()
            .markers()
            .get(&MarkerId::new("a"))
            .and_then(|m| m.delete_request().cloned())
            .unwrap();
        let deleted = sync.delete(request).await.unwrap();

        assert_eq!(deleted, MarkerId::new("a"));
        assert_eq!(repo.ids(), vec![MarkerId::new("b")]);
        assert_eq!(rendered_ids(&sync), vec![MarkerId::new("b")]);
        sync.teardown().await;
    }

    #[tokio::test]
    async fn deleting_missing_marker_is_not_found() {
        let (_repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();

        let err = sync
            .delete(DeleteRequest::new(MarkerId::new("ghost")))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(rendered_ids(&sync), vec![MarkerId::new("a")]);
        sync.teardown().await;
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_layer() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();
        repo.insert_remote(marker("b", 2.0, 2.0));
        repo.fail_list.store(true, Ordering::SeqCst);

        assert!(sync.refresh().await.unwrap_err().is_transport());
        assert_eq!(rendered_ids(&sync), vec![MarkerId::new("a")]);

        repo.fail_list.store(false, Ordering::SeqCst);
        sync.refresh().await.unwrap();
        assert_eq!(rendered_ids(&sync), vec![MarkerId::new("a"), MarkerId::new("b")]);
        sync.teardown().await;
    }

    #[tokio::test]
    async fn queued_refreshes_coalesce() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 1);

        let (a, b, c, d) = tokio::join!(sync.refresh(), sync.refresh(), sync.refresh(), sync.refresh());

        for r in [a, b, c, d] {
            assert_eq!(r.unwrap().diff.total, 1);
        }
        assert_eq!(repo.list_calls.load(Ordering::SeqCst), 2);
        sync.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_gestures_publish_only_whole_states() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0), marker("b", 2.0, 2.0)]);
        repo.set_list_delay(Duration::from_millis(50));
        sync.start().await.unwrap();

        let mut snapshots = sync.view().subscribe_markers();
        let watcher = tokio::spawn(async move {
            let gone = MarkerId::new("a");
            let mut seen = Vec::new();
            while let Some(snap) = snapshots.changed().await {
                let ids = snap.ids();
                let settled = ids.len() == 2 && !ids.contains(&gone);
                seen.push(ids);
                if settled {
                    break;
                }
            }
            seen
        });

        let (created, deleted) = tokio::join!(
            sync.click(3.0, 3.0),
            sync.delete(DeleteRequest::new(MarkerId::new("a")))
        );
        let created = created.unwrap().id;
        deleted.unwrap();

        let a = MarkerId::new("a");
        let b = MarkerId::new("b");
        let valid = [
            vec![a.clone(), b.clone(), created.clone()],
            vec![b.clone()],
            vec![b.clone(), created.clone()],
        ];
        for ids in watcher.await.unwrap() {
            assert!(valid.contains(&ids), "half-applied layer published: {ids:?}");
        }
        assert_eq!(rendered_ids(&sync), vec![b, created]);
        sync.teardown().await;
    }

    #[tokio::test]
    async fn gestures_after_teardown_fail_with_view_closed() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();
        sync.teardown().await;

        assert_eq!(sync.click(1.0, 1.0).await.unwrap_err(), CoreError::ViewClosed);
        assert_eq!(sync.refresh().await.unwrap_err(), CoreError::ViewClosed);
        assert_eq!(*sync.state().borrow(), SyncState::Closed);
        assert_eq!(repo.ids(), vec![MarkerId::new("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_discards_in_flight_reconciliation() {
        let (repo, sync) = setup(vec![marker("a", 1.0, 1.0)]);
        sync.start().await.unwrap();
        repo.insert_remote(marker("b", 2.0, 2.0));
        repo.set_list_delay(Duration::from_secs(5));

        let pending = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.refresh().await })
        };
        tokio::task::yield_now().await;
        sync.teardown().await;

        assert_eq!(pending.await.unwrap().unwrap_err(), CoreError::ViewClosed);
        assert_eq!(rendered_ids(&sync), vec![MarkerId::new("a")]);
    }
}
