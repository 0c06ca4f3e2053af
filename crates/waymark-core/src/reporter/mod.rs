// ── Live location reporting ──
//
// Subscribes to a position source, publishes every fix to the location
// store, and moves the self marker once the store has accepted it. The
// self marker and viewport are written only from the reporting task.

mod source;

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{DeviceId, LocationReport};
use crate::repository::LocationRepository;
use crate::store::MapViewState;

pub use source::{
    ChannelPositionSource, PositionSender, PositionSource, PositionStream, SensorError,
    UnavailablePositionSource,
};

/// Reporter lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    /// Subscribed; no fix published yet.
    Watching,
    /// At least one fix published.
    Reporting { published: u64 },
    /// The sensor reported a failure; no samples are flowing.
    Unavailable { reason: String },
    Stopped,
}

pub struct LocationReporter<L: LocationRepository> {
    inner: Arc<ReporterInner<L>>,
}

impl<L: LocationRepository> Clone for LocationReporter<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ReporterInner<L> {
    repo: Arc<L>,
    device_id: DeviceId,
    view: Arc<MapViewState>,
    state: watch::Sender<ReporterState>,
    processed: watch::Sender<u64>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<L: LocationRepository> LocationReporter<L> {
    pub fn new(repo: Arc<L>, device_id: DeviceId, view: Arc<MapViewState>) -> Self {
        let (state, _) = watch::channel(ReporterState::Idle);
        let (processed, _) = watch::channel(0);
        Self {
            inner: Arc::new(ReporterInner {
                repo,
                device_id,
                view,
                state,
                processed,
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.inner.device_id
    }

    pub fn state(&self) -> watch::Receiver<ReporterState> {
        self.inner.state.subscribe()
    }

    /// Count of sensor samples fully handled so far: fixes whose publish
    /// finished (either way) plus sensor errors.
    pub fn processed(&self) -> watch::Receiver<u64> {
        self.inner.processed.subscribe()
    }

    /// Subscribe to `source` and start reporting in the background.
    ///
    /// A reporter starts at most once. When the source refuses the
    /// subscription the failure is returned as
    /// [`CoreError::SensorUnavailable`] and the reporter stays idle for
    /// good.
    pub async fn start<S: PositionSource>(&self, source: S) -> Result<(), CoreError> {
        let mut task = self.inner.task.lock().await;

        let current = self.inner.state.borrow().clone();
        match current {
            ReporterState::Idle => {}
            ReporterState::Stopped => {
                return Err(CoreError::InvalidState {
                    message: "location reporter was stopped and cannot be restarted".into(),
                });
            }
            ReporterState::Unavailable { reason } if task.is_none() => {
                return Err(CoreError::SensorUnavailable { reason });
            }
            _ => {
                return Err(CoreError::InvalidState {
                    message: "location reporter is already running".into(),
                });
            }
        }

        let stream = match source.subscribe() {
            Ok(stream) => stream,
            Err(e) => {
                let reason = e.to_string();
                warn!(error = %e, "cannot watch position; location reporting disabled");
                self.inner.state.send_replace(ReporterState::Unavailable {
                    reason: reason.clone(),
                });
                return Err(CoreError::SensorUnavailable { reason });
            }
        };

        self.inner.state.send_replace(ReporterState::Watching);
        *task = Some(tokio::spawn(reporting_task(Arc::clone(&self.inner), stream)));
        info!(device_id = %self.inner.device_id, "location reporting started");
        Ok(())
    }

    /// Stop reporting. Safe to call at any time, including before `start`.
    ///
    /// The sensor subscription is released immediately. A publish already
    /// in flight completes, but its result is not applied to the map; this
    /// call returns once that request has settled, which the transport
    /// timeout bounds.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let mut task = self.inner.task.lock().await;
        if let Some(handle) = task.take() {
            let _ = handle.await;
        }
        self.inner.state.send_replace(ReporterState::Stopped);
        debug!("location reporter stopped");
    }
}

// ── Reporting task ───────────────────────────────────────────────────

async fn reporting_task<L: LocationRepository>(inner: Arc<ReporterInner<L>>, mut stream: PositionStream) {
    let cancel = inner.cancel.clone();
    let mut published: u64 = 0;
    let mut outage = false;

    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = stream.next() => item,
        };
        let Some(item) = item else {
            info!("position stream ended");
            break;
        };

        let fix = match item {
            Ok(fix) => fix,
            Err(e) => {
                if !outage {
                    warn!(error = %e, "position unavailable");
                    inner.state.send_replace(ReporterState::Unavailable {
                        reason: e.to_string(),
                    });
                    outage = true;
                }
                inner.processed.send_modify(|n| *n += 1);
                continue;
            }
        };
        if outage {
            info!("position fixes resumed");
            outage = false;
            inner.state.send_replace(if published == 0 {
                ReporterState::Watching
            } else {
                ReporterState::Reporting { published }
            });
        }

        let report = LocationReport {
            device_id: inner.device_id.clone(),
            position: fix.position,
        };
        let publish = inner.repo.publish(&report);
        tokio::pin!(publish);
        let result = tokio::select! {
            biased;
            result = &mut publish => result,
            () = cancel.cancelled() => {
                // Release the sensor first; the request itself still settles.
                drop(stream);
                debug!("reporter stopped during publish; discarding sample");
                let _ = publish.await;
                inner.state.send_replace(ReporterState::Stopped);
                return;
            }
        };
        if cancel.is_cancelled() {
            debug!("reporter stopped during publish; discarding sample");
            break;
        }

        match result {
            Ok(()) => {
                published += 1;
                inner.view.place_self_marker(&fix);
                inner
                    .state
                    .send_replace(ReporterState::Reporting { published });
                debug!(position = %fix.position, published, "location published");
            }
            Err(e) => {
                warn!(error = %e, position = %fix.position, "location publish failed; waiting for next fix");
            }
        }
        inner.processed.send_modify(|n| *n += 1);
    }

    // Release the sensor before reporting the stop.
    drop(stream);
    inner.state.send_replace(ReporterState::Stopped);
}
