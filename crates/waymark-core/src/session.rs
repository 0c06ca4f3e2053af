// ── Map session ──
//
// One open map: the view state, the marker sync engine writing its marker
// layer, and the location reporter writing its self marker.

use std::sync::Arc;

use tracing::info;

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::DeviceId;
use crate::reporter::{LocationReporter, PositionSource};
use crate::repository::{HttpRepository, LocationRepository, MarkerRepository};
use crate::store::MapViewState;
use crate::sync::{MapViewSync, Reconciliation};

pub struct MapSession<M: MarkerRepository, L: LocationRepository> {
    view: Arc<MapViewState>,
    sync: MapViewSync<M>,
    reporter: LocationReporter<L>,
}

impl MapSession<HttpRepository, HttpRepository> {
    /// A session against the REST service described by `config`.
    pub fn connect(config: &SyncConfig, device_id: DeviceId) -> Result<Self, CoreError> {
        let repo = Arc::new(HttpRepository::new(config)?);
        Ok(Self::new(Arc::clone(&repo), repo, device_id, config))
    }
}

impl<M: MarkerRepository, L: LocationRepository> MapSession<M, L> {
    pub fn new(markers: Arc<M>, locations: Arc<L>, device_id: DeviceId, config: &SyncConfig) -> Self {
        let view = Arc::new(MapViewState::new(config.initial_view));
        let sync = MapViewSync::with_marker_type(
            markers,
            Arc::clone(&view),
            config.click_marker_type.clone(),
        );
        let reporter = LocationReporter::new(locations, device_id, Arc::clone(&view));
        Self {
            view,
            sync,
            reporter,
        }
    }

    pub fn view(&self) -> &Arc<MapViewState> {
        &self.view
    }

    pub fn sync(&self) -> &MapViewSync<M> {
        &self.sync
    }

    pub fn reporter(&self) -> &LocationReporter<L> {
        &self.reporter
    }

    /// Start marker sync and load the initial marker set.
    pub async fn open(&self) -> Result<Reconciliation, CoreError> {
        let result = self.sync.start().await;
        if let Ok(r) = &result {
            info!(markers = r.diff.total, "map session opened");
        }
        result
    }

    /// Start live location reporting from `source`.
    pub async fn track<S: PositionSource>(&self, source: S) -> Result<(), CoreError> {
        self.reporter.start(source).await
    }

    /// Stop reporting, then stop marker sync.
    pub async fn close(&self) {
        self.reporter.stop().await;
        self.sync.teardown().await;
        info!("map session closed");
    }
}
