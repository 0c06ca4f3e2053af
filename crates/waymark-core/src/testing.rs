// In-memory repositories for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::CoreError;
use crate::model::{
    Coordinates, DeviceId, DeviceLocation, LocationReport, Marker, MarkerDraft, MarkerId,
    MarkerPatch, MarkerType,
};
use crate::repository::{LocationRepository, MarkerRepository};

fn offline() -> CoreError {
    CoreError::Transport {
        message: "connection refused".into(),
        status: None,
    }
}

pub(crate) fn marker(id: &str, lat: f64, lng: f64) -> Marker {
    Marker {
        id: MarkerId::new(id),
        title: format!("Marker {id}"),
        description: None,
        position: Coordinates::new(lat, lng).unwrap_or(crate::model::DEFAULT_CENTER),
        marker_type: MarkerType::Custom,
        created_at: None,
        updated_at: None,
    }
}

// ── Markers ──────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct FakeMarkers {
    markers: Mutex<Vec<Marker>>,
    next_id: AtomicU64,
    pub fail_list: AtomicBool,
    pub fail_create: AtomicBool,
    pub list_calls: AtomicUsize,
    list_delay: Mutex<Option<Duration>>,
}

impl FakeMarkers {
    pub(crate) fn with(markers: Vec<Marker>) -> Self {
        Self {
            markers: Mutex::new(markers),
            ..Self::default()
        }
    }

    pub(crate) fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().expect("lock") = Some(delay);
    }

    pub(crate) fn ids(&self) -> Vec<MarkerId> {
        self.markers
            .lock()
            .expect("lock")
            .iter()
            .map(|m| m.id.clone())
            .collect()
    }

    /// Mutate the store behind the sync engine's back (another client).
    pub(crate) fn insert_remote(&self, marker: Marker) {
        self.markers.lock().expect("lock").push(marker);
    }
}

impl MarkerRepository for FakeMarkers {
    async fn list(&self) -> Result<Vec<Marker>, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(self.markers.lock().expect("lock").clone())
    }

    async fn create(&self, draft: &MarkerDraft) -> Result<Marker, CoreError> {
        draft.validate()?;
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let marker = Marker {
            id: MarkerId::new(format!("srv-{n}")),
            title: draft.title.clone(),
            description: draft.description.clone(),
            position: draft.position,
            marker_type: draft.marker_type.clone(),
            created_at: None,
            updated_at: None,
        };
        self.markers.lock().expect("lock").push(marker.clone());
        Ok(marker)
    }

    async fn update(&self, id: &MarkerId, patch: &MarkerPatch) -> Result<Marker, CoreError> {
        patch.validate()?;
        let mut markers = self.markers.lock().expect("lock");
        let marker = markers
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "marker".into(),
                identifier: id.to_string(),
            })?;
        if let Some(title) = &patch.title {
            marker.title.clone_from(title);
        }
        if let Some(position) = patch.position {
            marker.position = position;
        }
        Ok(marker.clone())
    }

    async fn remove(&self, id: &MarkerId) -> Result<(), CoreError> {
        let mut markers = self.markers.lock().expect("lock");
        let before = markers.len();
        markers.retain(|m| &m.id != id);
        if markers.len() == before {
            return Err(CoreError::NotFound {
                entity_type: "marker".into(),
                identifier: id.to_string(),
            });
        }
        Ok(())
    }
}

// ── Locations ────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct FakeLocations {
    published: Mutex<Vec<LocationReport>>,
    pub fail_publish: AtomicBool,
    /// When set, each publish waits for one `notify_one`.
    gate: Option<Notify>,
    pub publish_started: Notify,
}

impl FakeLocations {
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(crate) fn published(&self) -> Vec<LocationReport> {
        self.published.lock().expect("lock").clone()
    }
}

impl LocationRepository for FakeLocations {
    async fn publish(&self, report: &LocationReport) -> Result<(), CoreError> {
        self.publish_started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.published.lock().expect("lock").push(report.clone());
        Ok(())
    }

    async fn history(&self, device_id: &DeviceId) -> Result<Vec<DeviceLocation>, CoreError> {
        Ok(self
            .published()
            .into_iter()
            .filter(|r| &r.device_id == device_id)
            .map(|r| DeviceLocation {
                device_id: r.device_id,
                position: r.position,
                reported_at: None,
            })
            .collect())
    }

    async fn latest(&self) -> Result<Vec<DeviceLocation>, CoreError> {
        Ok(self
            .published()
            .into_iter()
            .last()
            .map(|r| DeviceLocation {
                device_id: r.device_id,
                position: r.position,
                reported_at: None,
            })
            .into_iter()
            .collect())
    }
}
