// REST-backed marker and location repositories.

use tracing::{debug, warn};
use waymark_api::ApiClient;
use waymark_api::types::{LocationCreate, MarkerCreate, MarkerUpdate, Record};

use super::{LocationRepository, MarkerRepository};
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::model::{
    DeviceId, DeviceLocation, LocationReport, Marker, MarkerDraft, MarkerId, MarkerPatch,
};

/// Both repositories over one shared [`ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: ApiClient,
}

impl HttpRepository {
    pub fn new(config: &SyncConfig) -> Result<Self, CoreError> {
        let client = ApiClient::new(config.api_url.as_str(), &config.transport())?;
        Ok(Self { client })
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

/// Server records that fail to decode or validate are dropped, not surfaced.
fn convert_all<W, T>(records: Vec<Record<W>>, kind: &str) -> Vec<T>
where
    T: TryFrom<W, Error = CoreError>,
{
    let total = records.len();
    let converted: Vec<T> = records
        .into_iter()
        .filter_map(|r| match r {
            Record::Valid(w) => match T::try_from(w) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(kind, error = %e, "skipping invalid record from server");
                    None
                }
            },
            Record::Invalid { reason, .. } => {
                warn!(kind, error = %reason, "skipping undecodable record from server");
                None
            }
        })
        .collect();
    if converted.len() != total {
        debug!(kind, total, kept = converted.len(), "dropped invalid records");
    }
    converted
}

fn malformed(e: &CoreError) -> CoreError {
    CoreError::Transport {
        message: format!("server returned an invalid marker: {e}"),
        status: None,
    }
}

impl MarkerRepository for HttpRepository {
    async fn list(&self) -> Result<Vec<Marker>, CoreError> {
        let records = self.client.list_markers().await?;
        Ok(convert_all(records, "marker"))
    }

    async fn create(&self, draft: &MarkerDraft) -> Result<Marker, CoreError> {
        draft.validate()?;
        let created = self.client.create_marker(&MarkerCreate::from(draft)).await?;
        Marker::try_from(created).map_err(|e| malformed(&e))
    }

    async fn update(&self, id: &MarkerId, patch: &MarkerPatch) -> Result<Marker, CoreError> {
        patch.validate()?;
        let updated = self
            .client
            .update_marker(id.as_str(), &MarkerUpdate::from(patch))
            .await
            .map_err(|e| CoreError::from(e).for_entity("marker", id.as_str()))?;
        Marker::try_from(updated).map_err(|e| malformed(&e))
    }

    async fn remove(&self, id: &MarkerId) -> Result<(), CoreError> {
        self.client
            .delete_marker(id.as_str())
            .await
            .map_err(|e| CoreError::from(e).for_entity("marker", id.as_str()))
    }
}

impl LocationRepository for HttpRepository {
    async fn publish(&self, report: &LocationReport) -> Result<(), CoreError> {
        self.client
            .save_location(&LocationCreate::from(report))
            .await?;
        Ok(())
    }

    async fn history(&self, device_id: &DeviceId) -> Result<Vec<DeviceLocation>, CoreError> {
        let records = self
            .client
            .location_history(device_id.as_str())
            .await
            .map_err(|e| CoreError::from(e).for_entity("device", device_id.as_str()))?;
        Ok(convert_all(records, "location"))
    }

    async fn latest(&self) -> Result<Vec<DeviceLocation>, CoreError> {
        let records = self.client.latest_locations().await?;
        Ok(convert_all(records, "location"))
    }
}
