// Location endpoints: /api/locations

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{LocationCreate, LocationResponse, Record};

impl ApiClient {
    /// `POST /locations`: report one position sample for a device.
    pub async fn save_location(&self, body: &LocationCreate) -> Result<(), Error> {
        let url = self.url(&["locations"])?;
        self.post_no_response(url, body).await
    }

    /// `GET /locations/:deviceId`: every stored report for one device.
    pub async fn location_history(
        &self,
        device_id: &str,
    ) -> Result<Vec<Record<LocationResponse>>, Error> {
        let url = self.url(&["locations", device_id])?;
        self.get(url).await
    }

    /// `GET /locations`: the most recent report of every device.
    pub async fn latest_locations(&self) -> Result<Vec<Record<LocationResponse>>, Error> {
        let url = self.url(&["locations"])?;
        self.get(url).await
    }
}
