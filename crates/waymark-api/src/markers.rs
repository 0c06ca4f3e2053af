// Marker endpoints: /api/markers

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{MarkerCreate, MarkerResponse, MarkerUpdate, Record};

impl ApiClient {
    /// `GET /markers`: the complete current marker set. Elements are
    /// decoded one by one; see [`Record`].
    pub async fn list_markers(&self) -> Result<Vec<Record<MarkerResponse>>, Error> {
        let url = self.url(&["markers"])?;
        self.get(url).await
    }

    /// `POST /markers`: returns the stored marker with its assigned id.
    pub async fn create_marker(&self, body: &MarkerCreate) -> Result<MarkerResponse, Error> {
        let url = self.url(&["markers"])?;
        self.post(url, body).await
    }

    /// `PUT /markers/:id`: partial update.
    pub async fn update_marker(
        &self,
        id: &str,
        body: &MarkerUpdate,
    ) -> Result<MarkerResponse, Error> {
        let url = self.url(&["markers", id])?;
        self.put(url, body).await
    }

    /// `DELETE /markers/:id`. The acknowledgment body is discarded.
    pub async fn delete_marker(&self, id: &str) -> Result<(), Error> {
        let url = self.url(&["markers", id])?;
        self.delete(url).await
    }
}
