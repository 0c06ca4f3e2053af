// ── Remote store seams ──
//
// The sync engine and reporter talk to these traits, never to HTTP
// directly. `HttpRepository` implements both against the REST service;
// tests substitute in-memory fakes.

mod http;

use std::future::Future;

use crate::error::CoreError;
use crate::model::{
    DeviceId, DeviceLocation, LocationReport, Marker, MarkerDraft, MarkerId, MarkerPatch,
};

pub use http::HttpRepository;

/// CRUD access to the shared marker collection.
pub trait MarkerRepository: Send + Sync + 'static {
    /// Every stored marker, in server order.
    fn list(&self) -> impl Future<Output = Result<Vec<Marker>, CoreError>> + Send;

    /// Persist a new marker; the returned value carries the server id.
    fn create(&self, draft: &MarkerDraft) -> impl Future<Output = Result<Marker, CoreError>> + Send;

    fn update(
        &self,
        id: &MarkerId,
        patch: &MarkerPatch,
    ) -> impl Future<Output = Result<Marker, CoreError>> + Send;

    /// Fails with `NotFound` when the id no longer exists.
    fn remove(&self, id: &MarkerId) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Append-only store of device position reports.
pub trait LocationRepository: Send + Sync + 'static {
    fn publish(&self, report: &LocationReport)
    -> impl Future<Output = Result<(), CoreError>> + Send;

    /// All reports for one device, oldest first.
    fn history(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceLocation>, CoreError>> + Send;

    /// Most recent report per device.
    fn latest(&self) -> impl Future<Output = Result<Vec<DeviceLocation>, CoreError>> + Send;
}
