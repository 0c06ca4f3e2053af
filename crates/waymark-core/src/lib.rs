// waymark-core: Marker synchronization and live location reporting between
// waymark-api and consumers (CLI, map widgets).

pub mod config;
pub mod convert;
pub mod error;
pub mod identity;
pub mod model;
pub mod reporter;
pub mod repository;
pub mod session;
pub mod store;
pub mod stream;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_API_URL, SyncConfig, TlsVerification};
pub use error::CoreError;
pub use identity::{DeviceIdentity, FileIdentityStore, IdentityStore, MemoryIdentityStore};
pub use reporter::{
    ChannelPositionSource, LocationReporter, PositionSender, PositionSource, ReporterState,
    SensorError,
};
pub use repository::{HttpRepository, LocationRepository, MarkerRepository};
pub use session::MapSession;
pub use store::{DeleteRequest, MapViewState, MarkerSnapshot, RenderedMarker, SelfMarker};
pub use stream::ViewStream;
pub use sync::{MapViewSync, Reconciliation, SyncState};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Coordinates, DeviceId, DeviceLocation, LocationReport, Marker, MarkerDraft, MarkerId,
    MarkerPatch, MarkerType, PositionFix, Viewport,
};
