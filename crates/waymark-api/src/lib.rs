// waymark-api: Async Rust client for the waymark marker/location REST API

pub mod client;
pub mod error;
mod locations;
mod markers;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
