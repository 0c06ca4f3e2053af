// ── Position sources ──
//
// A source is subscribed once and yields fixes (or sensor errors) until
// the stream is dropped. Dropping the stream releases the subscription.

use std::pin::Pin;

use futures_core::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::PositionFix;

const CHANNEL_SOURCE_SIZE: usize = 16;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("timed out waiting for a position fix")]
    Timeout,
}

pub type PositionStream = Pin<Box<dyn Stream<Item = Result<PositionFix, SensorError>> + Send>>;

/// Something that can produce a live stream of position fixes.
pub trait PositionSource {
    /// Begin watching. Consumes the source: a subscription is single-use.
    fn subscribe(self) -> Result<PositionStream, SensorError>;
}

// ── Channel-fed source ───────────────────────────────────────────────

/// Feeding half of a [`ChannelPositionSource`].
#[derive(Debug, Clone)]
pub struct PositionSender {
    tx: mpsc::Sender<Result<PositionFix, SensorError>>,
}

impl PositionSender {
    /// Returns `false` once the reporter has released the subscription.
    pub async fn send_fix(&self, fix: PositionFix) -> bool {
        self.tx.send(Ok(fix)).await.is_ok()
    }

    pub async fn send_error(&self, error: SensorError) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }

    /// The reporter dropped the stream.
    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A source whose samples are pushed in through a [`PositionSender`].
#[derive(Debug)]
pub struct ChannelPositionSource {
    rx: mpsc::Receiver<Result<PositionFix, SensorError>>,
}

impl ChannelPositionSource {
    pub fn new() -> (PositionSender, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_SOURCE_SIZE);
        (PositionSender { tx }, Self { rx })
    }
}

impl PositionSource for ChannelPositionSource {
    fn subscribe(self) -> Result<PositionStream, SensorError> {
        let mut rx = self.rx;
        Ok(Box::pin(async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }))
    }
}

/// A source that refuses every subscription.
#[derive(Debug, Clone)]
pub struct UnavailablePositionSource(pub SensorError);

impl PositionSource for UnavailablePositionSource {
    fn subscribe(self) -> Result<PositionStream, SensorError> {
        Err(self.0)
    }
}
