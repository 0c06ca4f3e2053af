// ── Reactive view streams ──
//
// Subscription handles over `MapViewState` channels.

use tokio::sync::watch;

/// A subscription to one piece of map view state.
///
/// Point-in-time snapshot access plus change notification via
/// [`changed`](Self::changed).
pub struct ViewStream<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> ViewStream<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value captured at creation or at the last `changed()`.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Wait for the next change, returning the new value.
    /// Returns `None` once the view state has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }
}
