//! Scoped preview resources.

use std::fmt;
use std::sync::Arc;

use bridge_traits::PreviewProvider;
use tracing::trace;

/// Owns one preview acquired from a [`PreviewProvider`] and releases it when
/// dropped.
///
/// A queued job holds its handle for as long as it is in the queue, so every
/// way out of the queue (removal, clearing, eviction after completion, or
/// dropping the queue itself) releases the preview exactly once.
pub struct PreviewHandle {
    locator: String,
    provider: Arc<dyn PreviewProvider>,
}

impl PreviewHandle {
    pub(crate) fn new(locator: String, provider: Arc<dyn PreviewProvider>) -> Self {
        Self { locator, provider }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        trace!(locator = %self.locator, "Releasing preview");
        self.provider.release(&self.locator);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("locator", &self.locator)
            .finish()
    }
}
