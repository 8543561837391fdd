//! Notifier that writes user-facing messages to the log.

use bridge_traits::notify::Notifier;
use tracing::{error, info};

/// Desktop notifier without a UI surface; messages go to `tracing` under the
/// `notification` target so hosts can route them.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(target: "notification", kind = "success", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "notification", kind = "error", "{message}");
    }

    fn info(&self, message: &str) {
        info!(target: "notification", kind = "info", "{message}");
    }
}
