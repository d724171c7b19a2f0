//! Single-slot rebuild trigger.
//!
//! Watcher callbacks must never block or touch the filesystem; they collapse
//! every create/delete burst into at most one pending signal. A full slot
//! means a rebuild is already queued and the new event is covered by it.

use tokio::sync::mpsc;

/// Sending half of the trigger: non-blocking and coalescing.
#[derive(Debug, Clone)]
pub struct RebuildTrigger {
    tx: mpsc::Sender<()>,
}

impl RebuildTrigger {
    /// Request a rebuild. A no-op when one is already pending.
    pub fn notify(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Create the trigger and its consumer side. Capacity is fixed at one slot.
pub fn trigger_channel() -> (RebuildTrigger, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (RebuildTrigger { tx }, rx)
}
