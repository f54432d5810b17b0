//! Burst dispatch completion signal
//!
//! A single-slot rendezvous between one burst driver and the loop driver.
//! The notifier is consumed when it fires, so a burst can publish at most one
//! token, and the waiter is consumed when it is awaited.

use tokio::sync::oneshot;

/// Create a connected notifier/waiter pair for one burst
pub fn completion_signal() -> (CompletionNotifier, CompletionWaiter) {
    let (tx, rx) = oneshot::channel();
    (CompletionNotifier { tx }, CompletionWaiter { rx })
}

/// Burst side: fired once every request of the burst has been launched
#[derive(Debug)]
pub struct CompletionNotifier {
    tx: oneshot::Sender<()>,
}

impl CompletionNotifier {
    pub fn notify(self) {
        // The loop driver may have stopped listening; nothing to do then
        let _ = self.tx.send(());
    }
}

/// Loop side: blocks until the burst has finished dispatching
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: oneshot::Receiver<()>,
}

impl CompletionWaiter {
    /// Wait for the token. Returns `false` if the burst went away without
    /// publishing one (e.g. its task panicked), so the caller never blocks
    /// forever.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }
}
