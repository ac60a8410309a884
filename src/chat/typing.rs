use std::time::Duration;
use tokio::task::JoinHandle;

/// A one-shot callback scheduled after a delay, cancellable until it runs.
/// Dropping the handle cancels it too.
#[derive(Debug)]
pub struct DelayedTask {
    handle: JoinHandle<()>,
    cancelled: bool,
}

impl DelayedTask {
    pub fn arm<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self {
            handle,
            cancelled: false,
        }
    }

    pub fn cancel(&mut self) {
        self.handle.abort();
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
