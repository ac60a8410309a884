use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct CopyState {
    ticket: u64,
    revert: Option<JoinHandle<()>>,
}

/// Transient "copied" acknowledgment for one message at a time. Each copy
/// restarts the window; when it elapses the indicator clears itself.
#[derive(Clone)]
pub struct CopyIndicator {
    hold: Duration,
    state: Arc<Mutex<CopyState>>,
    tx: Arc<watch::Sender<Option<usize>>>,
}

impl CopyIndicator {
    pub fn new(hold: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            hold,
            state: Arc::new(Mutex::new(CopyState {
                ticket: 0,
                revert: None,
            })),
            tx: Arc::new(tx),
        }
    }

    fn lock(state: &Mutex<CopyState>) -> MutexGuard<'_, CopyState> {
        state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn copied(&self) -> Option<usize> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<usize>> {
        self.tx.subscribe()
    }

    pub fn acknowledge(&self, index: usize) {
        let mut state = Self::lock(&self.state);
        state.ticket += 1;
        let ticket = state.ticket;
        if let Some(old) = state.revert.take() {
            old.abort();
        }
        self.tx.send_replace(Some(index));

        let weak: Weak<Mutex<CopyState>> = Arc::downgrade(&self.state);
        let tx = self.tx.clone();
        let hold = self.hold;
        state.revert = Some(tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let state = Self::lock(&shared);
            if state.ticket == ticket {
                tx.send_replace(None);
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn clears_after_hold() {
        let indicator = CopyIndicator::new(Duration::from_secs(2));
        indicator.acknowledge(3);
        assert_eq!(indicator.copied(), Some(3));

        sleep(Duration::from_millis(1900)).await;
        assert_eq!(indicator.copied(), Some(3));
        sleep(Duration::from_millis(200)).await;
        assert_eq!(indicator.copied(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_copy_restarts_window() {
        let indicator = CopyIndicator::new(Duration::from_secs(2));
        indicator.acknowledge(1);
        sleep(Duration::from_millis(1500)).await;
        indicator.acknowledge(5);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(indicator.copied(), Some(5));
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(indicator.copied(), None);
    }
}
