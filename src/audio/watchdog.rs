use std::{future::Future, time::Duration};
use tokio::task::JoinHandle;
use tracing::debug;

/// Single cancellable inactivity timer owned by a session.
///
/// Every arm gets a fresh epoch. The fire callback receives that epoch and
/// must [`claim`](Self::claim) it before acting, so a timer that lost a race
/// with `cancel` or a re-arm does nothing.
#[derive(Debug, Default)]
pub struct InactivityWatchdog {
    pending: Option<JoinHandle<()>>,
    epoch: u64,
}

impl InactivityWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending timer with one that calls `on_fire` after `after`.
    pub fn arm<F, Fut>(&mut self, after: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        self.epoch += 1;
        let epoch = self.epoch;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_fire(epoch).await;
        }));

        debug!("⏲️ Inactivity timer #{} armed for {:?}", epoch, after);
        epoch
    }

    /// Drops the pending timer, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                debug!("⏲️ Inactivity timer #{} cancelled", self.epoch);
                true
            }
            None => false,
        }
    }

    /// Consumes the pending timer from inside its own fire callback.
    ///
    /// Does not abort the task, since the caller is that task.
    pub fn claim(&mut self, epoch: u64) -> bool {
        if self.pending.is_some() && self.epoch == epoch {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for InactivityWatchdog {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
