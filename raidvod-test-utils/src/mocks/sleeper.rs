//! Sleeper that returns immediately

use async_trait::async_trait;
use raidvod_core::discovery::Sleeper;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Records requested sleeps without waiting
///
/// Optionally cancels a token once a number of sleeps has been requested,
/// which is how tests end an otherwise endless discovery loop.
#[derive(Default)]
pub struct ManualSleeper {
    sleeps: AtomicUsize,
    durations: Mutex<Vec<Duration>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ManualSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `token` during the `sleeps`-th sleep
    pub fn cancel_after(sleeps: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((sleeps, token)),
            ..Self::default()
        }
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.durations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for ManualSleeper {
    async fn sleep(&self, duration: Duration) {
        self.durations.lock().unwrap().push(duration);
        let count = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((limit, token)) = &self.cancel_after
            && count >= *limit
        {
            token.cancel();
        }
        tokio::task::yield_now().await;
    }
}
