//! Single-shot season timeout.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;

/// A cancellable one-shot timer.
///
/// Every arm and disarm bumps a generation. A fire carries the generation it
/// was armed with and must [`claim`](Countdown::claim) it before acting, so a
/// timer that was replaced or cancelled while its task was waking up does
/// nothing.
#[derive(Debug, Default)]
pub(crate) struct Countdown {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Cancel any armed timer and start a new one. `on_fire` receives the
    /// generation to claim. Must run inside a tokio runtime.
    ///
    /// A panic in `on_fire` aborts the process.
    pub(crate) fn arm<F, Fut>(&mut self, timeout: Duration, on_fire: F)
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if AssertUnwindSafe(on_fire(generation))
                .catch_unwind()
                .await
                .is_err()
            {
                tracing::error!(generation, "timeout handler panicked; aborting");
                std::process::abort();
            }
        }));
    }

    /// Cancel the armed timer, if any. Safe to call at any time. Returns
    /// whether a timer was pending.
    pub(crate) fn disarm(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Take ownership of a fire. `false` means the fire is stale.
    ///
    /// A claimed fire detaches its task, so a disarm issued from inside the
    /// timeout handler doesn't abort the handler itself.
    pub(crate) fn claim(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.generation = self.generation.wrapping_add(1);
        self.task = None;
        true
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}
