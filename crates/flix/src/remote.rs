//! The screen's side of the wire.

use std::sync::Weak;

use tracing::debug;

use crate::controller::{SeriesController, Shared};
use crate::sequencer::Dispatch;
use crate::series::Series;
use crate::watch_event::WatchEvent;

/// Non-owning handle a screen keeps to report to its controller.
///
/// Once the controller is dropped every call is a no-op, so a screen that
/// outlives its series never touches a torn-down owner.
pub struct Remote<S: Series> {
    shared: Weak<Shared<S>>,
}

impl<S: Series> Clone for Remote<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S: Series> Remote<S> {
    pub(crate) fn new(shared: Weak<Shared<S>>) -> Self {
        Self { shared }
    }

    fn controller(&self) -> Option<SeriesController<S>> {
        let controller = self.shared.upgrade().map(SeriesController::from_shared);
        if controller.is_none() {
            debug!("remote call dropped; the series is gone");
        }
        controller
    }

    /// The screen is ready: start the first season.
    pub async fn start_watch_now(&self) {
        if let Some(controller) = self.controller() {
            controller.start_watch_now().await;
        }
    }

    /// The screen wants out: skip to the end.
    pub async fn stop_watch_now(&self) {
        if let Some(controller) = self.controller() {
            controller.stop_watch_now().await;
        }
    }

    /// A viewer raised `episode`. `None` if the series is gone.
    pub async fn watch(
        &self,
        viewer: &S::Viewer,
        episode: &S::Episode,
        data: WatchEvent,
    ) -> Option<Dispatch> {
        let controller = self.controller()?;
        Some(controller.receive(viewer, episode, data).await)
    }

    /// Log something that didn't raise an episode.
    pub fn record(&self, data: WatchEvent) {
        if let Some(controller) = self.controller() {
            controller.record_external(data);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.strong_count() > 0
    }
}
