//! Testing utilities for games built on flix.
//!
//! - [`HistoryProbe`] captures the history a controller delivers
//! - [`Gate`] holds an episode mid-watch until the test lets it go
//! - [`NotificationRecorder`] stands in for the controller when driving an
//!   [`EpisodeSequencer`](flix_core::EpisodeSequencer) directly
//!
//! ```ignore
//! let controller = SeriesController::new(MyGame);
//! let probe = HistoryProbe::attach(&controller);
//! let remote = controller.begin(Arc::new(Screen), Settings::default()).await;
//! remote.stop_watch_now().await;
//! let history = probe.delivered().await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use flix_core::{
    History, SeasonNumber, SeasonTimer, SequenceOwner, Series, SeriesController, WatchEvent,
};
use tokio::sync::{oneshot, Semaphore};

/// Captures the history a controller delivers.
pub struct HistoryProbe {
    rx: oneshot::Receiver<History>,
    deliveries: Arc<AtomicUsize>,
}

impl HistoryProbe {
    /// Register the probe as `controller`'s history sink.
    pub fn attach<S: Series>(controller: &SeriesController<S>) -> Self {
        let (probe, sink) = Self::new();
        controller.on_history(sink);
        probe
    }

    /// A probe and the sink that feeds it, for use with
    /// [`SeriesBuilder::on_history`](flix_core::SeriesBuilder::on_history).
    pub fn new() -> (Self, impl FnOnce(History) + Send + 'static) {
        let (tx, rx) = oneshot::channel();
        let deliveries = Arc::new(AtomicUsize::new(0));
        let counter = deliveries.clone();
        let sink = move |history| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(history);
        };
        (Self { rx, deliveries }, sink)
    }

    /// How many times the sink ran.
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    pub fn is_delivered(&self) -> bool {
        self.deliveries() > 0
    }

    /// Wait for the history.
    pub async fn delivered(self) -> Result<History> {
        self.rx
            .await
            .context("the controller was dropped before the series ended")
    }

    /// Wait for the history, giving up after `limit`.
    pub async fn delivered_within(self, limit: Duration) -> Result<History> {
        tokio::time::timeout(limit, self.delivered())
            .await
            .map_err(|_| anyhow!("no history delivered within {limit:?}"))?
    }
}

/// Entries of `history` carrying `tag`, in order.
pub fn tagged<'a>(history: &'a History, tag: &str) -> Vec<&'a WatchEvent> {
    history.iter().filter(|event| event.tag() == tag).collect()
}

/// Locations of the entries carrying `tag`, in order.
pub fn locations_of<'a>(history: &'a History, tag: &str) -> Vec<&'a str> {
    tagged(history, tag)
        .into_iter()
        .map(WatchEvent::location)
        .collect()
}

/// Holds an episode mid-watch until the test opens it.
///
/// Each [`open`](Gate::open) lets exactly one waiter through.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wait(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }

    pub fn open(&self) {
        self.permits.add_permits(1);
    }
}

/// Gates compare equal so an episode carrying one still matches its season.
impl PartialEq for Gate {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// One call a sequencer made on its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SeasonStarted(usize),
    SeasonEnded(usize),
    PresentedStart(SeasonNumber),
    PresentedEnd(SeasonNumber),
    TimerArmed(usize),
    TimerDisarmed,
    Recorded { round: usize, tag: String },
    SequenceEnded,
}

/// A [`SequenceOwner`] that writes down every call and does nothing else.
#[derive(Debug)]
pub struct NotificationRecorder {
    notices: Mutex<Vec<Notice>>,
    timer: SeasonTimer,
}

impl NotificationRecorder {
    /// `timer` is what every start presentation answers.
    pub fn new(timer: SeasonTimer) -> Arc<Self> {
        Arc::new(Self {
            notices: Mutex::new(Vec::new()),
            timer,
        })
    }

    /// The handle an [`EpisodeSequencer`](flix_core::EpisodeSequencer) takes.
    pub fn owner<S: Series>(self: &Arc<Self>) -> Weak<dyn SequenceOwner<S>> {
        let weak: Weak<Self> = Arc::downgrade(self);
        weak
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    /// Tags recorded so far, in order.
    pub fn recorded(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|notice| match notice {
                Notice::Recorded { tag, .. } => Some(tag.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Notice) -> bool) -> usize {
        self.lock().iter().filter(|notice| matches(notice)).count()
    }

    fn push(&self, notice: Notice) {
        self.lock().push(notice);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<S: Series> SequenceOwner<S> for NotificationRecorder {
    fn season_started(&self, round: usize, _season: SeasonNumber) {
        self.push(Notice::SeasonStarted(round));
    }

    fn season_ended(&self, round: usize, _season: SeasonNumber) {
        self.push(Notice::SeasonEnded(round));
    }

    async fn present_season_start(
        &self,
        season: SeasonNumber,
        _screen: &S::Screen,
        _settings: &S::Settings,
    ) -> SeasonTimer {
        self.push(Notice::PresentedStart(season));
        self.timer
    }

    async fn present_season_end(
        &self,
        season: SeasonNumber,
        _screen: &S::Screen,
        _settings: &S::Settings,
    ) {
        self.push(Notice::PresentedEnd(season));
    }

    fn arm_timer(&self, round: usize) {
        self.push(Notice::TimerArmed(round));
    }

    fn disarm_timer(&self) {
        self.push(Notice::TimerDisarmed);
    }

    fn record(&self, round: usize, event: WatchEvent) {
        self.push(Notice::Recorded {
            round,
            tag: event.tag().to_string(),
        });
    }

    fn sequence_ended(&self) {
        self.push(Notice::SequenceEnded);
    }
}
