//! The owner of a playthrough.
//!
//! A [`SeriesController`] binds a [`Series`] to a screen and settings, owns
//! the timeout timer and the history, and turns the sequencer's lifecycle
//! notifications into history entries. When the last season ends it repairs
//! timestamp ties and hands the history to its sink, once.
//!
//! ```text
//! Screen ──start_watch_now()──► SeriesController ──start_first_season()──► EpisodeSequencer
//!        ──watch(episode)─────►   │ record(data)  ──dispatch()────────────►   │
//!                                 │◄──────── season_started / ended ─────────┤
//!                                 │◄──────── arm_timer / disarm_timer ───────┤
//!                                 │◄──────── sequence_ended ─────────────────┘
//!                                 ▼
//!                          history sink (History)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use crate::countdown::Countdown;
use crate::error::{fatal, ContractViolation};
use crate::history::{History, SeriesId};
use crate::remote::Remote;
use crate::season::{SeasonNumber, SeasonTimer, SkipMode};
use crate::sequencer::{Dispatch, EpisodeSequencer, SequenceOwner};
use crate::series::{Series, Skipper};
use crate::settings::Settings;
use crate::watch_event::{tags, WatchEvent};

/// Receives the finished history.
pub type HistorySink = Box<dyn FnOnce(History) + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Binding<S: Series> {
    screen: Arc<S::Screen>,
    settings: Arc<S::Settings>,
    sequencer: EpisodeSequencer<S>,
}

pub(crate) struct Shared<S: Series> {
    id: SeriesId,
    series: S,
    me: Weak<Shared<S>>,
    binding: OnceLock<Binding<S>>,
    started: AtomicBool,
    history: Mutex<History>,
    countdown: Mutex<Countdown>,
    sink: Mutex<Option<HistorySink>>,
}

/// Cheap-to-clone handle to one playthrough.
pub struct SeriesController<S: Series> {
    shared: Arc<Shared<S>>,
}

impl<S: Series> Clone for SeriesController<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S: Series> SeriesController<S> {
    pub fn new(series: S) -> Self {
        let id = SeriesId::new();
        let shared = Arc::new_cyclic(|me| Shared {
            id,
            series,
            me: me.clone(),
            binding: OnceLock::new(),
            started: AtomicBool::new(false),
            history: Mutex::new(History::new(id)),
            countdown: Mutex::new(Countdown::default()),
            sink: Mutex::new(None),
        });
        Self { shared }
    }

    pub fn builder(series: S) -> SeriesBuilder<S> {
        SeriesBuilder::new(series)
    }

    pub(crate) fn from_shared(shared: Arc<Shared<S>>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> SeriesId {
        self.shared.id
    }

    pub fn series(&self) -> &S {
        &self.shared.series
    }

    /// Register where the finished history goes. Replaces any earlier sink.
    pub fn on_history(&self, sink: impl FnOnce(History) + Send + 'static) {
        *lock(&self.shared.sink) = Some(Box::new(sink));
    }

    /// Bind a screen and settings and build the seasons.
    ///
    /// Returns the [`Remote`] the screen uses to report to this controller.
    /// Binding twice, or a series with no seasons, is a contract violation.
    pub fn bind(&self, screen: Arc<S::Screen>, settings: S::Settings) -> Remote<S> {
        let seasons = self.shared.series.episodes(&settings);
        let owner: Weak<dyn SequenceOwner<S>> = self.shared.me.clone();
        let binding = Binding {
            screen,
            settings: Arc::new(settings),
            sequencer: EpisodeSequencer::new(seasons, owner),
        };
        let seasons = binding.sequencer.season_count();

        if self.shared.binding.set(binding).is_err() {
            fatal(ContractViolation::AlreadyBound);
        }
        info!(series = %self.shared.id, seasons, "series bound");
        self.remote()
    }

    /// Start the first season of a bound series.
    #[instrument(skip_all, fields(series = %self.shared.id))]
    pub async fn start_watch_now(&self) {
        let binding = self.shared.binding_or_fatal(ContractViolation::Unbound);
        self.shared.started.store(true, Ordering::Release);
        info!("series started");
        binding
            .sequencer
            .start_first_season(&binding.screen, &binding.settings)
            .await;
    }

    /// Bind and start in one step.
    pub async fn begin(&self, screen: Arc<S::Screen>, settings: S::Settings) -> Remote<S> {
        let remote = self.bind(screen, settings);
        self.start_watch_now().await;
        remote
    }

    /// A viewer raised `episode`. If the live season accepts it, `data` is
    /// recorded with the live round prefixed and the episode is watched.
    #[instrument(skip_all, fields(series = %self.shared.id))]
    pub async fn receive(
        &self,
        viewer: &S::Viewer,
        episode: &S::Episode,
        data: WatchEvent,
    ) -> Dispatch {
        let binding = self.shared.started_binding();
        binding
            .sequencer
            .dispatch(
                viewer,
                episode,
                &binding.screen,
                &binding.settings,
                Some(data),
            )
            .await
    }

    /// Log something that didn't raise an episode (a UI action, say).
    pub fn record_external(&self, data: WatchEvent) {
        let binding = self.shared.started_binding();
        self.shared.append(data.in_round(binding.sequencer.round()));
    }

    #[instrument(skip_all, fields(series = %self.shared.id, mode = ?mode))]
    pub async fn skip(&self, mode: SkipMode) {
        self.shared.skip(mode).await;
    }

    /// Skip to the end.
    pub async fn stop_watch_now(&self) {
        self.skip(SkipMode::ToEnd).await;
    }

    /// The history recorded so far. Empty once it has been delivered.
    pub fn history(&self) -> History {
        lock(&self.shared.history).clone()
    }

    /// The live season, once bound.
    pub fn current_season(&self) -> Option<SeasonNumber> {
        self.shared
            .binding
            .get()
            .map(|binding| binding.sequencer.season_number())
    }

    /// Index of the live season, once bound.
    pub fn current_round(&self) -> Option<usize> {
        self.shared
            .binding
            .get()
            .map(|binding| binding.sequencer.round())
    }

    pub fn is_finished(&self) -> bool {
        self.shared
            .binding
            .get()
            .is_some_and(|binding| binding.sequencer.is_terminal())
    }

    /// Whether a timeout is currently pending.
    pub fn is_timer_armed(&self) -> bool {
        lock(&self.shared.countdown).is_armed()
    }

    pub fn remote(&self) -> Remote<S> {
        Remote::new(Arc::downgrade(&self.shared))
    }
}

impl<S: Series> Shared<S> {
    fn binding_or_fatal(&self, violation: ContractViolation) -> &Binding<S> {
        self.binding.get().unwrap_or_else(|| fatal(violation))
    }

    fn started_binding(&self) -> &Binding<S> {
        if !self.started.load(Ordering::Acquire) {
            fatal(ContractViolation::NotStarted);
        }
        self.binding_or_fatal(ContractViolation::NotStarted)
    }

    fn append(&self, event: WatchEvent) {
        debug!(series = %self.id, %event, "recorded");
        lock(&self.history).push(event);
    }

    async fn skip(&self, mode: SkipMode) {
        let binding = self.binding_or_fatal(ContractViolation::Unbound);
        binding
            .sequencer
            .skip(mode, &binding.screen, &binding.settings)
            .await;
    }

    async fn timeout_fired(self: Arc<Self>, generation: u64) {
        if !lock(&self.countdown).claim(generation) {
            debug!(series = %self.id, "stale timeout ignored");
            return;
        }
        let Some(binding) = self.binding.get() else {
            return;
        };
        if binding.sequencer.is_terminal() {
            return;
        }

        let round = binding.sequencer.round();
        let season = binding.sequencer.season_number();
        warn!(series = %self.id, round, "season timed out");
        self.append(WatchEvent::new(tags::TIMEOUT_OCCURRED, round.to_string()));

        let me = self.me.clone();
        let skipper = Skipper::new(move |mode| {
            async move {
                match me.upgrade() {
                    Some(shared) => shared.skip(mode).await,
                    None => debug!(?mode, "timeout skip dropped; series is gone"),
                }
            }
            .boxed()
        });

        self.series
            .season_too_long(season, &binding.screen, &binding.settings, skipper)
            .await;
    }
}

#[async_trait]
impl<S: Series> SequenceOwner<S> for Shared<S> {
    fn season_started(&self, round: usize, season: SeasonNumber) {
        info!(series = %self.id, round, ?season, "season started");
        self.append(WatchEvent::new(tags::SEASON_STARTED, round.to_string()));
    }

    fn season_ended(&self, round: usize, season: SeasonNumber) {
        info!(series = %self.id, round, ?season, "season ended");
        self.append(WatchEvent::new(tags::SEASON_ENDED, round.to_string()));
    }

    async fn present_season_start(
        &self,
        season: SeasonNumber,
        screen: &S::Screen,
        settings: &S::Settings,
    ) -> SeasonTimer {
        self.series.season_did_start(season, screen, settings).await
    }

    async fn present_season_end(
        &self,
        season: SeasonNumber,
        screen: &S::Screen,
        settings: &S::Settings,
    ) {
        self.series.season_did_end(season, screen, settings).await
    }

    fn arm_timer(&self, round: usize) {
        let binding = self.binding_or_fatal(ContractViolation::Unbound);
        let timeout = binding
            .settings
            .timed()
            .map(|timed| timed.timeout())
            .unwrap_or_else(|| fatal(ContractViolation::UntimedSettings));

        let me = self.me.clone();
        lock(&self.countdown).arm(timeout, move |generation| async move {
            if let Some(shared) = me.upgrade() {
                shared.timeout_fired(generation).await;
            }
        });
        debug!(series = %self.id, round, ?timeout, "timeout armed");
        self.append(WatchEvent::new(
            tags::TIMEOUT_TIMER_STARTED,
            round.to_string(),
        ));
    }

    fn disarm_timer(&self) {
        if lock(&self.countdown).disarm() {
            debug!(series = %self.id, "timeout disarmed");
        }
    }

    fn record(&self, round: usize, event: WatchEvent) {
        self.append(event.in_round(round));
    }

    fn sequence_ended(&self) {
        lock(&self.countdown).disarm();

        let sink = lock(&self.sink)
            .take()
            .unwrap_or_else(|| fatal(ContractViolation::MissingHistorySink));
        let history = std::mem::replace(&mut *lock(&self.history), History::new(self.id));
        let history = history.dislocating_overlaps();

        info!(series = %self.id, events = history.len(), "delivering history");
        sink(history);
    }
}

/// Builds a [`SeriesController`].
///
/// ```ignore
/// let controller = SeriesController::builder(MyGame::default())
///     .on_history(|history| store(history))
///     .build();
/// ```
pub struct SeriesBuilder<S: Series> {
    series: S,
    sink: Option<HistorySink>,
}

impl<S: Series> SeriesBuilder<S> {
    pub fn new(series: S) -> Self {
        Self { series, sink: None }
    }

    pub fn on_history(mut self, sink: impl FnOnce(History) + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> SeriesController<S> {
        let controller = SeriesController::new(self.series);
        if let Some(sink) = self.sink {
            *lock(&controller.shared.sink) = Some(sink);
        }
        controller
    }
}
