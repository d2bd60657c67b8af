//! The season/episode state machine.
//!
//! ```text
//!  Idle ──start──► Active(0) ──leave──► Active(1) ──leave──► ... ──leave──► Terminal
//!                     │  ▲                                                   ▲
//!                     └──┘ stay / out of season / busy                       │
//!                     └──────────────────── skip to end ─────────────────────┘
//! ```
//!
//! The sequencer owns the seasons, the cursor and the in-flight guard. It never
//! touches the history or the timer; every side effect goes through its
//! [`SequenceOwner`], held as a non-owning handle.
//!
//! # Invariants
//!
//! - At most one episode is being watched at a time. Claiming the slot is a
//!   single compare-and-swap; losers are discarded, never queued.
//! - The cursor only moves forward: by one on an ordinary advance, or straight
//!   to the last season when skipping to the end.
//! - Terminal is absorbing. Dispatching after it is a contract violation.
//! - The owner hears "sequence ended" exactly once.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{fatal, ContractViolation};
use crate::season::{Season, SeasonNumber, SeasonTimer, SkipMode, WhatNext};
use crate::series::{Episode, Series};
use crate::watch_event::{tags, WatchEvent};

/// What happened to a dispatched episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The episode was watched and asked for this transition, which has
    /// already been carried out.
    Watched(WhatNext),
    /// Another episode was still being watched. Discarded.
    Busy,
    /// The episode is not part of the live season. Discarded.
    OutOfSeason,
    /// The series ended while the event was being admitted. Discarded.
    Ended,
}

/// The side of the sequencer that records, presents and keeps time.
///
/// Presentation calls are handshakes: the protocol resumes only once they
/// return.
#[async_trait]
pub trait SequenceOwner<S: Series>: Send + Sync {
    /// Season `round` became live.
    fn season_started(&self, round: usize, season: SeasonNumber);

    /// Season `round` is ending.
    fn season_ended(&self, round: usize, season: SeasonNumber);

    async fn present_season_start(
        &self,
        season: SeasonNumber,
        screen: &S::Screen,
        settings: &S::Settings,
    ) -> SeasonTimer;

    async fn present_season_end(
        &self,
        season: SeasonNumber,
        screen: &S::Screen,
        settings: &S::Settings,
    );

    /// Arm (or re-arm) the timeout for season `round`.
    fn arm_timer(&self, round: usize);

    /// Cancel any armed timeout. Must be idempotent.
    fn disarm_timer(&self);

    /// Record `event` as accepted during `round`.
    fn record(&self, round: usize, event: WatchEvent);

    /// The last season is over.
    fn sequence_ended(&self);
}

/// Releases the in-flight slot when the dispatch finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives a series through its seasons.
pub struct EpisodeSequencer<S: Series> {
    seasons: Vec<Season<S::Episode>>,
    cursor: AtomicUsize,
    in_flight: AtomicBool,
    started: AtomicBool,
    terminal: AtomicBool,
    ended: AtomicBool,
    owner: Weak<dyn SequenceOwner<S>>,
}

impl<S: Series> EpisodeSequencer<S> {
    /// Build a sequencer over `seasons`. An empty season list is a contract
    /// violation.
    pub fn new(seasons: Vec<Season<S::Episode>>, owner: Weak<dyn SequenceOwner<S>>) -> Self {
        if seasons.is_empty() {
            fatal(ContractViolation::SeasonsAreEmpty);
        }

        Self {
            seasons,
            cursor: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
            started: AtomicBool::new(false),
            terminal: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            owner,
        }
    }

    /// Index of the live season.
    pub fn round(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn season_number(&self) -> SeasonNumber {
        SeasonNumber::new(self.round(), self.seasons.len())
    }

    pub fn current_season(&self) -> &[S::Episode] {
        &self.seasons[self.round()]
    }

    pub fn season_count(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::Acquire)
    }

    fn owner(&self) -> Arc<dyn SequenceOwner<S>> {
        self.owner
            .upgrade()
            .unwrap_or_else(|| fatal(ContractViolation::MissingOwner))
    }

    /// Start the first season. Call exactly once, before any dispatch.
    pub async fn start_first_season(&self, screen: &S::Screen, settings: &S::Settings) {
        if self.is_terminal() {
            fatal(ContractViolation::ReachedTheEnd);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            fatal(ContractViolation::AlreadyStarted);
        }

        let owner = self.owner();
        self.open_season(owner.as_ref(), screen, settings).await;
    }

    /// Hand `episode` to the live season.
    ///
    /// Returns immediately with [`Dispatch::Busy`] if another episode is being
    /// watched, or [`Dispatch::OutOfSeason`] if the live season doesn't
    /// contain it. Otherwise `data` (if any) is recorded for the live round,
    /// the episode is watched, and the transition it asks for is carried out
    /// before this returns.
    pub async fn dispatch(
        &self,
        viewer: &S::Viewer,
        episode: &S::Episode,
        screen: &S::Screen,
        settings: &S::Settings,
        data: Option<WatchEvent>,
    ) -> Dispatch {
        if self.is_terminal() {
            fatal(ContractViolation::ReachedTheEnd);
        }
        if !self.is_started() {
            fatal(ContractViolation::NotStarted);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(?episode, "episode discarded because one is already being watched");
            return Dispatch::Busy;
        }
        let _slot = InFlight(&self.in_flight);

        // A skip to the end may have landed between the check and the claim.
        if self.is_terminal() {
            debug!(?episode, "episode discarded because the series just ended");
            return Dispatch::Ended;
        }

        let round = self.round();
        if !self.seasons[round].contains(episode) {
            debug!(?episode, round, "episode is not part of the live season");
            return Dispatch::OutOfSeason;
        }

        if let Some(data) = data {
            self.owner().record(round, data);
        }

        let season = SeasonNumber::new(round, self.seasons.len());
        let next = episode.watch(viewer, season, screen, settings).await;
        debug!(?episode, round, ?next, "episode watched");

        match next {
            WhatNext::StayOnSeason => {}
            WhatNext::LeaveSeason => self.advance(screen, settings).await,
            WhatNext::SkipToEnd => self.skip_to_end(screen, settings).await,
        }

        Dispatch::Watched(next)
    }

    /// Abandon the live season. Not gated by the in-flight slot.
    pub async fn skip(&self, mode: SkipMode, screen: &S::Screen, settings: &S::Settings) {
        if self.is_terminal() {
            warn!(?mode, "skip ignored because the series already ended");
            return;
        }

        match mode {
            SkipMode::ToEnd => self.skip_to_end(screen, settings).await,
            SkipMode::ToNext => self.skip_to_next(screen, settings).await,
            SkipMode::By(amount) => {
                for _ in 0..amount.get() {
                    if self.is_terminal() {
                        break;
                    }
                    self.skip_to_next(screen, settings).await;
                }
            }
        }
    }

    async fn skip_to_next(&self, screen: &S::Screen, settings: &S::Settings) {
        self.owner().record(
            self.round(),
            WatchEvent::new(tags::SEASON_SKIPPED_TO_THE_NEXT, ""),
        );
        self.advance(screen, settings).await;
    }

    /// Ordinary season-to-season transition.
    async fn advance(&self, screen: &S::Screen, settings: &S::Settings) {
        if self.is_terminal() {
            return;
        }
        let owner = self.owner();
        let round = self.round();
        let season = SeasonNumber::new(round, self.seasons.len());

        owner.disarm_timer();
        owner.season_ended(round, season);
        owner.present_season_end(season, screen, settings).await;

        if self.is_terminal() {
            // Skipped to the end while the ending was presented.
            return;
        }

        if round + 1 == self.seasons.len() {
            self.terminal.store(true, Ordering::Release);
            self.finish(owner.as_ref());
            return;
        }

        if self
            .cursor
            .compare_exchange(round, round + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(round, "season already advanced by a concurrent transition");
            return;
        }
        self.open_season(owner.as_ref(), screen, settings).await;
    }

    /// Jump to the last season and end the series.
    async fn skip_to_end(&self, screen: &S::Screen, settings: &S::Settings) {
        let owner = self.owner();
        let round = self.round();

        // Terminal is asserted before anything is presented so no dispatch
        // can slip in behind the ending.
        if self.terminal.swap(true, Ordering::AcqRel) {
            warn!("skip to end ignored because the series already ended");
            return;
        }
        owner.record(round, WatchEvent::new(tags::SERIES_SKIPPED_TO_THE_END, ""));
        owner.disarm_timer();

        let last = self.seasons.len() - 1;
        self.cursor.store(last, Ordering::Release);
        info!(from = round, to = last, "skipped to the end");

        let season = SeasonNumber::new(last, self.seasons.len());
        owner.season_ended(last, season);
        owner.present_season_end(season, screen, settings).await;
        self.finish(owner.as_ref());
    }

    async fn open_season(
        &self,
        owner: &dyn SequenceOwner<S>,
        screen: &S::Screen,
        settings: &S::Settings,
    ) {
        let round = self.round();
        let season = SeasonNumber::new(round, self.seasons.len());

        owner.season_started(round, season);
        let timer = owner.present_season_start(season, screen, settings).await;

        if timer == SeasonTimer::Armed && !self.is_terminal() && self.round() == round {
            owner.arm_timer(round);
        }
    }

    fn finish(&self, owner: &dyn SequenceOwner<S>) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(seasons = self.seasons.len(), "sequence ended");
        owner.sequence_ended();
    }
}
