//! Fixtures shared by the behaviour tests.

use std::marker::PhantomData;
use std::mem::discriminant;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::{
    Episode, PlainSettings, Screen, Season, SeasonNumber, SeasonTimer, Series, Settings, SkipMode,
    Skipper, Timed, WhatNext,
};

#[derive(Debug, Default)]
pub(crate) struct Stage;

impl Screen for Stage {}

/// The viewer. Counts what it watched and how many handlers overlapped.
#[derive(Debug, Default)]
pub(crate) struct Audience {
    pub watched: AtomicUsize,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl Audience {
    pub fn watched(&self) -> usize {
        self.watched.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Test episodes. Identity is the variant; payloads are ignored.
#[derive(Debug, Clone)]
pub(crate) enum Beat {
    Stay,
    Leave,
    End,
    /// Waits for a permit on the gate, then asks for `WhatNext`.
    Held(Arc<Semaphore>, WhatNext),
    /// Yields a few times, tracking overlap on the audience.
    Crowd,
}

impl PartialEq for Beat {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl Beat {
    /// A held beat and the gate that releases it.
    pub fn held(then: WhatNext) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (Beat::Held(gate.clone(), then), gate)
    }

    /// Every variant, so any beat is accepted by such a season.
    pub fn all() -> Season<Beat> {
        vec![
            Beat::Stay,
            Beat::Leave,
            Beat::End,
            Beat::Held(Arc::new(Semaphore::new(0)), WhatNext::StayOnSeason),
            Beat::Crowd,
        ]
    }
}

#[async_trait]
impl<C: Settings> Episode<Show<C>> for Beat {
    async fn watch(
        &self,
        viewer: &Audience,
        _season: SeasonNumber,
        _screen: &Stage,
        _settings: &C,
    ) -> WhatNext {
        viewer.watched.fetch_add(1, Ordering::SeqCst);
        match self {
            Beat::Stay => WhatNext::StayOnSeason,
            Beat::Leave => WhatNext::LeaveSeason,
            Beat::End => WhatNext::SkipToEnd,
            Beat::Held(gate, then) => {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
                *then
            }
            Beat::Crowd => {
                let now = viewer.active.fetch_add(1, Ordering::SeqCst) + 1;
                viewer.peak.fetch_max(now, Ordering::SeqCst);
                for _ in 0..fastrand::usize(1..4) {
                    tokio::task::yield_now().await;
                }
                viewer.active.fetch_sub(1, Ordering::SeqCst);
                WhatNext::StayOnSeason
            }
        }
    }
}

/// A configurable game.
pub(crate) struct Show<C = Timed> {
    seasons: Vec<Season<Beat>>,
    timer: Option<SeasonTimer>,
    on_timeout: Option<SkipMode>,
    settings: PhantomData<fn() -> C>,
}

impl<C> Show<C> {
    fn with_seasons(seasons: Vec<Season<Beat>>) -> Self {
        Self {
            seasons,
            timer: None,
            on_timeout: None,
            settings: PhantomData,
        }
    }

    /// Force the start presentation's timer decision.
    pub fn arming(mut self, timer: SeasonTimer) -> Self {
        self.timer = Some(timer);
        self
    }

    /// What to do when a season times out. `None` keeps waiting.
    pub fn on_timeout(mut self, mode: SkipMode) -> Self {
        self.on_timeout = Some(mode);
        self
    }
}

impl Show<Timed> {
    pub fn timed(seasons: Vec<Season<Beat>>) -> Self {
        Self::with_seasons(seasons)
    }
}

impl Show<PlainSettings> {
    pub fn plain(seasons: Vec<Season<Beat>>) -> Self {
        Self::with_seasons(seasons)
    }
}

/// `count` seasons that accept every beat.
pub(crate) fn open_seasons(count: usize) -> Vec<Season<Beat>> {
    (0..count).map(|_| Beat::all()).collect()
}

#[async_trait]
impl<C: Settings> Series for Show<C> {
    type Viewer = Audience;
    type Episode = Beat;
    type Screen = Stage;
    type Settings = C;

    fn episodes(&self, _settings: &C) -> Vec<Season<Beat>> {
        self.seasons.clone()
    }

    async fn season_did_start(
        &self,
        _season: SeasonNumber,
        _screen: &Stage,
        settings: &C,
    ) -> SeasonTimer {
        match self.timer {
            Some(timer) => timer,
            None if settings.timed().is_some() => SeasonTimer::Armed,
            None => SeasonTimer::Unarmed,
        }
    }

    async fn season_too_long(
        &self,
        _season: SeasonNumber,
        _screen: &Stage,
        _settings: &C,
        skip: Skipper,
    ) {
        if let Some(mode) = self.on_timeout {
            skip.skip(mode).await;
        }
    }
}
