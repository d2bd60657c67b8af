//! The traits a game implements.

use std::any::type_name;
use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{fatal, ContractViolation};
use crate::season::{Season, SeasonNumber, SeasonTimer, SkipMode, WhatNext};
use crate::settings::Settings;

/// Where the game is presented (a scene, a view, a terminal...).
///
/// Flix never looks inside the screen; it only hands it back to the game's
/// hooks and episodes.
pub trait Screen: Send + Sync + 'static {}

/// A handler for one in-game event.
///
/// Usually an enum with one variant per event. Identity is `PartialEq`: the
/// sequencer checks the raised episode against the live season's bucket with
/// `==`, so implement it structurally (or by discriminant, when variants carry
/// payloads the bucket can't know in advance).
///
/// # Contract
///
/// `watch` must return. A handler that never completes keeps its event in
/// flight forever and every later event is discarded.
#[async_trait]
pub trait Episode<S: Series + ?Sized>: PartialEq + fmt::Debug + Send + Sync + 'static {
    async fn watch(
        &self,
        viewer: &S::Viewer,
        season: SeasonNumber,
        screen: &S::Screen,
        settings: &S::Settings,
    ) -> WhatNext;
}

/// A concrete game: its types, its seasons and its presentation hooks.
#[async_trait]
pub trait Series: Send + Sync + 'static {
    /// Whatever raises episodes (a node on screen, a player, a bot).
    type Viewer: ?Sized + Send + Sync;
    type Episode: Episode<Self>;
    type Screen: Screen;
    type Settings: Settings;

    /// The seasons to play, in order. Must not be empty.
    fn episodes(&self, settings: &Self::Settings) -> Vec<Season<Self::Episode>>;

    /// Present the start of a season. The sequencer waits for this to return
    /// before it arms the timer; returning [`SeasonTimer::Unarmed`] lets the
    /// season wait forever.
    ///
    /// Defaults to arming whenever the settings are timed.
    async fn season_did_start(
        &self,
        _season: SeasonNumber,
        _screen: &Self::Screen,
        settings: &Self::Settings,
    ) -> SeasonTimer {
        if settings.timed().is_some() {
            SeasonTimer::Armed
        } else {
            SeasonTimer::Unarmed
        }
    }

    /// Present the end of a season. The next season starts only once this
    /// returns.
    async fn season_did_end(
        &self,
        _season: SeasonNumber,
        _screen: &Self::Screen,
        _settings: &Self::Settings,
    ) {
    }

    /// The live season waited longer than the configured timeout.
    ///
    /// Games with timed settings must override this and decide: call
    /// [`Skipper::skip`] to move on, or drop it to keep waiting. The default
    /// is a contract violation.
    async fn season_too_long(
        &self,
        season: SeasonNumber,
        _screen: &Self::Screen,
        _settings: &Self::Settings,
        _skip: Skipper,
    ) {
        fatal(ContractViolation::SeasonDidTimeout {
            series: type_name::<Self>(),
            season,
        })
    }
}

/// One-shot skip request handed to [`Series::season_too_long`].
pub struct Skipper {
    run: Box<dyn FnOnce(SkipMode) -> BoxFuture<'static, ()> + Send>,
}

impl Skipper {
    pub fn new<F>(run: F) -> Self
    where
        F: FnOnce(SkipMode) -> BoxFuture<'static, ()> + Send + 'static,
    {
        Self { run: Box::new(run) }
    }

    /// Skip the timed-out season. Returns once the transition has been
    /// presented.
    pub async fn skip(self, mode: SkipMode) {
        (self.run)(mode).await
    }
}

impl fmt::Debug for Skipper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skipper").finish_non_exhaustive()
    }
}
