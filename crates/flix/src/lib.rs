//! # Flix
//!
//! A season/episode sequencing engine for narrative games: it walks a viewer
//! through an ordered list of seasons, hands events to whichever season is
//! live, keeps at most one event in flight, optionally time-bounds how long a
//! season may wait for input, and records a causally ordered history of the
//! playthrough for later analysis.
//!
//! ## Core Concepts
//!
//! - [`Series`] = the game: its seasons and presentation hooks
//! - [`Episode`] = a handler for one in-game event
//! - [`WatchEvent`] = a 3W record (what / when / where) of something that happened
//! - [`History`] = the ordered log of a playthrough, delivered once at the end
//!
//! ## Architecture
//!
//! ```text
//! Screen (scene / view / terminal)
//!     │
//!     ▼ Remote::watch(viewer, episode, data)
//! SeriesController ── history, timeout timer, history sink
//!     │
//!     ▼ dispatch()
//! EpisodeSequencer ── seasons, cursor, in-flight slot, terminal flag
//!     │
//!     ├─► live season contains episode? ── no ──► OutOfSeason (dropped)
//!     │
//!     ▼ Episode::watch() ─► WhatNext
//!                              │
//!            ┌─────────────────┼───────────────────┐
//!            ▼                 ▼                   ▼
//!      StayOnSeason       LeaveSeason          SkipToEnd
//!                     end ─► next start     jump ─► end ─► History
//! ```
//!
//! ## Key Invariants
//!
//! 1. **One event in flight** - Events raised while another is being watched
//!    are discarded, never queued
//! 2. **Forward only** - The cursor never moves back; terminal is absorbing
//! 3. **Handshakes are ordered** - A season starts only after the previous
//!    one's ending was presented; the timer is armed only after the start was
//! 4. **Owner writes history** - The sequencer only notifies; the controller
//!    records
//! 5. **Misuse is fatal** - Contract violations panic at the point of
//!    detection (see [`ContractViolation`])
//!
//! ## Example
//!
//! ```ignore
//! use flix_core::{async_trait, Episode, Series, SeriesController, Timed, WhatNext, WatchEvent};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Door { Knock, Open }
//!
//! #[async_trait]
//! impl Episode<House> for Door {
//!     async fn watch(&self, _: &str, _: SeasonNumber, _: &Porch, _: &Timed) -> WhatNext {
//!         match self {
//!             Door::Knock => WhatNext::StayOnSeason,
//!             Door::Open => WhatNext::LeaveSeason,
//!         }
//!     }
//! }
//!
//! let controller = SeriesController::builder(House)
//!     .on_history(|history| println!("{}", history.to_json().unwrap()))
//!     .build();
//! let remote = controller.begin(Arc::new(Porch), Timed::default()).await;
//! remote.watch("guest", &Door::Open, WatchEvent::new("DoorOpened", "front")).await;
//! ```

mod controller;
mod countdown;
mod error;
mod history;
mod remote;
mod season;
mod sequencer;
mod series;
mod settings;
mod watch_event;

#[cfg(test)]
mod test_support;


// Stress tests (test-only)
#[cfg(test)]
mod stress_tests;

pub use crate::controller::{HistorySink, SeriesBuilder, SeriesController};
pub use crate::error::{fatal, ContractViolation};
pub use crate::history::{History, SeriesId, OVERLAP_EPSILON_MS};
pub use crate::remote::Remote;
pub use crate::season::{Season, SeasonNumber, SeasonTimer, SkipMode, WhatNext};
pub use crate::sequencer::{Dispatch, EpisodeSequencer, SequenceOwner};
pub use crate::series::{Episode, Screen, Series, Skipper};
pub use crate::settings::{PlainSettings, Settings, Timed, TimedSettings, DEFAULT_TIMEOUT};
pub use crate::watch_event::{tags, WatchEvent};

// Re-export commonly used external types
pub use async_trait::async_trait;
