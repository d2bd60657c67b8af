//! Contract violations.
//!
//! Flix treats misuse as an invalid program rather than invalid input. Every
//! condition below is raised through [`fatal`], which logs and panics at the
//! point of detection. None of them is meant to reach a player; they surface
//! to the integrating developer while wiring a game up.
//!
//! Benign conditions (an event arriving while another is being watched, an
//! episode that is not part of the live season) are *not* errors. They are
//! absorbed at the dispatch boundary and reported as a
//! [`Dispatch`](crate::Dispatch) value.

use crate::season::SeasonNumber;

/// A broken integration contract. Unrecoverable by design.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    // ------------------------------------------------------------------
    // Configuration errors
    // ------------------------------------------------------------------
    /// The series supplied no seasons for the bound settings.
    #[error("every story must have chapters: the series supplied no seasons")]
    SeasonsAreEmpty,

    /// A timer was requested but the settings have no timeout.
    #[error("the timeout timer can't be armed because the settings don't provide a timeout")]
    UntimedSettings,

    /// The series ended and nobody is waiting for its history.
    #[error("the history sink must be registered for every series")]
    MissingHistorySink,

    /// `start_watch_now` ran before a screen and settings were bound.
    #[error("the series must be bound to a screen and settings before it starts")]
    Unbound,

    /// `bind` ran twice on the same controller.
    #[error("the series is already bound to a screen")]
    AlreadyBound,

    // ------------------------------------------------------------------
    // Protocol misuse
    // ------------------------------------------------------------------
    /// An episode was dispatched after the last season ended.
    #[error("an episode was dispatched after the series reached its end")]
    ReachedTheEnd,

    /// A transition needed the sequence owner and it was already gone.
    #[error("the sequence owner is gone; a season transition can't be presented")]
    MissingOwner,

    /// Events were sent before `start_watch_now`.
    #[error("start_watch_now() must be called before sending events")]
    NotStarted,

    /// The first season was started twice.
    #[error("the first season has already been started")]
    AlreadyStarted,

    /// A season timed out and the series never chose a timeout policy.
    #[error("series `{series}` timed out at season {season:?} but does not override season_too_long")]
    SeasonDidTimeout {
        series: &'static str,
        season: SeasonNumber,
    },
}

/// Abort on a contract violation.
#[track_caller]
pub fn fatal(violation: ContractViolation) -> ! {
    tracing::error!(%violation, "flix contract violation");
    panic!("{violation}")
}
