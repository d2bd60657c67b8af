//! Season positions and transition requests.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// A bucket of episodes that may be live at the same time.
pub type Season<E> = Vec<E>;

/// A season's position, convenient for comparisons in game code:
///
/// ```
/// use flix_core::SeasonNumber;
///
/// let season = SeasonNumber::new(2, 4);
/// assert_eq!(season, SeasonNumber::LastButOne);
/// ```
///
/// Derived on demand from the sequencer's cursor; it is a view of the cursor,
/// never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum SeasonNumber {
    /// The opening season of a series with more than one season.
    First,
    /// Any season none of the other cases describe.
    Middle(usize),
    /// The season right before the last one.
    LastButOne,
    /// The final season. A single-season series is always `Last`.
    Last,
}

impl SeasonNumber {
    /// Classify `index` within a series of `seasons` seasons.
    ///
    /// Precedence matters: `First` needs more than one season, then `Last`
    /// wins over `LastButOne`.
    pub fn new(index: usize, seasons: usize) -> Self {
        if index == 0 && seasons > 1 {
            Self::First
        } else if Some(index) == seasons.checked_sub(1) {
            Self::Last
        } else if Some(index) == seasons.checked_sub(2) {
            Self::LastButOne
        } else {
            Self::Middle(index)
        }
    }
}

/// How to abandon the live season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "amount", rename_all = "snake_case")]
pub enum SkipMode {
    /// End the series, presenting only the last season's ending.
    ToEnd,
    /// Advance one season.
    ToNext,
    /// Advance `n` seasons, one full end/start cycle at a time.
    By(NonZeroUsize),
}

impl SkipMode {
    /// `By(n)`, or `None` for zero.
    pub fn by(amount: usize) -> Option<Self> {
        NonZeroUsize::new(amount).map(Self::By)
    }
}

/// What an episode asks for once it has been watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhatNext {
    /// Keep the season live and accept the next event.
    StayOnSeason,
    /// End this season and start the next one (or end the series).
    LeaveSeason,
    /// Abort the series.
    SkipToEnd,
}

/// Returned by a season's start presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonTimer {
    /// Arm the timeout timer for this season.
    Armed,
    /// Let the season wait for input indefinitely.
    Unarmed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_season_is_last() {
        assert_eq!(SeasonNumber::new(0, 1), SeasonNumber::Last);
        assert_ne!(SeasonNumber::new(0, 1), SeasonNumber::First);
    }

    #[test]
    fn two_seasons_have_first_and_last() {
        assert_eq!(SeasonNumber::new(0, 2), SeasonNumber::First);
        assert_eq!(SeasonNumber::new(1, 2), SeasonNumber::Last);
    }

    #[test]
    fn three_seasons_middle_is_last_but_one() {
        assert_eq!(SeasonNumber::new(1, 3), SeasonNumber::LastButOne);
    }

    #[test]
    fn long_series_classification() {
        for seasons in 4..12 {
            for index in 0..seasons {
                let expected = match index {
                    0 => SeasonNumber::First,
                    i if i == seasons - 1 => SeasonNumber::Last,
                    i if i == seasons - 2 => SeasonNumber::LastButOne,
                    i => SeasonNumber::Middle(i),
                };
                assert_eq!(SeasonNumber::new(index, seasons), expected);
            }
        }
    }

    #[test]
    fn middle_compares_by_index() {
        assert_eq!(SeasonNumber::Middle(2), SeasonNumber::new(2, 6));
        assert_ne!(SeasonNumber::Middle(2), SeasonNumber::Middle(3));
    }

    #[test]
    fn skip_by_zero_is_rejected() {
        assert_eq!(SkipMode::by(0), None);
        assert_eq!(
            SkipMode::by(3),
            Some(SkipMode::By(NonZeroUsize::new(3).unwrap()))
        );
    }
}
