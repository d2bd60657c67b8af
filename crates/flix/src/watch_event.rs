//! Watch events: the 3W (what / when / where) record of something that
//! happened during a playthrough.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tags the controller records on its own.
///
/// These are wire strings read by existing history analyzers, spelling
/// included.
pub mod tags {
    pub const SEASON_STARTED: &str = "SeasonStarted";
    pub const SEASON_ENDED: &str = "SeasonEnded";
    pub const TIMEOUT_OCCURRED: &str = "TimeoutOccured";
    pub const TIMEOUT_TIMER_STARTED: &str = "timeoutTimerStarted";
    pub const SERIES_SKIPPED_TO_THE_END: &str = "SeriesSkippedToTheEnd";
    pub const SEASON_SKIPPED_TO_THE_NEXT: &str = "SeasonSkippedToTheNext";
}

/// An immutable, timestamped record.
///
/// Create one right after the thing it describes happened: the timestamp is
/// taken in the constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "what")]
    tag: String,
    #[serde(rename = "when")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "where")]
    location: String,
}

impl WatchEvent {
    /// A new event stamped now. `location` is a `/`-separated path and may be
    /// empty.
    pub fn new(tag: impl Into<String>, location: impl Into<String>) -> Self {
        Self::at(tag, location, Utc::now())
    }

    /// A new event with an explicit timestamp.
    pub fn at(
        tag: impl Into<String>,
        location: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            tag: tag.into(),
            timestamp,
            location: location.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// A copy whose timestamp is moved by `delta`.
    pub fn adding(&self, delta: Duration) -> Self {
        Self {
            tag: self.tag.clone(),
            timestamp: self.timestamp + delta,
            location: self.location.clone(),
        }
    }

    /// A copy accepted in `round`: the location gets the round prefixed and
    /// the timestamp becomes the acceptance instant.
    pub fn in_round(&self, round: usize) -> Self {
        let location = if self.location.is_empty() {
            round.to_string()
        } else {
            format!("{round}/{}", self.location)
        };
        Self::new(self.tag.clone(), location)
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at {}", self.timestamp, self.tag, self.location)
    }
}
