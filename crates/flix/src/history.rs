//! The ordered log of a playthrough.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::watch_event::WatchEvent;

/// Tie-breaking step applied to adjacent identical timestamps.
pub const OVERLAP_EPSILON_MS: i64 = 1;

/// Identifies one controller (one playthrough).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesId(pub Uuid);

impl SeriesId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SeriesId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Append-only sequence of [`WatchEvent`]s, in acceptance order.
///
/// Only the controller writes to it. It is handed out once, when the series
/// ends, after [`History::dislocating_overlaps`] has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    series: SeriesId,
    events: Vec<WatchEvent>,
}

impl History {
    pub fn new(series: SeriesId) -> Self {
        Self {
            series,
            events: Vec::new(),
        }
    }

    /// The playthrough this history belongs to.
    pub fn series(&self) -> SeriesId {
        self.series
    }

    pub(crate) fn push(&mut self, event: WatchEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[WatchEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WatchEvent> {
        self.events.iter()
    }

    /// Tags in order; handy for assertions and quick inspection.
    pub fn tags(&self) -> Vec<&str> {
        self.events.iter().map(WatchEvent::tag).collect()
    }

    pub fn into_events(self) -> Vec<WatchEvent> {
        self.events
    }

    /// Break timestamp ties left to right.
    ///
    /// An entry that does not come strictly after its predecessor (as
    /// already placed by this pass) is replaced by a copy placed
    /// [`OVERLAP_EPSILON_MS`] after the predecessor. A run of `k` identical
    /// timestamps becomes `t, t+1ms, ..., t+(k-1)ms`, and an entry the run
    /// has caught up with is pushed along with it. Single pass; the result is
    /// strictly increasing and keeps the original order.
    pub fn dislocating_overlaps(mut self) -> Self {
        let epsilon = Duration::milliseconds(OVERLAP_EPSILON_MS);
        let mut previous = None;

        for event in &mut self.events {
            let raw = event.timestamp();
            if let Some(placed) = previous {
                if raw <= placed {
                    *event = event.adding(placed - raw + epsilon);
                }
            }
            previous = Some(event.timestamp());
        }

        self
    }

    /// Render as JSON for downstream analysis.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl IntoIterator for History {
    type Item = WatchEvent;
    type IntoIter = std::vec::IntoIter<WatchEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a WatchEvent;
    type IntoIter = std::slice::Iter<'a, WatchEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
