//! Read-only configuration handed to a series when it is bound.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default season timeout for [`Timed`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Knobs a game reads to decide how seasons are composed and presented.
///
/// Implementations are default-constructible. A game that wants its seasons
/// time-bounded exposes the [`TimedSettings`] capability through
/// [`Settings::timed`]; arming a timer without it is a contract violation.
pub trait Settings: Default + Send + Sync + 'static {
    fn timed(&self) -> Option<&dyn TimedSettings> {
        None
    }
}

/// How long a season may wait for input before timing out.
pub trait TimedSettings: Send + Sync {
    fn timeout(&self) -> Duration;
    fn set_timeout(&mut self, timeout: Duration);
}

/// Settings with no timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainSettings;

impl Settings for PlainSettings {}

/// Settings carrying only a season timeout.
///
/// ```
/// use flix_core::{Settings, Timed};
///
/// let timed: Timed = serde_json::from_str(r#"{ "timeout_ms": 1500 }"#).unwrap();
/// assert_eq!(timed.timed().unwrap().timeout().as_millis(), 1500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timed {
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
}

impl Timed {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for Timed {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Settings for Timed {
    fn timed(&self) -> Option<&dyn TimedSettings> {
        Some(self)
    }
}

impl TimedSettings for Timed {
    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
