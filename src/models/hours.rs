use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%H:%M";

/// A time-of-day range written as `HH:MM-HH:MM`.
///
/// Ranges never wrap past midnight: parsing rejects a start later than the
/// stop, so every constructed value satisfies `start <= stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeRange {
    start: NaiveTime,
    stop: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeRangeError {
    #[error("time range {0:?} is not in HH:MM-HH:MM form")]
    Malformed(String),

    #[error("time range {0:?} starts after it stops")]
    Reversed(String),
}

impl TimeRange {
    pub fn new(start: NaiveTime, stop: NaiveTime) -> Result<Self, TimeRangeError> {
        if start > stop {
            return Err(TimeRangeError::Reversed(format!(
                "{}-{}",
                start.format(TIME_FORMAT),
                stop.format(TIME_FORMAT)
            )));
        }
        Ok(Self { start, stop })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn stop(&self) -> NaiveTime {
        self.stop
    }

    /// Parses every entry, failing on the first malformed one.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, TimeRangeError> {
        raw.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TimeRangeError::Malformed(s.to_string());

        let (start, stop) = s.trim().split_once('-').ok_or_else(malformed)?;
        let start = NaiveTime::parse_from_str(start.trim(), TIME_FORMAT).map_err(|_| malformed())?;
        let stop = NaiveTime::parse_from_str(stop.trim(), TIME_FORMAT).map_err(|_| malformed())?;

        Self::new(start, stop).map_err(|_| TimeRangeError::Reversed(s.to_string()))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.stop.format(TIME_FORMAT)
        )
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(value: TimeRange) -> Self {
        value.to_string()
    }
}
