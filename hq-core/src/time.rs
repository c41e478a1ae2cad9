use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Millisecond-precision UTC instant.
///
/// Thin newtype over [`chrono::DateTime<Utc>`] so every crate in the workspace shares one
/// parse/format/alignment implementation instead of re-deriving it at each call site.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Construct a [`Timestamp`] from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_else(|| DateTime::UNIX_EPOCH))
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Wrap an existing [`DateTime<Utc>`].
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Borrow the inner [`DateTime<Utc>`].
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// `self + delta`.
    pub fn checked_add(&self, delta: TimeDelta) -> Option<Self> {
        self.0.checked_add_signed(delta).map(Self)
    }

    /// `self - other`, as a [`TimeDelta`].
    pub fn duration_since(&self, other: Self) -> TimeDelta {
        self.0 - other.0
    }

    /// Floor `self` down to the start of the containing [`KlineInterval`] bucket.
    ///
    /// eg/ `2024-01-01T00:07:32` aligned to [`KlineInterval::Minutes5`] is
    /// `2024-01-01T00:05:00`.
    pub fn align_to(&self, interval: KlineInterval) -> Self {
        let bucket_ms = interval.as_millis();
        let ms = self.as_millis();
        let floored = ms - ms.rem_euclid(bucket_ms);
        Self::from_millis(floored)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s).map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

/// Standard k-line/candle intervals the engine aligns timestamps to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum KlineInterval {
    Minutes1,
    Minutes5,
    Minutes15,
    Hours1,
    Hours4,
    Days1,
}

impl KlineInterval {
    /// Bucket width in milliseconds.
    pub fn as_millis(&self) -> i64 {
        match self {
            KlineInterval::Minutes1 => 60_000,
            KlineInterval::Minutes5 => 5 * 60_000,
            KlineInterval::Minutes15 => 15 * 60_000,
            KlineInterval::Hours1 => 60 * 60_000,
            KlineInterval::Hours4 => 4 * 60 * 60_000,
            KlineInterval::Days1 => 24 * 60 * 60_000,
        }
    }

    pub fn as_timedelta(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso8601_round_trips() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        let s = ts.to_string();
        let parsed: Timestamp = s.parse().unwrap();
        assert_eq!(ts, parsed);
    }

    #[test]
    fn align_to_5m_floors_down() {
        // 2023-11-14T22:13:20.123Z -> floor to the 5 minute bucket
        let ts = Timestamp::from_millis(1_700_000_000_123);
        let aligned = ts.align_to(KlineInterval::Minutes5);
        assert_eq!(aligned.as_millis() % KlineInterval::Minutes5.as_millis(), 0);
        assert!(aligned.as_millis() <= ts.as_millis());
        assert!(ts.as_millis() - aligned.as_millis() < KlineInterval::Minutes5.as_millis());
    }

    #[test]
    fn duration_since_is_symmetric_with_checked_add() {
        let start = Timestamp::from_millis(0);
        let delta = TimeDelta::milliseconds(60_000);
        let end = start.checked_add(delta).unwrap();
        assert_eq!(end.duration_since(start), delta);
    }
}
