//! Time source for record timestamps.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, de};
use std::sync::{Arc, Mutex};

/// Source of record creation instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = instant;
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += step;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Truncate to the precision records are hashed at.
pub fn canonical_instant(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(6)
}

/// Fixed string form used when hashing a timestamp.
pub fn canonical_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Deserialize an instant that is already at hashing precision.
///
/// Finer instants are refused: the hash could not tell them apart from
/// their truncation.
pub(crate) fn deserialize_canonical<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let instant = DateTime::<Utc>::deserialize(deserializer)?;
    if canonical_instant(instant) != instant {
        return Err(de::Error::custom(format!(
            "timestamp {} is finer than microsecond precision",
            instant.to_rfc3339_opts(SecondsFormat::Nanos, true)
        )));
    }
    Ok(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_state() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();
        other.advance(Duration::seconds(5));
        assert_eq!(clock.now(), start + Duration::seconds(5));
    }

    #[test]
    fn canonical_timestamp_has_fixed_micro_precision() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        assert_eq!(canonical_timestamp(&instant), "2024-03-09T12:30:00.000000Z");

        let nanos = instant + Duration::nanoseconds(1_234_567);
        assert_eq!(
            canonical_timestamp(&canonical_instant(nanos)),
            "2024-03-09T12:30:00.001234Z"
        );
    }
}
