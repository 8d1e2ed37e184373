//! Wall-clock source and timestamp-derived record ids.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" for record timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Issues decimal millisecond ids that strictly increase within one desk.
///
/// Two records created in the same millisecond get `t` and `t + 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdSource {
    last: i64,
}

impl IdSource {
    /// Make sure future ids sort after every numeric id in `existing`.
    pub fn prime<'a>(&mut self, existing: impl IntoIterator<Item = &'a str>) {
        for id in existing {
            if let Ok(n) = id.parse::<i64>() {
                self.last = self.last.max(n);
            }
        }
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let candidate = now.timestamp_millis();
        self.last = if candidate > self.last {
            candidate
        } else {
            self.last.saturating_add(1)
        };
        self.last.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-02-01T12:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn same_millisecond_ids_are_distinct() {
        let mut ids = IdSource::default();
        let a = ids.next_id(t0());
        let b = ids.next_id(t0());
        assert_eq!(a, t0().timestamp_millis().to_string());
        assert_eq!(b, (t0().timestamp_millis() + 1).to_string());
    }

    #[test]
    fn primed_source_skips_loaded_ids() {
        let mut ids = IdSource::default();
        let far_future = (t0().timestamp_millis() + 10_000).to_string();
        ids.prime(["1", "not-a-number", far_future.as_str()]);
        let next: i64 = ids.next_id(t0()).parse().expect("numeric id");
        assert_eq!(next, t0().timestamp_millis() + 10_001);
    }

    #[test]
    fn loaded_max_id_does_not_overflow() {
        let mut ids = IdSource::default();
        let max = i64::MAX.to_string();
        ids.prime([max.as_str()]);
        assert_eq!(ids.next_id(t0()), max);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at(t0());
        let other = clock.clone();
        clock.advance(Duration::seconds(5));
        assert_eq!(other.now(), t0() + Duration::seconds(5));
        other.set(t0());
        assert_eq!(clock.now(), t0());
    }
}
