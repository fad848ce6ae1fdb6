//! Sliding-horizon memory of recently seen devices.
//!
//! The cache is the deduplication authority: a digest seen within the
//! horizon is suppressed, and every sighting (suppressed or not) slides
//! that digest's horizon forward. A phone sitting in range all day is
//! therefore recorded once, not once per scan window.
//!
//! Single writer: only the scan loop worker calls into this type. Time is
//! injected so tests can walk the horizon without sleeping.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Last known details for a digest, refreshed on every sighting.
/// Kept for debug logging; never consulted by the dedup decision.
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub address: String,
    pub local_name: Option<String>,
    pub rssi: i16,
}

#[derive(Debug)]
struct MemoryEntry {
    last_seen: DateTime<Utc>,
    summary: DeviceSummary,
}

#[derive(Debug)]
pub struct DeviceMemory {
    horizon: Duration,
    entries: HashMap<String, MemoryEntry>,
}

impl DeviceMemory {
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            entries: HashMap::new(),
        }
    }

    /// Gate a sighting of `digest` at `now`.
    ///
    /// Returns `false` (suppress) when the digest was last seen less than
    /// one horizon ago. Either way the entry's `last_seen` moves to `now`,
    /// so the suppression window slides on every sighting.
    pub fn should_process(
        &mut self,
        digest: &str,
        now: DateTime<Utc>,
        summary: DeviceSummary,
    ) -> bool {
        match self.entries.get_mut(digest) {
            Some(entry) => {
                let within_horizon = now - entry.last_seen < self.horizon;
                entry.last_seen = now;
                entry.summary = summary;
                !within_horizon
            }
            None => {
                self.entries.insert(
                    digest.to_string(),
                    MemoryEntry {
                        last_seen: now,
                        summary,
                    },
                );
                true
            }
        }
    }

    /// Drop entries not seen for longer than the horizon. Called once per
    /// scheduler cycle, not per event, so memory stays bounded regardless
    /// of sighting volume. Returns the number of evicted entries.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let horizon = self.horizon;
        self.entries
            .retain(|_, entry| now - entry.last_seen <= horizon);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last known details for a digest, if still remembered.
    pub fn summary(&self, digest: &str) -> Option<&DeviceSummary> {
        self.entries.get(digest).map(|entry| &entry.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(rssi: i16) -> DeviceSummary {
        DeviceSummary {
            address: "aa:bb:cc:dd:ee:ff".into(),
            local_name: None,
            rssi,
        }
    }

    fn t0() -> DateTime<Utc> {
        "2026-08-26T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn first_sighting_is_processed() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        assert!(cache.should_process("d1", t0(), summary(-60)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sighting_within_horizon_is_suppressed() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        cache.should_process("d1", t0(), summary(-60));
        assert!(!cache.should_process("d1", t0() + Duration::minutes(9), summary(-61)));
    }

    #[test]
    fn sighting_at_exactly_the_horizon_is_processed() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        cache.should_process("d1", t0(), summary(-60));
        assert!(cache.should_process("d1", t0() + Duration::minutes(10), summary(-60)));
    }

    #[test]
    fn suppressed_sighting_slides_the_horizon() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        cache.should_process("d1", t0(), summary(-60));

        // Seen again at t0+9m: suppressed, but the horizon now runs from
        // t0+9m, so t0+18m is still inside it.
        assert!(!cache.should_process("d1", t0() + Duration::minutes(9), summary(-60)));
        assert!(!cache.should_process("d1", t0() + Duration::minutes(18), summary(-60)));
        assert!(cache.should_process("d1", t0() + Duration::minutes(28), summary(-60)));
    }

    #[test]
    fn distinct_digests_do_not_interfere() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        assert!(cache.should_process("d1", t0(), summary(-60)));
        assert!(cache.should_process("d2", t0(), summary(-70)));
    }

    #[test]
    fn sweep_evicts_only_stale_entries() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        cache.should_process("old", t0(), summary(-60));
        cache.should_process("fresh", t0() + Duration::minutes(8), summary(-60));

        let evicted = cache.sweep(t0() + Duration::minutes(11));
        assert_eq!(evicted, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.summary("fresh").is_some());
        assert!(cache.summary("old").is_none());
    }

    #[test]
    fn sweep_keeps_entry_at_exactly_the_horizon() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        cache.should_process("d1", t0(), summary(-60));
        assert_eq!(cache.sweep(t0() + Duration::minutes(10)), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn summary_is_refreshed_on_every_sighting() {
        let mut cache = DeviceMemory::new(Duration::minutes(10));
        cache.should_process("d1", t0(), summary(-60));
        cache.should_process("d1", t0() + Duration::minutes(1), summary(-45));
        assert_eq!(cache.summary("d1").unwrap().rssi, -45);
    }
}
