//! Price Series Store
//!
//! Fixed-capacity ring buffer of price observations. Slots live in a plain
//! array; a cursor marks the oldest slot and wraps modulo capacity.
//!
//! The store is seeded at construction so every slot holds a well-formed
//! point, and late feed updates are back-filled at the expected cadence, so
//! readers never branch on feed availability.
//!
//! Invariants:
//! - timestamps are non-decreasing and spaced by exactly `update_interval`
//! - `sequence` counts every observation ever written (seed included)

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::domain::{mul_div, RebalanceError};

use super::SpotPrice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: u64,
    /// 10^18-scaled price
    pub value: u128,
}

/// How missed update slots are filled when the feed is late
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationPolicy {
    /// Repeat the most recently observed value
    #[default]
    HoldLast,
    /// Interpolate linearly between the last recorded and the new value
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Number of slots in the ring
    pub capacity: usize,
    /// Seconds between consecutive observations
    pub update_interval: u64,
    /// Grace period after an expected slot before it counts as missed
    pub interpolation_threshold: u64,
    #[serde(default)]
    pub policy: InterpolationPolicy,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            capacity: 200,
            update_interval: 86_400,
            interpolation_threshold: 3_600,
            policy: InterpolationPolicy::HoldLast,
        }
    }
}

impl SeriesConfig {
    pub fn validate(&self) -> Result<(), RebalanceError> {
        if self.capacity == 0 {
            return Err(RebalanceError::InvalidInput("series capacity must be positive".to_string()));
        }
        if self.update_interval == 0 {
            return Err(RebalanceError::InvalidInput("update interval must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PriceSeriesStore {
    config: SeriesConfig,
    slots: Vec<PriceObservation>,
    /// Index of the oldest slot, i.e. the next one to be overwritten
    cursor: usize,
    sequence: u64,
}

impl PriceSeriesStore {
    /// Create a store with every slot seeded with `seed_value`, the newest
    /// at `seed_timestamp` and older ones back-dated by `update_interval`.
    pub fn new(config: SeriesConfig, seed_value: u128, seed_timestamp: u64) -> Result<Self, RebalanceError> {
        config.validate()?;
        let capacity = config.capacity;
        let slots = (0..capacity)
            .map(|i| {
                let steps_back = (capacity - 1 - i) as u64;
                PriceObservation {
                    timestamp: seed_timestamp
                        .saturating_sub(steps_back.saturating_mul(config.update_interval)),
                    value: seed_value,
                }
            })
            .collect();

        tracing::debug!(
            "Seeded price series: capacity {}, interval {}s, seed {} at {}",
            capacity,
            config.update_interval,
            seed_value,
            seed_timestamp
        );

        Ok(Self {
            config,
            slots,
            cursor: 0,
            sequence: capacity as u64,
        })
    }

    /// Split into the single writer handle and a cloneable reader
    pub fn into_shared(self) -> (SeriesWriter, SeriesReader) {
        let inner = Arc::new(RwLock::new(self));
        (
            SeriesWriter { inner: Arc::clone(&inner) },
            SeriesReader { inner },
        )
    }

    pub fn config(&self) -> &SeriesConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn latest(&self) -> PriceObservation {
        self.slots[self.newest_index(0)]
    }

    /// Earliest timestamp at which `append` will be accepted
    pub fn next_earliest_update(&self) -> u64 {
        self.latest().timestamp.saturating_add(self.config.update_interval)
    }

    /// Record a new observation, back-filling missed slots first.
    /// Returns the number of points written.
    pub fn append(&mut self, value: u128, timestamp: u64) -> Result<usize, RebalanceError> {
        let last = self.latest();
        let interval = self.config.update_interval;

        if timestamp < last.timestamp {
            return Err(RebalanceError::InvalidInput(format!(
                "timestamp {} precedes last observation at {}",
                timestamp, last.timestamp
            )));
        }
        let due = self.next_earliest_update();
        if timestamp < due {
            return Err(RebalanceError::Cooldown { now: timestamp, ready_at: due });
        }

        let elapsed = timestamp - last.timestamp;
        let missed = if elapsed <= self.config.interpolation_threshold {
            0
        } else {
            let gap = elapsed - self.config.interpolation_threshold;
            ((gap - 1) / interval).min(elapsed / interval - 1)
        };
        let steps = missed + 1;
        let recorded_at = last.timestamp + steps * interval;

        // Slots older than capacity - 1 would be overwritten immediately
        let backfill = missed.min(self.capacity() as u64 - 1);
        for k in (missed - backfill + 1)..=missed {
            let filled = self.interpolate(last.value, value, k, steps)?;
            self.push(PriceObservation {
                timestamp: last.timestamp + k * interval,
                value: filled,
            });
        }
        if missed > 0 {
            tracing::warn!(
                "Price feed late by {}s: back-filled {} of {} missed slots ({:?})",
                timestamp - (last.timestamp + interval),
                backfill,
                missed,
                self.config.policy
            );
        }

        self.push(PriceObservation { timestamp: recorded_at, value });
        tracing::debug!("Appended price {} at {} (sequence {})", value, recorded_at, self.sequence);
        Ok(backfill as usize + 1)
    }

    /// The `n` most recent values, newest first
    pub fn read(&self, n: usize) -> Result<Vec<u128>, RebalanceError> {
        Ok(self.read_observations(n)?.into_iter().map(|o| o.value).collect())
    }

    /// The `n` most recent observations, newest first
    pub fn read_observations(&self, n: usize) -> Result<Vec<PriceObservation>, RebalanceError> {
        self.check_range(n)?;
        Ok((0..n).map(|i| self.slots[self.newest_index(i)]).collect())
    }

    /// Observations written after `sequence`, oldest first, bounded by capacity
    pub fn observations_since(&self, sequence: u64) -> Vec<PriceObservation> {
        let fresh = self.sequence.saturating_sub(sequence).min(self.capacity() as u64) as usize;
        (0..fresh).rev().map(|i| self.slots[self.newest_index(i)]).collect()
    }

    pub fn check_range(&self, n: usize) -> Result<(), RebalanceError> {
        if n == 0 || n > self.capacity() {
            return Err(RebalanceError::InvalidRange {
                value: n as u64,
                min: 1,
                max: self.capacity() as u64,
            });
        }
        Ok(())
    }

    fn push(&mut self, observation: PriceObservation) {
        self.slots[self.cursor] = observation;
        self.cursor = (self.cursor + 1) % self.capacity();
        self.sequence += 1;
    }

    /// Slot index `age` steps back from the newest
    fn newest_index(&self, age: usize) -> usize {
        let capacity = self.capacity();
        (self.cursor + capacity - 1 - age % capacity) % capacity
    }

    /// Value for the `k`-th of `steps` slots between `from` and `to`, rounded down
    fn interpolate(&self, from: u128, to: u128, k: u64, steps: u64) -> Result<u128, RebalanceError> {
        match self.config.policy {
            InterpolationPolicy::HoldLast => Ok(from),
            InterpolationPolicy::Linear if to >= from => {
                Ok(from + mul_div(&[to - from, k as u128], &[steps as u128])?)
            }
            InterpolationPolicy::Linear => {
                // floor(from - d) == from - ceil(d)
                let scaled = mul_div(&[from - to, k as u128], &[1])?;
                let steps = steps as u128;
                Ok(from - scaled / steps - u128::from(scaled % steps != 0))
            }
        }
    }
}

/// Exclusive write handle held by the designated feed updater
#[derive(Debug)]
pub struct SeriesWriter {
    inner: Arc<RwLock<PriceSeriesStore>>,
}

impl SeriesWriter {
    pub fn append(&self, value: u128, timestamp: u64) -> Result<usize, RebalanceError> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .append(value, timestamp)
    }

    pub fn reader(&self) -> SeriesReader {
        SeriesReader { inner: Arc::clone(&self.inner) }
    }
}

/// Read-only handle; clone freely
#[derive(Debug, Clone)]
pub struct SeriesReader {
    inner: Arc<RwLock<PriceSeriesStore>>,
}

impl SeriesReader {
    fn store(&self) -> RwLockReadGuard<'_, PriceSeriesStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read(&self, n: usize) -> Result<Vec<u128>, RebalanceError> {
        self.store().read(n)
    }

    pub fn read_observations(&self, n: usize) -> Result<Vec<PriceObservation>, RebalanceError> {
        self.store().read_observations(n)
    }

    pub fn observations_since(&self, sequence: u64) -> Vec<PriceObservation> {
        self.store().observations_since(sequence)
    }

    /// Observations after `sequence` together with the sequence they end at,
    /// taken under one lock
    pub fn fresh_since(&self, sequence: u64) -> (Vec<PriceObservation>, u64) {
        let store = self.store();
        (store.observations_since(sequence), store.sequence())
    }

    pub fn latest(&self) -> PriceObservation {
        self.store().latest()
    }

    pub fn sequence(&self) -> u64 {
        self.store().sequence()
    }

    pub fn capacity(&self) -> usize {
        self.store().capacity()
    }

    pub fn check_range(&self, n: usize) -> Result<(), RebalanceError> {
        self.store().check_range(n)
    }

    pub fn next_earliest_update(&self) -> u64 {
        self.store().next_earliest_update()
    }
}

impl SpotPrice for SeriesReader {
    fn spot(&self) -> Result<u128, RebalanceError> {
        Ok(self.latest().value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3_600;
    const T0: u64 = 1_700_000_000;

    fn create_test_store(capacity: usize) -> PriceSeriesStore {
        let config = SeriesConfig {
            capacity,
            update_interval: HOUR,
            interpolation_threshold: 900,
            policy: InterpolationPolicy::HoldLast,
        };
        PriceSeriesStore::new(config, 100, T0).unwrap()
    }

    #[test]
    fn test_seeded_store_is_full() {
        let store = create_test_store(5);
        assert_eq!(store.read(5).unwrap(), vec![100; 5]);
        assert_eq!(store.sequence(), 5);

        let observations = store.read_observations(5).unwrap();
        assert_eq!(observations[0].timestamp, T0);
        assert_eq!(observations[4].timestamp, T0 - 4 * HOUR);
    }

    #[test]
    fn test_invalid_config() {
        let config = SeriesConfig { capacity: 0, ..Default::default() };
        assert!(matches!(
            PriceSeriesStore::new(config, 1, T0),
            Err(RebalanceError::InvalidInput(_))
        ));
        let config = SeriesConfig { update_interval: 0, ..Default::default() };
        assert!(PriceSeriesStore::new(config, 1, T0).is_err());
    }

    #[test]
    fn test_read_range() {
        let store = create_test_store(5);
        assert!(matches!(
            store.read(0),
            Err(RebalanceError::InvalidRange { value: 0, min: 1, max: 5 })
        ));
        assert!(matches!(store.read(6), Err(RebalanceError::InvalidRange { value: 6, .. })));
        assert_eq!(store.read(1).unwrap(), vec![100]);
    }

    #[test]
    fn test_append_newest_first() {
        let mut store = create_test_store(3);
        store.append(101, T0 + HOUR).unwrap();
        store.append(102, T0 + 2 * HOUR).unwrap();
        assert_eq!(store.read(3).unwrap(), vec![102, 101, 100]);
        assert_eq!(store.latest().timestamp, T0 + 2 * HOUR);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut store = create_test_store(3);
        for i in 1..=7u64 {
            store.append(100 + i as u128, T0 + i * HOUR).unwrap();
        }
        assert_eq!(store.read(3).unwrap(), vec![107, 106, 105]);
        assert_eq!(store.sequence(), 10);
    }

    #[test]
    fn test_append_too_early() {
        let mut store = create_test_store(3);
        let result = store.append(101, T0 + HOUR - 1);
        assert!(matches!(
            result,
            Err(RebalanceError::Cooldown { now, ready_at }) if now == T0 + HOUR - 1 && ready_at == T0 + HOUR
        ));
        assert_eq!(store.sequence(), 3);
    }

    #[test]
    fn test_append_out_of_order() {
        let mut store = create_test_store(3);
        assert!(matches!(store.append(101, T0 - 1), Err(RebalanceError::InvalidInput(_))));
    }

    #[test]
    fn test_late_within_threshold_snaps_to_cadence() {
        let mut store = create_test_store(3);
        let written = store.append(101, T0 + HOUR + 600).unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.latest().timestamp, T0 + HOUR);
        assert_eq!(store.next_earliest_update(), T0 + 2 * HOUR);
    }

    #[test]
    fn test_backfill_holds_last_value() {
        let mut store = create_test_store(5);
        // Two expected slots (T0+1h, T0+2h) missed beyond the threshold
        let written = store.append(130, T0 + 3 * HOUR + 100).unwrap();
        assert_eq!(written, 3);

        let observations = store.read_observations(4).unwrap();
        assert_eq!(observations[0], PriceObservation { timestamp: T0 + 3 * HOUR, value: 130 });
        assert_eq!(observations[1], PriceObservation { timestamp: T0 + 2 * HOUR, value: 100 });
        assert_eq!(observations[2], PriceObservation { timestamp: T0 + HOUR, value: 100 });
        assert_eq!(observations[3].timestamp, T0);
    }

    #[test]
    fn test_backfill_linear() {
        let config = SeriesConfig {
            capacity: 5,
            update_interval: HOUR,
            interpolation_threshold: 0,
            policy: InterpolationPolicy::Linear,
        };
        let mut store = PriceSeriesStore::new(config, 100, T0).unwrap();
        store.append(130, T0 + 3 * HOUR).unwrap();
        assert_eq!(store.read(4).unwrap(), vec![130, 120, 110, 100]);

        // Falling prices round down as well: 130 -> 120 over 3 steps
        store.append(120, T0 + 6 * HOUR).unwrap();
        assert_eq!(store.read(3).unwrap(), vec![120, 123, 126]);
    }

    #[test]
    fn test_backfill_bounded_by_capacity() {
        let mut store = create_test_store(3);
        let written = store.append(200, T0 + 50 * HOUR).unwrap();
        assert_eq!(written, 3);
        assert_eq!(store.latest().timestamp, T0 + 50 * HOUR);
        let observations = store.read_observations(3).unwrap();
        assert_eq!(observations[1].timestamp, T0 + 49 * HOUR);
        assert_eq!(observations[2].timestamp, T0 + 48 * HOUR);
    }

    #[test]
    fn test_observations_since() {
        let mut store = create_test_store(4);
        let checkpoint = store.sequence();
        store.append(110, T0 + HOUR).unwrap();
        store.append(120, T0 + 2 * HOUR).unwrap();

        let fresh = store.observations_since(checkpoint);
        assert_eq!(fresh.iter().map(|o| o.value).collect::<Vec<_>>(), vec![110, 120]);
        assert!(store.observations_since(store.sequence()).is_empty());
        // Older than capacity: only what the ring still holds
        assert_eq!(store.observations_since(0).len(), 4);
    }

    #[test]
    fn test_shared_handles() {
        let (writer, reader) = create_test_store(3).into_shared();
        let second_reader = reader.clone();
        writer.append(105, T0 + HOUR).unwrap();
        assert_eq!(reader.latest().value, 105);
        assert_eq!(second_reader.spot().unwrap(), 105);
        assert_eq!(writer.reader().read(2).unwrap(), vec![105, 100]);
    }
}
