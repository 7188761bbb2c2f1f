//! Exponential Moving Average
//!
//! One EMA per registered period, each stored as a checkpoint
//! `{value, sequence}`. Reads lazily replay the smoothing recurrence over
//! every observation written since the checkpoint:
//!
//! ```text
//! ema' = ema + 2/(period+1) * (price - ema)
//!      = (2*price + (period-1)*ema) / (period+1)
//! ```
//!
//! The second form is evaluated in unsigned integers and floored at every
//! step; both forms agree exactly under floor rounding.
//!
//! A checkpoint more than `capacity` observations behind cannot be replayed
//! because the ring has overwritten part of its input. Such reads fail with
//! `InvalidState` until the owner calls `resync`. Callers that hold the
//! writer keep checkpoints current with `sync` after every append.

use alloy_primitives::U256;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::fixed_point::{narrow, product};
use crate::domain::{AccessGuard, Principal, RebalanceError};

use super::moving_average::mean;
use super::series::SeriesReader;
use super::MovingAverage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmaCheckpoint {
    pub value: u128,
    /// Series sequence the value is current up to
    pub sequence: u64,
}

/// One smoothing step, rounded down
pub fn ema_step(ema: u128, price: u128, period: u32) -> Result<u128, RebalanceError> {
    if period == 0 {
        return Err(RebalanceError::InvalidRange { value: 0, min: 1, max: u32::MAX as u64 });
    }
    let weighted_price = product(&[2, price])?;
    let weighted_ema = product(&[u128::from(period - 1), ema])?;
    let numerator = weighted_price
        .checked_add(weighted_ema)
        .ok_or_else(|| RebalanceError::Overflow("ema numerator".to_string()))?;
    narrow(numerator / U256::from(u128::from(period) + 1))
}

#[derive(Debug)]
pub struct EmaOracle {
    series: SeriesReader,
    access: AccessGuard,
    checkpoints: RwLock<BTreeMap<u32, EmaCheckpoint>>,
}

impl EmaOracle {
    pub fn new(series: SeriesReader, owner: Principal) -> Self {
        Self {
            series,
            access: AccessGuard::new(owner),
            checkpoints: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a period, seeding it with the SMA of the last `period` values
    pub fn add_series(&self, caller: &Principal, period: u32) -> Result<(), RebalanceError> {
        self.access.ensure_owner(caller)?;
        self.series.check_range(period as usize)?;

        let mut checkpoints = self.checkpoints.write().unwrap_or_else(PoisonError::into_inner);
        if checkpoints.contains_key(&period) {
            return Err(RebalanceError::AlreadyRegistered(period));
        }

        let sequence = self.series.sequence();
        let seed = mean(&self.series.read(period as usize)?)?;
        checkpoints.insert(period, EmaCheckpoint { value: seed, sequence });
        tracing::info!("Registered EMA period {} seeded at {}", period, seed);
        Ok(())
    }

    /// Reseed a checkpoint that fell out of the ring from the SMA of the
    /// last `period` values
    pub fn resync(&self, caller: &Principal, period: u32) -> Result<u128, RebalanceError> {
        self.access.ensure_owner(caller)?;
        let mut checkpoints = self.checkpoints.write().unwrap_or_else(PoisonError::into_inner);
        let previous = checkpoints
            .get(&period)
            .copied()
            .ok_or(RebalanceError::NotRegistered(period))?;

        let sequence = self.series.sequence();
        let seed = mean(&self.series.read(period as usize)?)?;
        checkpoints.insert(period, EmaCheckpoint { value: seed, sequence });
        tracing::warn!(
            "EMA({}) reseeded at {} after {} observations ({} -> {})",
            period,
            sequence,
            sequence.saturating_sub(previous.sequence),
            previous.value,
            seed
        );
        Ok(seed)
    }

    /// Replay every registered period up to the latest observation
    pub fn sync(&self) -> Result<(), RebalanceError> {
        for period in self.periods() {
            self.read(period)?;
        }
        Ok(())
    }

    pub fn remove_series(&self, caller: &Principal, period: u32) -> Result<(), RebalanceError> {
        self.access.ensure_owner(caller)?;
        let mut checkpoints = self.checkpoints.write().unwrap_or_else(PoisonError::into_inner);
        if checkpoints.remove(&period).is_none() {
            return Err(RebalanceError::NotRegistered(period));
        }
        tracing::info!("Removed EMA period {}", period);
        Ok(())
    }

    pub fn periods(&self) -> Vec<u32> {
        self.checkpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Stored checkpoint without replaying
    pub fn checkpoint(&self, period: u32) -> Option<EmaCheckpoint> {
        self.checkpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&period)
            .copied()
    }
}

impl MovingAverage for EmaOracle {
    fn name(&self) -> &'static str {
        "EMA"
    }

    fn read(&self, period: u32) -> Result<u128, RebalanceError> {
        let mut checkpoints = self.checkpoints.write().unwrap_or_else(PoisonError::into_inner);
        let checkpoint = checkpoints
            .get(&period)
            .copied()
            .ok_or(RebalanceError::NotRegistered(period))?;

        let (fresh, sequence) = self.series.fresh_since(checkpoint.sequence);
        if fresh.is_empty() {
            return Ok(checkpoint.value);
        }
        let behind = sequence.saturating_sub(checkpoint.sequence);
        if behind > fresh.len() as u64 {
            return Err(RebalanceError::InvalidState(format!(
                "EMA({}) is {} observations behind a {}-slot series; resync required",
                period,
                behind,
                fresh.len()
            )));
        }

        let value = fresh
            .iter()
            .try_fold(checkpoint.value, |ema, observation| ema_step(ema, observation.value, period))?;
        checkpoints.insert(period, EmaCheckpoint { value, sequence });
        tracing::debug!(
            "EMA({}) replayed {} observations: {} -> {}",
            period,
            fresh.len(),
            checkpoint.value,
            value
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PRICE_SCALE;
    use crate::oracle::series::{PriceSeriesStore, SeriesConfig, SeriesWriter};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const DAY: u64 = 86_400;
    const T0: u64 = 1_700_000_000;

    fn owner() -> Principal {
        Principal::from("ops")
    }

    fn create_test_oracle(capacity: usize, seed: u128) -> (SeriesWriter, EmaOracle) {
        let config = SeriesConfig {
            capacity,
            update_interval: DAY,
            interpolation_threshold: 3_600,
            ..Default::default()
        };
        let (writer, reader) = PriceSeriesStore::new(config, seed, T0).unwrap().into_shared();
        (writer, EmaOracle::new(reader, owner()))
    }

    #[test]
    fn test_ema_step_matches_signed_form() {
        // ema + 2/(p+1) * (price - ema), floored
        assert_eq!(ema_step(100, 130, 2).unwrap(), 120);
        // 100 + 2/27 * (90 - 100) = 99.259...
        assert_eq!(ema_step(100, 90, 26).unwrap(), 99);
        assert_eq!(ema_step(100, 100, 9).unwrap(), 100);
        // period 1 tracks price exactly
        assert_eq!(ema_step(100, 42, 1).unwrap(), 42);
        assert!(ema_step(1, 1, 0).is_err());
    }

    #[test]
    fn test_add_series_seeds_with_sma() {
        let (_writer, oracle) = create_test_oracle(10, 150 * PRICE_SCALE);
        oracle.add_series(&owner(), 5).unwrap();
        assert_eq!(oracle.read(5).unwrap(), 150 * PRICE_SCALE);
        assert_eq!(oracle.periods(), vec![5]);
    }

    #[test]
    fn test_add_series_errors() {
        let (_writer, oracle) = create_test_oracle(10, 100);
        oracle.add_series(&owner(), 5).unwrap();
        assert!(matches!(oracle.add_series(&owner(), 5), Err(RebalanceError::AlreadyRegistered(5))));
        assert!(matches!(
            oracle.add_series(&Principal::from("mallory"), 3),
            Err(RebalanceError::Unauthorized(_))
        ));
        assert!(matches!(oracle.add_series(&owner(), 0), Err(RebalanceError::InvalidRange { .. })));
        assert!(matches!(oracle.add_series(&owner(), 11), Err(RebalanceError::InvalidRange { .. })));
    }

    #[test]
    fn test_remove_series() {
        let (_writer, oracle) = create_test_oracle(10, 100);
        oracle.add_series(&owner(), 3).unwrap();
        oracle.remove_series(&owner(), 3).unwrap();
        assert!(matches!(oracle.read(3), Err(RebalanceError::NotRegistered(3))));
        assert!(matches!(oracle.remove_series(&owner(), 3), Err(RebalanceError::NotRegistered(3))));
    }

    #[test]
    fn test_single_update_follows_recurrence_for_every_period() {
        let (writer, oracle) = create_test_oracle(30, 150 * PRICE_SCALE);
        for day in 1..=10u64 {
            writer.append((150 + day as u128) * PRICE_SCALE, T0 + day * DAY).unwrap();
        }
        let periods = [1u32, 2, 5, 12, 26, 30];
        for &period in &periods {
            oracle.add_series(&owner(), period).unwrap();
        }
        let before: Vec<u128> = periods.iter().map(|&p| oracle.read(p).unwrap()).collect();

        let x = 137 * PRICE_SCALE + 3;
        writer.append(x, T0 + 11 * DAY).unwrap();

        for (&period, &old) in periods.iter().zip(&before) {
            let expected = (2 * x + (period as u128 - 1) * old) / (period as u128 + 1);
            assert_eq!(oracle.read(period).unwrap(), expected, "period {}", period);
        }
    }

    #[test]
    fn test_lazy_replay_equals_eager_replay() {
        let mut rng = StdRng::seed_from_u64(11);
        let (writer, lazy) = create_test_oracle(50, 100 * PRICE_SCALE);
        let eager = EmaOracle::new(writer.reader(), owner());
        lazy.add_series(&owner(), 8).unwrap();
        eager.add_series(&owner(), 8).unwrap();

        for day in 1..=40u64 {
            let price = rng.gen_range(50..200u128) * PRICE_SCALE;
            writer.append(price, T0 + day * DAY).unwrap();
            eager.read(8).unwrap();
        }
        assert_eq!(lazy.read(8).unwrap(), eager.read(8).unwrap());
    }

    #[test]
    fn test_read_beyond_capacity_requires_resync() {
        let (writer, lazy) = create_test_oracle(5, 500 * PRICE_SCALE);
        let eager = EmaOracle::new(writer.reader(), owner());
        lazy.add_series(&owner(), 3).unwrap();
        eager.add_series(&owner(), 3).unwrap();

        for day in 1..=10u64 {
            writer.append((500 + 10 * day as u128) * PRICE_SCALE, T0 + day * DAY).unwrap();
            eager.sync().unwrap();
        }

        // Ten observations behind a five-slot ring: the input is gone
        assert!(matches!(lazy.read(3), Err(RebalanceError::InvalidState(_))));
        assert_eq!(lazy.checkpoint(3).unwrap().sequence, 5);

        assert!(matches!(
            lazy.resync(&Principal::from("mallory"), 3),
            Err(RebalanceError::Unauthorized(_))
        ));
        assert!(matches!(lazy.resync(&owner(), 4), Err(RebalanceError::NotRegistered(4))));

        // (580 + 590 + 600) / 3
        assert_eq!(lazy.resync(&owner(), 3).unwrap(), 590 * PRICE_SCALE);
        assert_eq!(lazy.read(3).unwrap(), 590 * PRICE_SCALE);
        assert!(eager.read(3).unwrap() > 0);
    }

    #[test]
    fn test_read_at_exactly_capacity_behind_replays() {
        let (writer, lazy) = create_test_oracle(5, 100 * PRICE_SCALE);
        let eager = EmaOracle::new(writer.reader(), owner());
        lazy.add_series(&owner(), 3).unwrap();
        eager.add_series(&owner(), 3).unwrap();

        for day in 1..=5u64 {
            writer.append((100 + day as u128) * PRICE_SCALE, T0 + day * DAY).unwrap();
            eager.sync().unwrap();
        }
        assert_eq!(lazy.read(3).unwrap(), eager.read(3).unwrap());
    }

    #[test]
    fn test_read_persists_checkpoint() {
        let (writer, oracle) = create_test_oracle(10, 100);
        oracle.add_series(&owner(), 3).unwrap();
        writer.append(200, T0 + DAY).unwrap();

        let value = oracle.read(3).unwrap();
        let checkpoint = oracle.checkpoint(3).unwrap();
        assert_eq!(checkpoint.value, value);
        assert_eq!(checkpoint.sequence, 11);
        // Idempotent without new data
        assert_eq!(oracle.read(3).unwrap(), value);
    }
}
