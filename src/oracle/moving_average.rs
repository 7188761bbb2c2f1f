//! Simple Moving Average
//!
//! Stateless reader: arithmetic mean of the most recent `window` stored
//! values, rounded down.

use crate::domain::RebalanceError;

use super::series::SeriesReader;
use super::MovingAverage;

#[derive(Debug, Clone)]
pub struct MovingAverageOracle {
    series: SeriesReader,
}

impl MovingAverageOracle {
    pub fn new(series: SeriesReader) -> Self {
        Self { series }
    }

    pub fn series(&self) -> &SeriesReader {
        &self.series
    }
}

/// floor(Σ values / len); the caller guarantees a non-empty slice
pub(crate) fn mean(values: &[u128]) -> Result<u128, RebalanceError> {
    let sum = values.iter().try_fold(0u128, |acc, &v| {
        acc.checked_add(v)
            .ok_or_else(|| RebalanceError::Overflow("moving average sum".to_string()))
    })?;
    Ok(sum / values.len() as u128)
}

impl MovingAverage for MovingAverageOracle {
    fn name(&self) -> &'static str {
        "SMA"
    }

    fn read(&self, window: u32) -> Result<u128, RebalanceError> {
        let values = self.series.read(window as usize)?;
        mean(&values)
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

    fn create_test_feed(capacity: usize, seed: u128) -> (SeriesWriter, MovingAverageOracle) {
        let config = SeriesConfig {
            capacity,
            update_interval: DAY,
            interpolation_threshold: 3_600,
            ..Default::default()
        };
        let (writer, reader) = PriceSeriesStore::new(config, seed, T0).unwrap().into_shared();
        (writer, MovingAverageOracle::new(reader))
    }

    #[test]
    fn test_seeded_average_is_seed() {
        let (_writer, oracle) = create_test_feed(20, 150 * PRICE_SCALE);
        assert_eq!(oracle.read(20).unwrap(), 150 * PRICE_SCALE);
        assert_eq!(oracle.read(1).unwrap(), 150 * PRICE_SCALE);
    }

    #[test]
    fn test_nineteen_at_150_one_at_140() {
        let (writer, oracle) = create_test_feed(20, 150 * PRICE_SCALE);
        for day in 1..=18 {
            writer.append(150 * PRICE_SCALE, T0 + day * DAY).unwrap();
        }
        writer.append(140 * PRICE_SCALE, T0 + 19 * DAY).unwrap();

        let expected = (19 * 150 * PRICE_SCALE + 140 * PRICE_SCALE) / 20;
        assert_eq!(oracle.read(20).unwrap(), expected);
        assert_eq!(oracle.read(1).unwrap(), 140 * PRICE_SCALE);
    }

    #[test]
    fn test_mean_rounds_down() {
        let (writer, oracle) = create_test_feed(3, 1);
        writer.append(1, T0 + DAY).unwrap();
        writer.append(2, T0 + 2 * DAY).unwrap();
        // (2 + 1 + 1) / 3 = 1.33
        assert_eq!(oracle.read(3).unwrap(), 1);
    }

    #[test]
    fn test_invalid_window() {
        let (_writer, oracle) = create_test_feed(5, 100);
        assert!(matches!(oracle.read(0), Err(RebalanceError::InvalidRange { .. })));
        assert!(matches!(oracle.read(6), Err(RebalanceError::InvalidRange { .. })));
    }

    #[test]
    fn test_average_matches_history_for_random_windows() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..20u64 {
            let capacity = rng.gen_range(1..40usize);
            let seed = rng.gen_range(1..1_000u128) * PRICE_SCALE;
            let (writer, oracle) = create_test_feed(capacity, seed);

            let mut history = vec![seed; capacity];
            let appends = rng.gen_range(0..80u64);
            for day in 1..=appends {
                let price = rng.gen_range(1..1_000_000u128) * PRICE_SCALE / 7;
                writer.append(price, T0 + day * DAY).unwrap();
                history.push(price);
            }

            for window in 1..=capacity {
                let tail = &history[history.len() - window..];
                let expected = tail.iter().sum::<u128>() / window as u128;
                assert_eq!(
                    oracle.read(window as u32).unwrap(),
                    expected,
                    "round {} window {}",
                    round,
                    window
                );
            }
        }
    }
}
