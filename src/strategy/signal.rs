//! Trend Signals
//!
//! Instantaneous readings that triggers confirm over time:
//! - `MovingAverageCrossover`: spot above the average is bullish, below is bearish
//! - `RsiBands`: RSI at or above the upper band is bullish, at or below the lower is bearish

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::RebalanceError;
use crate::oracle::{MovingAverage, RsiOracle, SpotPrice, RSI_SCALE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    pub fn from_bullish(bullish: bool) -> Self {
        if bullish {
            Self::Bullish
        } else {
            Self::Bearish
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Bullish => write!(f, "bullish"),
            Bias::Bearish => write!(f, "bearish"),
            Bias::Neutral => write!(f, "neutral"),
        }
    }
}

pub trait TrendSignal: Send + Sync {
    fn name(&self) -> String;

    fn bias(&self) -> Result<Bias, RebalanceError>;
}

/// Spot price against a moving average of the same series
pub struct MovingAverageCrossover {
    spot: Arc<dyn SpotPrice>,
    average: Arc<dyn MovingAverage>,
    window: u32,
}

impl MovingAverageCrossover {
    pub fn new(spot: Arc<dyn SpotPrice>, average: Arc<dyn MovingAverage>, window: u32) -> Self {
        Self { spot, average, window }
    }

    /// Spot and average as read right now
    pub fn readings(&self) -> Result<(u128, u128), RebalanceError> {
        Ok((self.spot.spot()?, self.average.read(self.window)?))
    }
}

impl TrendSignal for MovingAverageCrossover {
    fn name(&self) -> String {
        format!("{}({}) crossover", self.average.name(), self.window)
    }

    fn bias(&self) -> Result<Bias, RebalanceError> {
        let (spot, average) = self.readings()?;
        let bias = match spot.cmp(&average) {
            std::cmp::Ordering::Greater => Bias::Bullish,
            std::cmp::Ordering::Less => Bias::Bearish,
            std::cmp::Ordering::Equal => Bias::Neutral,
        };
        tracing::debug!("{}: spot {} vs average {} -> {}", self.name(), spot, average, bias);
        Ok(bias)
    }
}

/// RSI trending bands
pub struct RsiBands {
    rsi: RsiOracle,
    period: u32,
    lower: u128,
    upper: u128,
}

impl RsiBands {
    /// Bounds are RSI-scaled (`70 * RSI_SCALE`); requires `lower < upper <= 100`
    pub fn new(rsi: RsiOracle, period: u32, lower: u128, upper: u128) -> Result<Self, RebalanceError> {
        if lower >= upper {
            return Err(RebalanceError::InvariantViolation(format!(
                "RSI lower bound {} must be below upper bound {}",
                lower, upper
            )));
        }
        if upper > 100 * RSI_SCALE {
            return Err(RebalanceError::InvalidInput(format!("RSI upper bound {} above 100", upper)));
        }
        Ok(Self { rsi, period, lower, upper })
    }
}

impl TrendSignal for RsiBands {
    fn name(&self) -> String {
        format!("RSI({}) bands", self.period)
    }

    fn bias(&self) -> Result<Bias, RebalanceError> {
        let value = self.rsi.read(self.period)?;
        Ok(if value >= self.upper {
            Bias::Bullish
        } else if value <= self.lower {
            Bias::Bearish
        } else {
            Bias::Neutral
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::PRICE_SCALE;
    use crate::oracle::{FixedPrice, MovingAverageOracle, PriceSeriesStore, SeriesConfig};
    use std::sync::Mutex;

    /// Signal whose reading is set by the test
    pub(crate) struct StubSignal {
        pub(crate) bias: Arc<Mutex<Bias>>,
    }

    impl StubSignal {
        pub(crate) fn new(bias: Bias) -> (Self, Arc<Mutex<Bias>>) {
            let shared = Arc::new(Mutex::new(bias));
            (Self { bias: Arc::clone(&shared) }, shared)
        }
    }

    impl TrendSignal for StubSignal {
        fn name(&self) -> String {
            "stub".to_string()
        }

        fn bias(&self) -> Result<Bias, RebalanceError> {
            Ok(*self.bias.lock().unwrap())
        }
    }

    fn create_test_average(seed: u128) -> Arc<dyn MovingAverage> {
        let config = SeriesConfig { capacity: 5, ..Default::default() };
        let (_writer, reader) = PriceSeriesStore::new(config, seed, 1_000_000).unwrap().into_shared();
        Arc::new(MovingAverageOracle::new(reader))
    }

    #[test]
    fn test_crossover_bias() {
        let average = create_test_average(100 * PRICE_SCALE);

        let above = MovingAverageCrossover::new(Arc::new(FixedPrice(101 * PRICE_SCALE)), Arc::clone(&average), 5);
        assert_eq!(above.bias().unwrap(), Bias::Bullish);

        let below = MovingAverageCrossover::new(Arc::new(FixedPrice(99 * PRICE_SCALE)), Arc::clone(&average), 5);
        assert_eq!(below.bias().unwrap(), Bias::Bearish);

        let equal = MovingAverageCrossover::new(Arc::new(FixedPrice(100 * PRICE_SCALE)), average, 5);
        assert_eq!(equal.bias().unwrap(), Bias::Neutral);
        assert_eq!(equal.name(), "SMA(5) crossover");
    }

    #[test]
    fn test_crossover_propagates_window_error() {
        let average = create_test_average(100);
        let signal = MovingAverageCrossover::new(Arc::new(FixedPrice(1)), average, 6);
        assert!(matches!(signal.bias(), Err(RebalanceError::InvalidRange { .. })));
    }

    #[test]
    fn test_rsi_bands_validation() {
        let config = SeriesConfig { capacity: 15, ..Default::default() };
        let (_writer, reader) = PriceSeriesStore::new(config, 100, 1_000_000).unwrap().into_shared();
        let rsi = RsiOracle::new(reader);

        assert!(matches!(
            RsiBands::new(rsi.clone(), 14, 70 * RSI_SCALE, 30 * RSI_SCALE),
            Err(RebalanceError::InvariantViolation(_))
        ));
        assert!(RsiBands::new(rsi.clone(), 14, 30 * RSI_SCALE, 101 * RSI_SCALE).is_err());

        // flat series reads 50: between the bands
        let bands = RsiBands::new(rsi, 14, 30 * RSI_SCALE, 70 * RSI_SCALE).unwrap();
        assert_eq!(bands.bias().unwrap(), Bias::Neutral);
    }
}
