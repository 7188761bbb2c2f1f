//! Relative Strength Index
//!
//! RSI over the most recent `period + 1` stored values:
//! `rsi = 100 * gains / (gains + losses)`, scaled by `RSI_SCALE`.
//! A window with no losses reads 100, a flat window reads 50.

use crate::domain::{mul_div, RebalanceError, PRICE_SCALE};

use super::series::SeriesReader;

/// RSI values are scaled like prices: 70 is `70 * RSI_SCALE`
pub const RSI_SCALE: u128 = PRICE_SCALE;

#[derive(Debug, Clone)]
pub struct RsiOracle {
    series: SeriesReader,
}

impl RsiOracle {
    pub fn new(series: SeriesReader) -> Self {
        Self { series }
    }

    pub fn read(&self, period: u32) -> Result<u128, RebalanceError> {
        if period == 0 {
            return Err(RebalanceError::InvalidRange {
                value: 0,
                min: 1,
                max: self.series.capacity().saturating_sub(1) as u64,
            });
        }
        // newest first
        let values = self.series.read(period as usize + 1)?;

        let (mut gains, mut losses) = (0u128, 0u128);
        for pair in values.windows(2) {
            let (newer, older) = (pair[0], pair[1]);
            if newer >= older {
                gains = gains.checked_add(newer - older).ok_or_else(overflow)?;
            } else {
                losses = losses.checked_add(older - newer).ok_or_else(overflow)?;
            }
        }

        if gains == 0 && losses == 0 {
            return Ok(50 * RSI_SCALE);
        }
        if losses == 0 {
            return Ok(100 * RSI_SCALE);
        }
        let total = gains.checked_add(losses).ok_or_else(overflow)?;
        mul_div(&[100 * RSI_SCALE, gains], &[total])
    }
}

fn overflow() -> RebalanceError {
    RebalanceError::Overflow("rsi accumulation".to_string())
}
