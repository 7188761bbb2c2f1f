//! Fixed-Point Arithmetic
//!
//! All prices and values are unsigned integers scaled by `PRICE_SCALE` (10^18).
//! Every division rounds down. Intermediate products are carried in 256 bits
//! so `a * b * c / d` never overflows before the final narrowing.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use super::error::RebalanceError;

/// Decimal places carried by every price and value
pub const PRICE_DECIMALS: u32 = 18;

/// 10^18
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Baskets are issued with 18 decimals, like the prices that value them
pub const BASKET_DECIMALS: u32 = 18;

/// 10^exp, failing on overflow (exp > 38)
pub fn pow10(exp: u32) -> Result<u128, RebalanceError> {
    10u128
        .checked_pow(exp)
        .ok_or_else(|| RebalanceError::Overflow(format!("10^{}", exp)))
}

/// floor(Π numerators / Π denominators) with 256-bit intermediates
pub fn mul_div(numerators: &[u128], denominators: &[u128]) -> Result<u128, RebalanceError> {
    let numerator = product(numerators)?;
    let denominator = product(denominators)?;
    if denominator.is_zero() {
        return Err(RebalanceError::DivisionByZero(
            "fixed-point denominator is zero".to_string(),
        ));
    }
    narrow(numerator / denominator)
}

/// Π values as U256, failing on 256-bit overflow
pub fn product(values: &[u128]) -> Result<U256, RebalanceError> {
    values.iter().try_fold(U256::from(1u8), |acc, &v| {
        acc.checked_mul(U256::from(v))
            .ok_or_else(|| RebalanceError::Overflow("256-bit product".to_string()))
    })
}

/// Narrow a U256 back to u128
pub fn narrow(value: U256) -> Result<u128, RebalanceError> {
    u128::try_from(value).map_err(|_| RebalanceError::Overflow(format!("{} exceeds u128", value)))
}

/// Convert a human-readable decimal (e.g. `150.25`) into a 10^18-scaled integer.
/// Digits beyond 18 places are truncated.
pub fn to_scaled(value: Decimal) -> Result<u128, RebalanceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(RebalanceError::InvalidInput(format!(
            "negative price {}",
            value
        )));
    }
    let mantissa = value.mantissa().unsigned_abs();
    let scale = value.scale();
    if scale <= PRICE_DECIMALS {
        mantissa
            .checked_mul(pow10(PRICE_DECIMALS - scale)?)
            .ok_or_else(|| RebalanceError::Overflow(format!("{} scaled by 1e18", value)))
    } else {
        Ok(mantissa / pow10(scale - PRICE_DECIMALS)?)
    }
}

/// Convert a 10^18-scaled integer back into a decimal for display
pub fn from_scaled(value: u128) -> Result<Decimal, RebalanceError> {
    let signed = i128::try_from(value)
        .map_err(|_| RebalanceError::Overflow(format!("{} exceeds i128", value)))?;
    Decimal::try_from_i128_with_scale(signed, PRICE_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| RebalanceError::Overflow(format!("{} as decimal: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0).unwrap(), 1);
        assert_eq!(pow10(18).unwrap(), PRICE_SCALE);
        assert!(matches!(pow10(39), Err(RebalanceError::Overflow(_))));
    }

    #[test]
    fn test_mul_div_rounds_down() {
        assert_eq!(mul_div(&[10], &[3]).unwrap(), 3);
        assert_eq!(mul_div(&[2, 5], &[3]).unwrap(), 3);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e30 / 1e25 overflows u128 mid-way but not at the end
        let big = pow10(30).unwrap();
        assert_eq!(mul_div(&[big, big], &[pow10(25).unwrap()]).unwrap(), pow10(35).unwrap());
    }

    #[test]
    fn test_mul_div_zero_denominator() {
        assert!(matches!(mul_div(&[1], &[0]), Err(RebalanceError::DivisionByZero(_))));
    }

    #[test]
    fn test_mul_div_result_overflow() {
        let big = pow10(38).unwrap();
        assert!(matches!(mul_div(&[big, big], &[1]), Err(RebalanceError::Overflow(_))));
    }

    #[test]
    fn test_to_scaled() {
        let d = Decimal::from_str("150.25").unwrap();
        assert_eq!(to_scaled(d).unwrap(), 150_250_000_000_000_000_000);
        assert_eq!(to_scaled(Decimal::ONE).unwrap(), PRICE_SCALE);
        assert!(to_scaled(Decimal::from_str("-1").unwrap()).is_err());
    }

    #[test]
    fn test_from_scaled() {
        let d = from_scaled(140 * PRICE_SCALE).unwrap();
        assert_eq!(d, Decimal::from(140));
        let d = from_scaled(PRICE_SCALE / 4).unwrap();
        assert_eq!(d.to_string(), "0.25");
    }
}
