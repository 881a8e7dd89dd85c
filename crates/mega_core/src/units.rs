//! Conversion between human token amounts and on-chain base units.

use rust_decimal::Decimal;
use thiserror::Error;

/// Largest scale a [`Decimal`] can carry.
pub const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("amount {amount} has more than {decimals} decimal places")]
    FractionalRemainder { amount: Decimal, decimals: u32 },

    #[error("amount {0} overflows the base unit range")]
    Overflow(Decimal),

    #[error("unsupported decimals: {0}")]
    UnsupportedDecimals(u32),
}

/// Scale `amount` by `10^decimals` exactly.
///
/// Any digits left after the shift are rejected rather than truncated.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u128, UnitsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitsError::Negative(amount));
    }
    let amount = amount.normalize();
    let mantissa = amount.mantissa().unsigned_abs();
    let scale = amount.scale();

    if decimals >= scale {
        pow10(decimals - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or(UnitsError::Overflow(amount))
    } else {
        let divisor = pow10(scale - decimals).ok_or(UnitsError::Overflow(amount))?;
        if mantissa % divisor != 0 {
            return Err(UnitsError::FractionalRemainder { amount, decimals });
        }
        Ok(mantissa / divisor)
    }
}

/// Inverse of [`to_base_units`], for display.
pub fn from_base_units(units: u128, decimals: u32) -> Result<Decimal, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    let mantissa = i128::try_from(units).map_err(|_| UnitsError::Overflow(Decimal::MAX))?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map(|d| d.normalize())
        .map_err(|_| UnitsError::Overflow(Decimal::MAX))
}

fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn scales_whole_amounts() {
        assert_eq!(to_base_units(dec("5"), 6).unwrap(), 5_000_000);
        assert_eq!(to_base_units(dec("0"), 6).unwrap(), 0);
        assert_eq!(to_base_units(dec("12"), 0).unwrap(), 12);
    }

    #[test]
    fn scales_fractional_amounts_exactly() {
        assert_eq!(to_base_units(dec("1.5"), 2).unwrap(), 150);
        assert_eq!(to_base_units(dec("0.000001"), 6).unwrap(), 1);
        // Trailing zeros past the token precision are harmless.
        assert_eq!(to_base_units(dec("2.500"), 1).unwrap(), 25);
    }

    #[test]
    fn rejects_extra_precision() {
        assert_eq!(
            to_base_units(dec("1.234"), 2),
            Err(UnitsError::FractionalRemainder { amount: dec("1.234"), decimals: 2 })
        );
    }

    #[test]
    fn rejects_negative_and_overflow() {
        assert!(matches!(to_base_units(dec("-1"), 6), Err(UnitsError::Negative(_))));
        assert!(matches!(to_base_units(dec("1"), 40), Err(UnitsError::Overflow(_))));
        assert!(matches!(
            to_base_units(Decimal::MAX, 20),
            Err(UnitsError::Overflow(_))
        ));
    }

    #[test]
    fn formats_base_units() {
        assert_eq!(from_base_units(5_000_000, 6).unwrap(), dec("5"));
        assert_eq!(from_base_units(150, 2).unwrap(), dec("1.5"));
        assert!(from_base_units(1, 29).is_err());
    }
}
