//! Decimal amounts <-> smallest-unit integers.
//!
//! Plain decimal notation only: no sign, no exponent, no grouping. Token
//! amounts are `BigUint` because wei values routinely exceed `u64`.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{MixerError, MixerResult};

pub const AMOUNT_REQUIRED: &str = "Amount is required";
pub const AMOUNT_INVALID: &str = "Please enter a valid amount greater than 0";

/// Splits `"12.340"` into the integer `12340` and its scale `3`.
pub fn parse_decimal(text: &str) -> Option<(BigUint, usize)> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{}{}", whole, frac);
    let mantissa = BigUint::parse_bytes(digits.as_bytes(), 10)?;
    Some((mantissa, frac.len()))
}

/// `"1.5"` with 6 decimals -> `1500000`.
pub fn parse_units(text: &str, decimals: u8) -> MixerResult<BigUint> {
    let (mantissa, scale) = parse_decimal(text)
        .ok_or_else(|| MixerError::Validation(format!("Invalid amount: {}", text.trim())))?;

    let decimals = decimals as usize;
    if scale > decimals {
        return Err(MixerError::Validation(format!(
            "Amount {} has more than {} decimal places",
            text.trim(),
            decimals
        )));
    }

    Ok(mantissa * pow10(decimals - scale))
}

/// `1500000` with 6 decimals -> `"1.5"`. Always keeps one fractional digit.
pub fn format_units(value: &BigUint, decimals: u8) -> String {
    let decimals = decimals as usize;
    let digits = value.to_str_radix(10);
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Rejects empty, non-numeric and non-positive amounts with the user-facing
/// messages.
pub fn validate_amount(text: &str) -> MixerResult<()> {
    if text.trim().is_empty() {
        return Err(MixerError::Validation(AMOUNT_REQUIRED.into()));
    }
    match parse_decimal(text) {
        Some((mantissa, _)) if !mantissa.is_zero() => Ok(()),
        _ => Err(MixerError::Validation(AMOUNT_INVALID.into())),
    }
}

pub fn pow10(exp: usize) -> BigUint {
    BigUint::from(10u8).pow(exp as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fraction() {
        assert_eq!(parse_units("1", 18).unwrap(), pow10(18));
        assert_eq!(parse_units("1.5", 6).unwrap(), BigUint::from(1_500_000u32));
        assert_eq!(parse_units("0.001", 18).unwrap(), pow10(15));
        assert_eq!(parse_units(".5", 1).unwrap(), BigUint::from(5u8));
        assert_eq!(parse_units("2.", 2).unwrap(), BigUint::from(200u16));
    }

    #[test]
    fn parse_rejects_excess_precision() {
        let err = parse_units("0.1234567", 6).unwrap_err();
        assert!(matches!(err, MixerError::Validation(_)));
    }

    #[test]
    fn parse_rejects_non_plain_notation() {
        for bad in ["", ".", "-1", "+1", "1e18", "1,000", "0x10", "1.2.3", "abc"] {
            assert!(parse_units(bad, 18).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn format_trims_but_keeps_one_digit() {
        assert_eq!(format_units(&pow10(18), 18), "1.0");
        assert_eq!(format_units(&BigUint::from(1_500_000u32), 6), "1.5");
        assert_eq!(format_units(&BigUint::from(1u8), 6), "0.000001");
        assert_eq!(format_units(&BigUint::zero(), 18), "0.0");
        assert_eq!(format_units(&BigUint::from(12345u32), 0), "12345.0");
    }

    #[test]
    fn wei_beyond_u64() {
        let text = "123456789.123456789012345678";
        let wei = parse_units(text, 18).unwrap();
        assert!(wei > BigUint::from(u64::MAX));
        assert_eq!(format_units(&wei, 18), text);
    }

    #[test]
    fn validate_amount_messages() {
        assert_eq!(
            validate_amount("  ").unwrap_err(),
            MixerError::Validation(AMOUNT_REQUIRED.into())
        );
        for bad in ["0", "0.000", "abc", "-3"] {
            assert_eq!(
                validate_amount(bad).unwrap_err(),
                MixerError::Validation(AMOUNT_INVALID.into())
            );
        }
        assert!(validate_amount("0.0001").is_ok());
    }
}
