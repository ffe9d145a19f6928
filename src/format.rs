//! Parsing and formatting of quantities at a fixed precision.
//!
//! Every rounding in the crate goes through [`round_half_up`]: midpoints
//! round away from zero, so `0.66665` becomes `0.6667` at 4 dp.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Trim and normalise a comma decimal separator to a dot.
pub fn clean_input(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

/// Parse user text as a plain decimal number.
///
/// Accepts an optional leading `-`, digits and at most one decimal point
/// (`.5` and `5.` are fine). Exponents, grouping separators and anything
/// else are rejected.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned = clean_input(raw);
    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    if body.is_empty() || !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if body.chars().filter(|c| *c == '.').count() > 1 {
        return None;
    }
    if !body.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let literal = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    };

    let value = Decimal::from_str(&literal).ok()?;
    Some(if negative { -value } else { value })
}

/// Round half-up to `decimals` fractional digits.
pub fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse and round to the given precision.
pub fn parse_at_precision(raw: &str, decimals: u32) -> Option<Decimal> {
    parse_decimal(raw).map(|v| round_half_up(v, decimals))
}

/// Number of significant fractional digits in the text (trailing zeros
/// do not count). `None` if the text is not a number.
pub fn fractional_digits(raw: &str) -> Option<u32> {
    parse_decimal(raw).map(|v| v.normalize().scale())
}

/// Fixed-precision rendering, always showing exactly `decimals` digits.
pub fn format(value: Decimal, decimals: u32) -> String {
    let mut rounded = round_half_up(value, decimals);
    rounded.rescale(decimals);
    rounded.to_string()
}

/// Fixed-precision rendering followed by the currency code.
pub fn format_with_code(value: Decimal, decimals: u32, code: &str) -> String {
    format!("{} {}", format(value, decimals), code)
}

/// Ratio as a percentage with one decimal, e.g. `0.1` → `"10.0 %"`.
pub fn format_percent(ratio: Decimal) -> String {
    format!("{} %", format(ratio * Decimal::ONE_HUNDRED, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_accepts_plain_numbers() {
        assert_eq!(parse_decimal("1.5"), Some(dec!(1.5)));
        assert_eq!(parse_decimal("  42 "), Some(dec!(42)));
        assert_eq!(parse_decimal(".5"), Some(dec!(0.5)));
        assert_eq!(parse_decimal("5."), Some(dec!(5)));
        assert_eq!(parse_decimal("0,25"), Some(dec!(0.25)));
        assert_eq!(parse_decimal("-1"), Some(dec!(-1)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "   ", "abc", "1.2.3", "1e5", "1_000", "+1", ".", "-", "12a", "1 000"] {
            assert_eq!(parse_decimal(raw), None, "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(dec!(0.66665), 4), dec!(0.6667));
        assert_eq!(round_half_up(dec!(0.66664), 4), dec!(0.6666));
        assert_eq!(round_half_up(dec!(333.345), 2), dec!(333.35));
        assert_eq!(round_half_up(dec!(0.125), 2), dec!(0.13));
    }

    #[test]
    fn test_fractional_digits_ignores_trailing_zeros() {
        assert_eq!(fractional_digits("1.00000"), Some(0));
        assert_eq!(fractional_digits("1.12345"), Some(5));
        assert_eq!(fractional_digits("10"), Some(0));
        assert_eq!(fractional_digits("x"), None);
    }

    #[test]
    fn test_format_pads_and_rounds() {
        assert_eq!(format(dec!(1), 4), "1.0000");
        assert_eq!(format(dec!(500), 2), "500.00");
        assert_eq!(format(dec!(333.345), 2), "333.35");
        assert_eq!(format_with_code(dec!(0.1), 4, "BTC"), "0.1000 BTC");
        assert_eq!(format_percent(dec!(0.1)), "10.0 %");
    }
}
