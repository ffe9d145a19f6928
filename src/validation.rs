//! Input validation for base-asset and fiat quantities.
//!
//! Validators are plain values built from the [`OfferPolicy`]; they hold no
//! per-call state. Numeric validity and decimal-place precision are checked
//! separately: too many decimals never invalidates input, it only produces
//! a [`Warning::PrecisionTruncated`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Denomination, OfferPolicy, FIAT_DECIMALS};
use crate::format;

pub const MSG_NOT_A_NUMBER: &str = "must be a number";
pub const MSG_NOT_POSITIVE: &str = "must be larger than 0";
pub const MSG_EXCEEDS_PRECISION: &str = "exceeds allowed precision";

/// Verdict for one piece of raw input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, message: None }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self { valid: false, message: Some(message.into()) }
    }
}

/// Non-blocking signal attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Input had more fractional digits than the denomination carries
    PrecisionTruncated { denomination: Denomination },
    /// Back-solving amount from a typed volume could not reproduce it
    VolumeAdjusted { typed: Decimal, implied: Decimal },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::PrecisionTruncated { denomination } => write!(
                f,
                "{}: only {} decimal places are kept",
                MSG_EXCEEDS_PRECISION,
                denomination.decimals()
            ),
            Warning::VolumeAdjusted { typed, implied } => write!(
                f,
                "volume adjusted from {} to {} after rounding the amount",
                format::format(*typed, FIAT_DECIMALS),
                format::format(*implied, FIAT_DECIMALS)
            ),
        }
    }
}

/// Range limits for one denomination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validator {
    denomination: Denomination,
    min: Decimal,
    max: Decimal,
}

impl Validator {
    /// Smallest quantity representable at the denomination's precision
    pub fn smallest_unit(denomination: Denomination) -> Decimal {
        Decimal::new(1, denomination.decimals())
    }

    pub fn new(denomination: Denomination, max: Decimal) -> Self {
        Self {
            denomination,
            min: Self::smallest_unit(denomination),
            max,
        }
    }

    pub fn denomination(&self) -> Denomination {
        self.denomination
    }

    /// Numeric validity of raw text. Decimal places are not considered.
    pub fn validate(&self, raw: &str) -> ValidationResult {
        let Some(value) = format::parse_decimal(raw) else {
            return ValidationResult::invalid(MSG_NOT_A_NUMBER);
        };
        if value <= Decimal::ZERO {
            return ValidationResult::invalid(MSG_NOT_POSITIVE);
        }
        if value < self.min {
            return ValidationResult::invalid(format!("must be at least {}", self.min));
        }
        if value > self.max {
            return ValidationResult::invalid(format!("must not exceed {}", self.max.normalize()));
        }
        ValidationResult::ok()
    }

    /// Precision check, separate from [`Validator::validate`].
    pub fn check_precision(&self, raw: &str) -> Option<Warning> {
        match format::fractional_digits(raw) {
            Some(digits) if digits > self.denomination.decimals() => {
                Some(Warning::PrecisionTruncated { denomination: self.denomination })
            }
            _ => None,
        }
    }

    /// Canonical value of already validated text.
    pub fn canonical(&self, raw: &str) -> Option<Decimal> {
        format::parse_at_precision(raw, self.denomination.decimals())
    }
}

/// Both validators, built once per session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationEngine {
    base_asset: Validator,
    fiat: Validator,
}

impl ValidationEngine {
    pub fn new(policy: &OfferPolicy) -> Self {
        Self {
            base_asset: Validator::new(Denomination::BaseAsset, policy.base_asset_max),
            fiat: Validator::new(Denomination::Fiat, policy.fiat_max),
        }
    }

    pub fn validator(&self, denomination: Denomination) -> &Validator {
        match denomination {
            Denomination::BaseAsset => &self.base_asset,
            Denomination::Fiat => &self.fiat,
        }
    }

    pub fn validate(&self, raw: &str, denomination: Denomination) -> ValidationResult {
        self.validator(denomination).validate(raw)
    }

    pub fn check_precision(&self, raw: &str, denomination: Denomination) -> Option<Warning> {
        self.validator(denomination).check_precision(raw)
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(&OfferPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine() -> ValidationEngine {
        ValidationEngine::default()
    }

    #[test]
    fn test_rejects_non_numeric() {
        let v = engine();
        for raw in ["", "  ", "abc", "1..2"] {
            let result = v.validate(raw, Denomination::BaseAsset);
            assert!(!result.valid);
            assert_eq!(result.message.as_deref(), Some(MSG_NOT_A_NUMBER));
        }
    }

    #[test]
    fn test_rejects_non_positive() {
        let v = engine();
        assert_eq!(
            v.validate("0", Denomination::Fiat),
            ValidationResult::invalid(MSG_NOT_POSITIVE)
        );
        assert_eq!(
            v.validate("-1", Denomination::BaseAsset),
            ValidationResult::invalid(MSG_NOT_POSITIVE)
        );
    }

    #[test]
    fn test_range_limits() {
        let v = engine();
        assert!(!v.validate("0.00001", Denomination::BaseAsset).valid);
        assert!(v.validate("0.0001", Denomination::BaseAsset).valid);
        assert!(!v.validate("0.001", Denomination::Fiat).valid);
        assert!(v.validate("0.01", Denomination::Fiat).valid);
        assert!(!v.validate("21000001", Denomination::BaseAsset).valid);
        assert!(!v.validate("1000000.01", Denomination::Fiat).valid);
    }

    #[test]
    fn test_precision_is_separate_from_validity() {
        let v = engine();
        let raw = "1.123456";
        assert!(v.validate(raw, Denomination::BaseAsset).valid);
        assert_eq!(
            v.check_precision(raw, Denomination::BaseAsset),
            Some(Warning::PrecisionTruncated { denomination: Denomination::BaseAsset })
        );
        assert_eq!(v.check_precision("1.1234", Denomination::BaseAsset), None);
        assert_eq!(v.check_precision("1.10000", Denomination::Fiat), None);
        assert!(v.check_precision("1.123", Denomination::Fiat).is_some());
    }

    #[test]
    fn test_canonical_rounds_half_up() {
        let v = engine();
        let base = v.validator(Denomination::BaseAsset);
        assert_eq!(base.canonical("0.66665"), Some(dec!(0.6667)));
        let fiat = v.validator(Denomination::Fiat);
        assert_eq!(fiat.canonical("333,335"), Some(dec!(333.34)));
    }
}
