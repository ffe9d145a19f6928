//! Configuration - Type-safe, validated config
//!
//! Loads from `offer.toml`. Floats are converted to `Decimal` once, in
//! [`Config::policy`], so the engine never touches binary floating point.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::{Error, Result, FeeEstimate, OfferTerms};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Offer composition settings
    #[serde(default)]
    pub offer: OfferConfig,

    /// Paper wallet settings
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Payment-account and locale terms attached to every offer
    #[serde(default)]
    pub terms: OfferTerms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level (overridden by RUST_LOG)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferConfig {
    /// Currency code of the base asset (e.g. "BTC")
    pub base_asset_code: String,

    /// Currency code of the fiat leg (e.g. "EUR")
    pub fiat_code: String,

    /// Collateral as a fraction of amount (e.g. 0.1 = 10%)
    pub collateral_ratio: f64,

    /// Largest accepted base-asset quantity
    #[serde(default = "default_base_asset_max")]
    pub base_asset_max: f64,

    /// Largest accepted fiat quantity
    #[serde(default = "default_fiat_max")]
    pub fiat_max: f64,
}

fn default_base_asset_max() -> f64 {
    21_000_000.0
}
fn default_fiat_max() -> f64 {
    1_000_000.0
}

impl Default for OfferConfig {
    fn default() -> Self {
        Self {
            base_asset_code: "BTC".to_string(),
            fiat_code: "EUR".to_string(),
            collateral_ratio: 0.1,
            base_asset_max: default_base_asset_max(),
            fiat_max: default_fiat_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Fee charged for creating an offer (base asset)
    pub create_offer_fee: f64,

    /// Network transaction fee (base asset)
    pub network_fee: f64,

    /// Reject every publish (paper wallet only; for exercising the failure path)
    #[serde(default)]
    pub fail_submissions: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            create_offer_fee: 0.001,
            network_fee: 0.0001,
            fail_submissions: false,
        }
    }
}

/// Decimal view of the offer settings, consumed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferPolicy {
    pub base_asset_code: String,
    pub fiat_code: String,
    pub collateral_ratio: Decimal,
    pub base_asset_max: Decimal,
    pub fiat_max: Decimal,
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self {
            base_asset_code: "BTC".to_string(),
            fiat_code: "EUR".to_string(),
            collateral_ratio: Decimal::new(1, 1),
            base_asset_max: Decimal::from(21_000_000),
            fiat_max: Decimal::from(1_000_000),
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.policy()?;
        config.fee_estimate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to built-in defaults.
    pub fn load_default() -> Self {
        let candidates = [
            "offer.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/offer.toml"),
        ];

        for path in &candidates {
            match Self::load(Path::new(path)) {
                Ok(cfg) => {
                    tracing::info!("Loaded config from {}", path);
                    return cfg;
                }
                Err(e) if Path::new(path).exists() => {
                    tracing::warn!("Ignoring {}: {}", path, e);
                }
                Err(_) => {}
            }
        }

        tracing::warn!("No offer.toml found, using defaults");
        Self::default()
    }

    /// Engine-facing offer settings
    pub fn policy(&self) -> Result<OfferPolicy> {
        let offer = &self.offer;
        if offer.base_asset_code.trim().is_empty() || offer.fiat_code.trim().is_empty() {
            return Err(Error::Config("currency codes must not be empty".into()));
        }
        let collateral_ratio = to_decimal("offer.collateral_ratio", offer.collateral_ratio)?;
        if collateral_ratio > Decimal::ONE {
            return Err(Error::Config(format!(
                "offer.collateral_ratio must not exceed 1, got {}",
                collateral_ratio
            )));
        }
        Ok(OfferPolicy {
            base_asset_code: offer.base_asset_code.clone(),
            fiat_code: offer.fiat_code.clone(),
            collateral_ratio: collateral_ratio
                .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero),
            base_asset_max: positive("offer.base_asset_max", offer.base_asset_max)?,
            fiat_max: positive("offer.fiat_max", offer.fiat_max)?,
        })
    }

    /// Fee estimate for the paper wallet
    pub fn fee_estimate(&self) -> Result<FeeEstimate> {
        Ok(FeeEstimate {
            offer_fee: to_decimal("wallet.create_offer_fee", self.wallet.create_offer_fee)?,
            network_fee: to_decimal("wallet.network_fee", self.wallet.network_fee)?,
        })
    }
}

/// Non-negative, finite float to Decimal.
fn to_decimal(key: &str, value: f64) -> Result<Decimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Config(format!("{} must be a non-negative number, got {}", key, value)));
    }
    Decimal::try_from(value)
        .map(|d| d.round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero).normalize())
        .map_err(|e| Error::Config(format!("{} is not representable: {}", key, e)))
}

fn positive(key: &str, value: f64) -> Result<Decimal> {
    let d = to_decimal(key, value)?;
    if d.is_zero() {
        return Err(Error::Config(format!("{} must be larger than 0", key)));
    }
    Ok(d)
}
