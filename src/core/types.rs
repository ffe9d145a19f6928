//! Core types - Strong typing for safety

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fractional digits carried by base-asset quantities (amount, collateral, fees).
pub const BASE_ASSET_DECIMALS: u32 = 4;

/// Fractional digits carried by fiat quantities (price, volume).
pub const FIAT_DECIMALS: u32 = 2;

/// Offer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// The two denominations with distinct precision rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
    BaseAsset,
    Fiat,
}

impl Denomination {
    pub fn decimals(self) -> u32 {
        match self {
            Denomination::BaseAsset => BASE_ASSET_DECIMALS,
            Denomination::Fiat => FIAT_DECIMALS,
        }
    }
}

/// Editable fields of an offer draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Amount,
    MinAmount,
    Price,
    Volume,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Amount, Field::MinAmount, Field::Price, Field::Volume];

    pub fn denomination(self) -> Denomination {
        match self {
            Field::Amount | Field::MinAmount => Denomination::BaseAsset,
            Field::Price | Field::Volume => Denomination::Fiat,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Amount => write!(f, "amount"),
            Field::MinAmount => write!(f, "min_amount"),
            Field::Price => write!(f, "price"),
            Field::Volume => write!(f, "volume"),
        }
    }
}

/// Offer identifier (also used in the payment label)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(Uuid);

impl OfferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OfferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OfferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Funding address handed out by the wallet. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub offer_id: OfferId,
    pub address: String,
}

/// Transaction identifier returned by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fee estimate from the wallet, in base-asset units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub offer_fee: Decimal,
    pub network_fee: Decimal,
}

impl FeeEstimate {
    pub fn total(&self) -> Decimal {
        self.offer_fee + self.network_fee
    }
}

/// Order-book filter snapshot used to seed a new draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookFilter {
    pub direction: Direction,
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// Payment-account and locale terms of an offer. Supplied from outside and
/// carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferTerms {
    /// Payment method, e.g. "SEPA"
    pub bank_account_type: String,
    pub bank_account_currency: String,
    pub bank_account_country: String,
    /// Country codes the offer is open to
    pub accepted_countries: Vec<String>,
    /// Language codes the offerer accepts
    pub accepted_languages: Vec<String>,
}

/// Read-only copy of a fully reconciled draft, handed to the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSnapshot {
    pub offer_id: OfferId,
    pub direction: Direction,
    pub amount: Decimal,
    pub min_amount: Decimal,
    pub price: Decimal,
    pub volume: Decimal,
    pub collateral: Decimal,
    pub total_fees: Decimal,
    pub total_to_pay: Decimal,
    pub address: String,
    pub terms: OfferTerms,
    pub created_at: DateTime<Utc>,
}
