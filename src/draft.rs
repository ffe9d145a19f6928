//! Offer draft - the canonical, numeric source of truth

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::core::{
    AddressEntry, Direction, FeeEstimate, OfferId, OfferSnapshot, OfferTerms,
    BASE_ASSET_DECIMALS, FIAT_DECIMALS,
};
use crate::format::round_half_up;

/// Canonical offer values. `None` means the field has not been committed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferDraft {
    offer_id: OfferId,
    direction: Direction,
    address: AddressEntry,
    terms: OfferTerms,
    created_at: DateTime<Utc>,

    pub(crate) amount: Option<Decimal>,
    pub(crate) min_amount: Option<Decimal>,
    pub(crate) price: Option<Decimal>,
    pub(crate) volume: Option<Decimal>,
    /// Set once the user commits min_amount; until then it follows amount.
    pub(crate) min_amount_pinned: bool,

    collateral_ratio: Decimal,
    pub(crate) collateral: Decimal,
    pub(crate) total_fees: Decimal,
    pub(crate) total_to_pay: Decimal,
}

impl OfferDraft {
    pub fn new(
        direction: Direction,
        address: AddressEntry,
        terms: OfferTerms,
        collateral_ratio: Decimal,
        fees: FeeEstimate,
    ) -> Self {
        let total_fees = round_half_up(fees.total(), BASE_ASSET_DECIMALS);
        Self {
            offer_id: address.offer_id,
            direction,
            address,
            terms,
            created_at: Utc::now(),
            amount: None,
            min_amount: None,
            price: None,
            volume: None,
            min_amount_pinned: false,
            collateral_ratio,
            collateral: Decimal::ZERO,
            total_fees,
            total_to_pay: total_fees,
        }
    }

    pub fn offer_id(&self) -> OfferId {
        self.offer_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn address(&self) -> &AddressEntry {
        &self.address
    }

    pub fn terms(&self) -> &OfferTerms {
        &self.terms
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn min_amount(&self) -> Option<Decimal> {
        self.min_amount
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    pub fn volume(&self) -> Option<Decimal> {
        self.volume
    }

    pub fn collateral_ratio(&self) -> Decimal {
        self.collateral_ratio
    }

    pub fn collateral(&self) -> Decimal {
        self.collateral
    }

    pub fn total_fees(&self) -> Decimal {
        self.total_fees
    }

    pub fn total_to_pay(&self) -> Decimal {
        self.total_to_pay
    }

    /// `true` unless both bounds are set and `min_amount > amount`.
    pub fn is_min_amount_less_or_equal_amount(&self) -> bool {
        match (self.min_amount, self.amount) {
            (Some(min), Some(amount)) => min <= amount,
            _ => true,
        }
    }

    /// Read-only copy for the wallet. `None` while any input is missing.
    pub fn snapshot(&self) -> Option<OfferSnapshot> {
        Some(OfferSnapshot {
            offer_id: self.offer_id,
            direction: self.direction,
            amount: self.amount?,
            min_amount: self.min_amount?,
            price: self.price?,
            volume: self.volume?,
            collateral: self.collateral,
            total_fees: self.total_fees,
            total_to_pay: self.total_to_pay,
            address: self.address.address.clone(),
            terms: self.terms.clone(),
            created_at: self.created_at,
        })
    }

    /// Recompute collateral and total to pay from the current amount.
    pub(crate) fn recalculate_totals(&mut self) {
        let amount = self.amount.unwrap_or(Decimal::ZERO);
        self.collateral = collateral_for(amount, self.collateral_ratio);
        self.total_to_pay = total_to_pay(amount, self.total_fees, self.collateral);
    }
}

/// `round2(amount × price)`
pub fn volume_for(amount: Decimal, price: Decimal) -> Decimal {
    round_half_up(amount * price, FIAT_DECIMALS)
}

/// `round4(volume / price)`. Price must be positive.
pub fn amount_for(volume: Decimal, price: Decimal) -> Decimal {
    debug_assert!(price > Decimal::ZERO, "back-solving amount with non-positive price");
    round_half_up(volume / price, BASE_ASSET_DECIMALS)
}

/// `round4(amount × ratio)`
pub fn collateral_for(amount: Decimal, ratio: Decimal) -> Decimal {
    round_half_up(amount * ratio, BASE_ASSET_DECIMALS)
}

pub fn total_to_pay(amount: Decimal, total_fees: Decimal, collateral: Decimal) -> Decimal {
    amount + total_fees + collateral
}
