//! Core traits - Collaborator seams

use async_trait::async_trait;
use crate::core::{Result, types::*};

/// Wallet collaborator - funding address, fee estimate and publishing
#[async_trait]
pub trait WalletFacade: Send + Sync {
    /// Allocate (or look up) the funding address for an offer
    fn address_entry(&self, offer_id: &OfferId) -> Result<AddressEntry>;

    /// Current fee estimate for creating an offer
    fn fee_estimate(&self) -> FeeEstimate;

    /// Build, sign and broadcast the offer. Completes once the
    /// transaction is published or rejected.
    async fn place_offer(&self, offer: &OfferSnapshot) -> Result<TransactionId>;

    /// Short, stable identifier of the implementation (e.g. "paper").
    /// Only used in log lines.
    fn name(&self) -> &str;
}
