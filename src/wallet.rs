//! Paper wallet - in-process `WalletFacade` that records offers instead of
//! broadcasting them

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::{
    AddressEntry, Config, Error, FeeEstimate, OfferId, OfferSnapshot, Result, TransactionId,
    WalletFacade,
};

pub struct PaperWallet {
    fees: FeeEstimate,
    fail_submissions: bool,
    latency: Duration,
    addresses: RwLock<HashMap<OfferId, AddressEntry>>,
    placed: RwLock<Vec<(TransactionId, OfferSnapshot)>>,
}

impl PaperWallet {
    pub fn new(fees: FeeEstimate) -> Self {
        Self {
            fees,
            fail_submissions: false,
            latency: Duration::ZERO,
            addresses: RwLock::new(HashMap::new()),
            placed: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut wallet = Self::new(config.fee_estimate()?);
        wallet.fail_submissions = config.wallet.fail_submissions;
        Ok(wallet)
    }

    /// Reject every publish with a wallet error.
    pub fn failing(mut self) -> Self {
        self.fail_submissions = true;
        self
    }

    /// Delay each publish, to keep a submission in flight for a while.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Offers published so far, oldest first
    pub fn placed_offers(&self) -> Vec<(TransactionId, OfferSnapshot)> {
        self.placed.read().clone()
    }
}

#[async_trait]
impl WalletFacade for PaperWallet {
    fn address_entry(&self, offer_id: &OfferId) -> Result<AddressEntry> {
        let mut addresses = self.addresses.write();
        let entry = addresses.entry(*offer_id).or_insert_with(|| AddressEntry {
            offer_id: *offer_id,
            address: format!("paper-{}", offer_id.as_uuid().simple()),
        });
        debug!("Address for offer {}: {}", offer_id, entry.address);
        Ok(entry.clone())
    }

    fn fee_estimate(&self) -> FeeEstimate {
        self.fees
    }

    async fn place_offer(&self, offer: &OfferSnapshot) -> Result<TransactionId> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.fail_submissions {
            warn!("Paper wallet rejecting offer {}", offer.offer_id);
            return Err(Error::Wallet("paper wallet is configured to reject offers".into()));
        }
        if !self.addresses.read().contains_key(&offer.offer_id) {
            return Err(Error::Wallet(format!("no address allocated for offer {}", offer.offer_id)));
        }

        let tx = TransactionId::new(format!("paper_{}", uuid::Uuid::new_v4()));
        info!(
            "Paper wallet published {} {} @ {} (tx {})",
            offer.direction, offer.amount, offer.price, tx
        );
        self.placed.write().push((tx.clone(), offer.clone()));
        Ok(tx)
    }

    fn name(&self) -> &str {
        "paper"
    }
}
