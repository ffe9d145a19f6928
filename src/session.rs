//! Offer session - owns one draft from creation to publication
//!
//! The session is the only holder of the draft and the field store. Edits go
//! through [`OfferSession::commit`]; placement snapshots the draft, hands the
//! snapshot to the wallet on a tokio task and receives the outcome on a
//! flume channel, applied to the submission state machine by
//! [`OfferSession::poll_submission`] or [`OfferSession::next_submission_event`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{
    Direction, Error, Field, OfferId, OfferPolicy, OfferSnapshot, OfferTerms, OrderBookFilter,
    Result, WalletFacade,
};
use crate::draft::OfferDraft;
use crate::fields::FieldStore;
use crate::format;
use crate::reconcile::{Cascade, ReconciliationEngine};
use crate::submission::{Dispatch, OfferSubmissionController, SubmissionEvent, SubmissionState};

pub struct OfferSession {
    engine: ReconciliationEngine,
    policy: OfferPolicy,
    wallet: Arc<dyn WalletFacade>,
    draft: OfferDraft,
    fields: FieldStore,
    submission: OfferSubmissionController,
    seeded: bool,
    events_tx: flume::Sender<SubmissionEvent>,
    events_rx: flume::Receiver<SubmissionEvent>,
}

/// Serialisable view of everything the presentation layer shows
#[derive(Debug, Clone, Serialize)]
pub struct SessionView<'a> {
    pub offer_id: OfferId,
    pub direction_label: &'static str,
    pub payment_label: String,
    pub address: &'a str,
    pub collateral_label: String,
    pub bank_account_type: &'a str,
    pub bank_account_currency: &'a str,
    pub bank_account_country: &'a str,
    pub accepted_countries: String,
    pub accepted_languages: String,
    pub fields: &'a FieldStore,
    pub submission: &'a SubmissionState,
    pub place_offer_visible: bool,
    pub place_offer_disabled: bool,
    pub close_visible: bool,
}

impl OfferSession {
    /// Fresh, empty draft with an address allocated by the wallet.
    pub fn new(
        direction: Direction,
        policy: OfferPolicy,
        terms: OfferTerms,
        wallet: Arc<dyn WalletFacade>,
    ) -> Result<Self> {
        let offer_id = OfferId::new();
        let address = wallet.address_entry(&offer_id)?;
        let mut draft = OfferDraft::new(
            direction,
            address,
            terms,
            policy.collateral_ratio,
            wallet.fee_estimate(),
        );
        let mut fields = FieldStore::new();
        let engine = ReconciliationEngine::new(&policy);
        engine.refresh_totals(&mut draft, &mut fields);

        let (events_tx, events_rx) = flume::unbounded();
        info!(
            "New {} offer {} ({}/{}, wallet {})",
            direction,
            offer_id,
            policy.base_asset_code,
            policy.fiat_code,
            wallet.name()
        );

        Ok(Self {
            engine,
            policy,
            wallet,
            draft,
            fields,
            submission: OfferSubmissionController::new(),
            seeded: false,
            events_tx,
            events_rx,
        })
    }

    /// New draft seeded from an order-book filter.
    pub fn with_filter(
        filter: &OrderBookFilter,
        policy: OfferPolicy,
        terms: OfferTerms,
        wallet: Arc<dyn WalletFacade>,
    ) -> Result<Self> {
        let mut session = Self::new(filter.direction, policy, terms, wallet)?;
        session.apply_filter(filter)?;
        Ok(session)
    }

    /// Seed amount and price from the filter. Values that fail validation
    /// are skipped and their field stays empty. Allowed once per draft.
    pub fn apply_filter(&mut self, filter: &OrderBookFilter) -> Result<()> {
        if self.seeded {
            return Err(Error::InvalidState("draft was already seeded from a filter".into()));
        }
        if filter.direction != self.draft.direction() {
            return Err(Error::InvalidState(format!(
                "filter direction {} does not match offer direction {}",
                filter.direction,
                self.draft.direction()
            )));
        }
        self.seeded = true;

        for (field, value) in [(Field::Amount, filter.amount), (Field::Price, filter.price)] {
            let Some(value) = value else {
                continue;
            };
            let raw = value.to_string();
            if self.engine.validation().validate(&raw, field.denomination()).valid {
                self.commit(field, &raw);
            } else {
                debug!("Filter {} {} skipped: not a valid value", field, raw);
            }
        }
        Ok(())
    }

    /// Commit raw text for a field (focus-out or enter). The draft is frozen
    /// while a submission is in flight and once the offer is published.
    pub fn commit(&mut self, field: Field, raw: &str) -> Cascade {
        if self.is_frozen() {
            warn!(
                "Edit of {} ignored: submission state is {:?}",
                field,
                self.submission.state()
            );
            return Cascade::new(field);
        }
        self.engine.commit(&mut self.draft, &mut self.fields, field, raw)
    }

    /// Submitting or published
    pub fn is_frozen(&self) -> bool {
        self.submission.is_submitting() || self.submission.transaction_id().is_some()
    }

    /// Complete and free of invalid verdicts
    pub fn is_ready(&self) -> bool {
        self.fields.all_valid() && self.draft.snapshot().is_some()
    }

    /// Hand the current draft to the wallet. Returns immediately; the
    /// outcome arrives via [`Self::poll_submission`] or
    /// [`Self::next_submission_event`].
    pub fn place_offer(&mut self) -> Dispatch {
        let snapshot = self.draft.snapshot().filter(|_| self.fields.all_valid());
        let dispatch = self.submission.begin(snapshot.is_some());
        if dispatch != Dispatch::Dispatched {
            debug!("Place offer not dispatched: {:?}", dispatch);
            return dispatch;
        }
        let Some(snapshot) = snapshot else {
            unreachable!("submission dispatched without a complete draft");
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.submission
                    .complete(SubmissionEvent::Rejected(format!("no async runtime: {}", e)));
                return dispatch;
            }
        };

        info!(
            "Placing offer {}: {} {} @ {} via {}",
            snapshot.offer_id,
            snapshot.direction,
            snapshot.amount,
            snapshot.price,
            self.wallet.name()
        );
        let wallet = Arc::clone(&self.wallet);
        let events = self.events_tx.clone();
        handle.spawn(async move {
            let event = match wallet.place_offer(&snapshot).await {
                Ok(tx) => SubmissionEvent::Published(tx),
                Err(e) => SubmissionEvent::Rejected(e.to_string()),
            };
            if events.send_async(event).await.is_err() {
                warn!("Session gone before offer {} completed", snapshot.offer_id);
            }
        });
        dispatch
    }

    /// Apply any completion that has already arrived. Returns `true` if the
    /// submission state changed.
    pub fn poll_submission(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.submission.complete(event);
            changed = true;
        }
        changed
    }

    /// Wait for the in-flight submission to complete. Returns immediately
    /// when nothing is in flight.
    pub async fn next_submission_event(&mut self) -> &SubmissionState {
        if self.submission.is_submitting() {
            match self.events_rx.recv_async().await {
                Ok(event) => self.submission.complete(event),
                Err(e) => warn!("Submission channel closed: {}", e),
            }
        }
        self.submission.state()
    }

    // Read-only accessors

    pub fn draft(&self) -> &OfferDraft {
        &self.draft
    }

    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    pub fn submission(&self) -> &OfferSubmissionController {
        &self.submission
    }

    pub fn policy(&self) -> &OfferPolicy {
        &self.policy
    }

    pub fn snapshot(&self) -> Option<OfferSnapshot> {
        self.draft.snapshot()
    }

    pub fn address_text(&self) -> &str {
        &self.draft.address().address
    }

    pub fn payment_label(&self) -> String {
        format!("Offer trade ({})", self.draft.offer_id())
    }

    pub fn direction_label(&self) -> &'static str {
        match self.draft.direction() {
            Direction::Buy => "Buy:",
            Direction::Sell => "Sell:",
        }
    }

    pub fn collateral_label(&self) -> String {
        format!("Collateral ({}):", format::format_percent(self.draft.collateral_ratio()))
    }

    pub fn terms(&self) -> &OfferTerms {
        self.draft.terms()
    }

    pub fn bank_account_type(&self) -> &str {
        &self.draft.terms().bank_account_type
    }

    pub fn bank_account_currency(&self) -> &str {
        &self.draft.terms().bank_account_currency
    }

    pub fn bank_account_country(&self) -> &str {
        &self.draft.terms().bank_account_country
    }

    /// Accepted country codes as one line, e.g. "DE, AT"
    pub fn accepted_countries_text(&self) -> String {
        self.draft.terms().accepted_countries.join(", ")
    }

    /// Accepted language codes as one line, e.g. "de, en"
    pub fn accepted_languages_text(&self) -> String {
        self.draft.terms().accepted_languages.join(", ")
    }

    pub fn place_offer_disabled(&self) -> bool {
        self.submission.place_offer_disabled() || !self.is_ready()
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            offer_id: self.draft.offer_id(),
            direction_label: self.direction_label(),
            payment_label: self.payment_label(),
            address: self.address_text(),
            collateral_label: self.collateral_label(),
            bank_account_type: self.bank_account_type(),
            bank_account_currency: self.bank_account_currency(),
            bank_account_country: self.bank_account_country(),
            accepted_countries: self.accepted_countries_text(),
            accepted_languages: self.accepted_languages_text(),
            fields: &self.fields,
            submission: self.submission.state(),
            place_offer_visible: self.submission.place_offer_visible(),
            place_offer_disabled: self.place_offer_disabled(),
            close_visible: self.submission.close_visible(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AddressEntry, FeeEstimate, TransactionId};
    use crate::reconcile::MSG_AMOUNT_BELOW_MIN;
    use crate::validation::Warning;
    use crate::wallet::PaperWallet;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts publishes; fails the first `fail_first` of them.
    #[derive(Default)]
    struct CountingWallet {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl WalletFacade for CountingWallet {
        fn address_entry(&self, offer_id: &OfferId) -> Result<AddressEntry> {
            Ok(AddressEntry { offer_id: *offer_id, address: "counting-addr".into() })
        }

        fn fee_estimate(&self) -> FeeEstimate {
            FeeEstimate { offer_fee: dec!(0.001), network_fee: dec!(0.0001) }
        }

        async fn place_offer(&self, _offer: &OfferSnapshot) -> Result<TransactionId> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(Error::Wallet("broadcast rejected".into()));
            }
            Ok(TransactionId::new(format!("tx-{}", n)))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct NoAddressWallet;

    #[async_trait]
    impl WalletFacade for NoAddressWallet {
        fn address_entry(&self, _offer_id: &OfferId) -> Result<AddressEntry> {
            Err(Error::Wallet("keychain locked".into()))
        }

        fn fee_estimate(&self) -> FeeEstimate {
            FeeEstimate { offer_fee: dec!(0), network_fee: dec!(0) }
        }

        async fn place_offer(&self, _offer: &OfferSnapshot) -> Result<TransactionId> {
            unreachable!()
        }

        fn name(&self) -> &str {
            "no-address"
        }
    }

    fn sepa_terms() -> OfferTerms {
        OfferTerms {
            bank_account_type: "SEPA".into(),
            bank_account_currency: "EUR".into(),
            bank_account_country: "DE".into(),
            accepted_countries: vec!["DE".into(), "AT".into(), "FR".into()],
            accepted_languages: vec!["de".into(), "en".into()],
        }
    }

    fn session_with(direction: Direction, wallet: Arc<dyn WalletFacade>) -> OfferSession {
        OfferSession::new(direction, OfferPolicy::default(), sepa_terms(), wallet).unwrap()
    }

    fn ready_session(wallet: Arc<dyn WalletFacade>) -> OfferSession {
        let mut s = session_with(Direction::Buy, wallet);
        s.commit(Field::Amount, "1");
        s.commit(Field::Price, "500");
        s
    }

    #[test]
    fn test_new_session_labels() {
        let s = session_with(Direction::Sell, Arc::new(CountingWallet::default()));
        assert_eq!(s.direction_label(), "Sell:");
        assert_eq!(s.collateral_label(), "Collateral (10.0 %):");
        assert_eq!(s.address_text(), "counting-addr");
        assert_eq!(s.payment_label(), format!("Offer trade ({})", s.draft().offer_id()));
        assert_eq!(s.fields().total_to_pay(), "0.0011 BTC");
        assert!(s.fields().get(Field::Amount).is_empty());
        assert!(s.place_offer_disabled());
    }

    #[test]
    fn test_address_failure_is_an_error() {
        let result = OfferSession::new(
            Direction::Buy,
            OfferPolicy::default(),
            OfferTerms::default(),
            Arc::new(NoAddressWallet),
        );
        assert!(matches!(result, Err(Error::Wallet(_))));
    }

    #[test]
    fn test_amount_and_price_give_volume() {
        let s = ready_session(Arc::new(CountingWallet::default()));
        assert_eq!(s.fields().get(Field::Volume).text(), "500.00");
        assert_eq!(s.draft().volume(), Some(dec!(500)));
        assert!(s.fields().warnings().is_empty());
        assert!(s.is_ready());
    }

    #[test]
    fn test_typed_volume_is_adjusted() {
        let mut s = session_with(Direction::Buy, Arc::new(CountingWallet::default()));
        s.commit(Field::Price, "500.00");
        s.commit(Field::Volume, "333.33");
        assert_eq!(s.draft().amount(), Some(dec!(0.6667)));
        assert_eq!(
            s.fields().warnings(),
            vec![(
                Field::Volume,
                Warning::VolumeAdjusted { typed: dec!(333.33), implied: dec!(333.35) }
            )]
        );
    }

    #[test]
    fn test_conflict_keeps_min_and_blocks_placement() {
        let mut s = session_with(Direction::Buy, Arc::new(CountingWallet::default()));
        s.commit(Field::Amount, "2");
        s.commit(Field::MinAmount, "1.0000");
        s.commit(Field::Price, "500");
        s.commit(Field::Amount, "0.5000");

        assert_eq!(s.fields().get(Field::Amount).message(), Some(MSG_AMOUNT_BELOW_MIN));
        assert_eq!(s.draft().min_amount(), Some(dec!(1)));
        assert!(!s.is_ready());
        assert_eq!(s.place_offer(), Dispatch::NotReady);
        assert_eq!(s.submission().state(), &SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_double_place_reaches_wallet_once() {
        let wallet = Arc::new(CountingWallet::default());
        let mut s = ready_session(wallet.clone());

        assert_eq!(s.place_offer(), Dispatch::Dispatched);
        assert_eq!(s.place_offer(), Dispatch::AlreadySubmitting);
        assert!(s.place_offer_disabled());

        let state = s.next_submission_event().await.clone();
        assert_eq!(state, SubmissionState::Success { transaction_id: TransactionId::new("tx-0") });
        assert_eq!(wallet.calls.load(Ordering::SeqCst), 1);
        assert!(s.submission().close_visible());
        assert_eq!(s.place_offer(), Dispatch::AlreadyPlaced);
        assert_eq!(wallet.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_can_be_retried() {
        let wallet = Arc::new(CountingWallet { fail_first: 1, ..Default::default() });
        let mut s = ready_session(wallet.clone());

        s.place_offer();
        s.next_submission_event().await;
        assert!(s.submission().request_failed());
        assert_eq!(
            s.submission().error_message(),
            Some("Wallet error: broadcast rejected")
        );
        assert!(!s.place_offer_disabled());

        assert_eq!(s.place_offer(), Dispatch::Dispatched);
        s.next_submission_event().await;
        assert_eq!(s.submission().transaction_id(), Some(&TransactionId::new("tx-1")));
        assert_eq!(wallet.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_poll_picks_up_completion() {
        let mut s = ready_session(Arc::new(CountingWallet::default()));
        s.place_offer();
        assert!(!s.poll_submission());

        tokio::task::yield_now().await;
        for _ in 0..100 {
            if s.poll_submission() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(s.submission().transaction_id().is_some());
    }

    #[tokio::test]
    async fn test_draft_frozen_while_submitting_and_after_success() {
        let mut s = ready_session(Arc::new(CountingWallet::default()));
        assert!(!s.is_frozen());
        assert_eq!(s.place_offer(), Dispatch::Dispatched);
        let before = s.draft().clone();

        let cascade = s.commit(Field::Amount, "3");
        assert!(!cascade.accepted);
        assert!(cascade.recomputed.is_empty());
        assert_eq!(s.draft(), &before);
        assert_eq!(s.fields().get(Field::Amount).text(), "1.0000");

        s.next_submission_event().await;
        assert!(s.submission().transaction_id().is_some());
        assert!(s.is_frozen());

        let cascade = s.commit(Field::Price, "900");
        assert!(!cascade.accepted);
        assert_eq!(s.draft(), &before);
        assert_eq!(s.draft().volume(), Some(dec!(500)));
        assert_eq!(s.fields().get(Field::Price).text(), "500.00");
    }

    #[tokio::test]
    async fn test_draft_editable_again_after_failure() {
        let wallet = Arc::new(CountingWallet { fail_first: 1, ..Default::default() });
        let mut s = ready_session(wallet);
        s.place_offer();
        s.next_submission_event().await;
        assert!(s.submission().request_failed());
        assert!(!s.is_frozen());

        let cascade = s.commit(Field::Amount, "2");
        assert!(cascade.accepted);
        assert_eq!(s.draft().volume(), Some(dec!(1000)));
    }

    #[test]
    fn test_terms_accessors() {
        let s = session_with(Direction::Buy, Arc::new(CountingWallet::default()));
        assert_eq!(s.bank_account_type(), "SEPA");
        assert_eq!(s.bank_account_currency(), "EUR");
        assert_eq!(s.bank_account_country(), "DE");
        assert_eq!(s.accepted_countries_text(), "DE, AT, FR");
        assert_eq!(s.accepted_languages_text(), "de, en");

        let empty = OfferSession::new(
            Direction::Buy,
            OfferPolicy::default(),
            OfferTerms::default(),
            Arc::new(CountingWallet::default()),
        )
        .unwrap();
        assert_eq!(empty.accepted_countries_text(), "");
    }

    #[tokio::test]
    async fn test_paper_wallet_end_to_end() {
        let wallet = Arc::new(PaperWallet::new(FeeEstimate {
            offer_fee: dec!(0.001),
            network_fee: dec!(0.0001),
        }));
        let mut s = ready_session(wallet.clone());
        s.place_offer();
        s.next_submission_event().await;

        let placed = wallet.placed_offers();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].1.volume, dec!(500));
        assert_eq!(placed[0].1.total_to_pay, dec!(1.1011));
        assert_eq!(placed[0].1.terms, sepa_terms());
        assert_eq!(Some(&placed[0].0), s.submission().transaction_id());
    }

    #[test]
    fn test_place_without_runtime_fails() {
        let mut s = ready_session(Arc::new(CountingWallet::default()));
        assert_eq!(s.place_offer(), Dispatch::Dispatched);
        assert!(s.submission().request_failed());
    }

    #[test]
    fn test_invalid_filter_amount_is_skipped() {
        let filter = OrderBookFilter {
            direction: Direction::Buy,
            amount: Some(dec!(-1)),
            price: Some(dec!(500)),
        };
        let s = OfferSession::with_filter(
            &filter,
            OfferPolicy::default(),
            OfferTerms::default(),
            Arc::new(CountingWallet::default()),
        )
        .unwrap();

        let amount = s.fields().get(Field::Amount);
        assert!(amount.is_empty());
        assert!(amount.verdict().is_none());
        assert_eq!(s.draft().amount(), None);
        assert_eq!(s.fields().get(Field::Price).text(), "500.00");
    }

    #[test]
    fn test_filter_seeds_amount_and_min_amount() {
        let filter = OrderBookFilter {
            direction: Direction::Sell,
            amount: Some(dec!(0.5)),
            price: Some(dec!(20000)),
        };
        let s = OfferSession::with_filter(
            &filter,
            OfferPolicy::default(),
            OfferTerms::default(),
            Arc::new(CountingWallet::default()),
        )
        .unwrap();
        assert_eq!(s.fields().get(Field::Amount).text(), "0.5000");
        assert_eq!(s.fields().get(Field::MinAmount).text(), "0.5000");
        assert_eq!(s.fields().get(Field::Volume).text(), "10000.00");
    }

    #[test]
    fn test_filter_applies_once_and_checks_direction() {
        let mut s = session_with(Direction::Buy, Arc::new(CountingWallet::default()));
        let wrong = OrderBookFilter { direction: Direction::Sell, amount: None, price: None };
        assert!(matches!(s.apply_filter(&wrong), Err(Error::InvalidState(_))));

        let filter = OrderBookFilter { direction: Direction::Buy, amount: None, price: None };
        s.apply_filter(&filter).unwrap();
        assert!(matches!(s.apply_filter(&filter), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_view_serializes() {
        let s = ready_session(Arc::new(CountingWallet::default()));
        let json = serde_json::to_value(s.view()).unwrap();
        assert_eq!(json["direction_label"], "Buy:");
        assert_eq!(json["accepted_countries"], "DE, AT, FR");
        assert_eq!(json["bank_account_type"], "SEPA");
        assert_eq!(json["fields"]["volume"]["text"], "500.00");
        assert_eq!(json["submission"]["state"], "idle");
        assert_eq!(json["place_offer_disabled"], false);
    }
}
