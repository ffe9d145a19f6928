//! Reconciliation engine - commit cascades over the offer draft
//!
//! A commit validates the origin field, writes its canonical value and then
//! runs the fixed list of recompute steps for that origin (see
//! [`cascade_for`]). The whole cascade is one `&mut` call: nothing observes
//! the draft half way through, and no step ever re-validates the origin.
//!
//! Rounding is half-up everywhere: 4 dp for base-asset quantities, 2 dp for
//! fiat quantities.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::core::{Denomination, Field, OfferPolicy, BASE_ASSET_DECIMALS, FIAT_DECIMALS};
use crate::draft::{amount_for, volume_for, OfferDraft};
use crate::fields::FieldStore;
use crate::format;
use crate::validation::{ValidationEngine, ValidationResult, Warning};

pub const MSG_AMOUNT_BELOW_MIN: &str = "Amount cannot be smaller than minimum amount.";
pub const MSG_MIN_ABOVE_AMOUNT: &str = "Minimum amount cannot be larger than amount.";

/// One recompute step of a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// min_amount follows amount until the user pins it
    SyncMinAmount,
    /// volume = round2(amount × price)
    Volume,
    /// amount = round4(volume / price), then volume = implied volume
    BackSolveAmount,
    /// collateral, total to pay
    Totals,
    /// min_amount ≤ amount, both fields overridden on conflict
    CrossCheck,
}

/// Dependency graph: recompute steps per edit origin, in execution order.
pub const fn cascade_for(origin: Field) -> &'static [Step] {
    match origin {
        Field::Amount => &[Step::SyncMinAmount, Step::Volume, Step::Totals, Step::CrossCheck],
        Field::MinAmount => &[Step::CrossCheck],
        Field::Price => &[Step::Volume, Step::SyncMinAmount, Step::Totals, Step::CrossCheck],
        Field::Volume => &[
            Step::BackSolveAmount,
            Step::SyncMinAmount,
            Step::Totals,
            Step::CrossCheck,
        ],
    }
}

/// What a commit did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    pub origin: Field,
    /// `false` when the origin text failed validation or the draft is
    /// frozen; nothing else changed
    pub accepted: bool,
    /// Other editable fields whose canonical value was rewritten
    pub recomputed: Vec<Field>,
    /// Warnings raised during this cascade
    pub warnings: Vec<(Field, Warning)>,
}

impl Cascade {
    /// Nothing accepted, nothing recomputed
    pub(crate) fn new(origin: Field) -> Self {
        Self { origin, accepted: false, recomputed: Vec::new(), warnings: Vec::new() }
    }

    fn touched(&mut self, field: Field) {
        if field != self.origin && !self.recomputed.contains(&field) {
            self.recomputed.push(field);
        }
    }
}

/// Owns the validators and the rounding policy; the draft and the field
/// store are passed in by exclusive reference for each commit.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    validation: ValidationEngine,
    base_asset_code: String,
}

impl ReconciliationEngine {
    pub fn new(policy: &OfferPolicy) -> Self {
        Self {
            validation: ValidationEngine::new(policy),
            base_asset_code: policy.base_asset_code.clone(),
        }
    }

    pub fn validation(&self) -> &ValidationEngine {
        &self.validation
    }

    /// Commit raw text for one field and run its cascade.
    pub fn commit(
        &self,
        draft: &mut OfferDraft,
        fields: &mut FieldStore,
        origin: Field,
        raw: &str,
    ) -> Cascade {
        let mut cascade = Cascade::new(origin);
        let validator = self.validation.validator(origin.denomination());
        let verdict = validator.validate(raw);

        let display = fields.get_mut(origin);
        display.set_text(raw.trim());
        if !verdict.valid {
            warn!(
                "Rejected {} input {:?}: {}",
                origin,
                raw,
                verdict.message.as_deref().unwrap_or("invalid")
            );
            display.set_verdict(verdict);
            return cascade;
        }

        display.set_verdict(verdict);
        display.clear_warnings();
        if let Some(w) = validator.check_precision(raw) {
            display.add_warning(w);
            cascade.warnings.push((origin, w));
        }

        let Some(value) = validator.canonical(raw) else {
            unreachable!("validated {} input {:?} did not parse", origin, raw);
        };
        debug!("Commit {} = {} (raw {:?})", origin, value, raw);

        match origin {
            Field::Amount => draft.amount = Some(value),
            Field::MinAmount => {
                draft.min_amount = Some(value);
                draft.min_amount_pinned = true;
            }
            Field::Price => draft.price = Some(value),
            Field::Volume => draft.volume = Some(value),
        }
        fields.get_mut(origin).set_text(format::format(value, origin.denomination().decimals()));
        cascade.accepted = true;

        for step in cascade_for(origin) {
            match step {
                Step::SyncMinAmount => self.sync_min_amount(draft, fields, &mut cascade),
                Step::Volume => self.recompute_volume(draft, fields, &mut cascade),
                Step::BackSolveAmount => self.back_solve_amount(draft, fields, &mut cascade),
                Step::Totals => self.recompute_totals(draft, fields),
                Step::CrossCheck => Self::cross_check(draft, fields),
            }
        }

        debug!(
            "Cascade {} done: recomputed {:?}, {} warning(s)",
            origin,
            cascade.recomputed,
            cascade.warnings.len()
        );
        cascade
    }

    /// Refresh every derived text from the draft (used once at session start).
    pub fn refresh_totals(&self, draft: &mut OfferDraft, fields: &mut FieldStore) {
        self.recompute_totals(draft, fields);
    }

    fn sync_min_amount(
        &self,
        draft: &mut OfferDraft,
        fields: &mut FieldStore,
        cascade: &mut Cascade,
    ) {
        if draft.min_amount_pinned {
            return;
        }
        let Some(amount) = draft.amount else {
            return;
        };
        if draft.min_amount == Some(amount) {
            return;
        }
        draft.min_amount = Some(amount);
        let text = format::format(amount, BASE_ASSET_DECIMALS);
        let verdict = self.validate_derived(&text, Denomination::BaseAsset);
        let display = fields.get_mut(Field::MinAmount);
        display.set_text(text);
        display.set_verdict(verdict);
        display.clear_warnings();
        cascade.touched(Field::MinAmount);
    }

    fn recompute_volume(
        &self,
        draft: &mut OfferDraft,
        fields: &mut FieldStore,
        cascade: &mut Cascade,
    ) {
        match (draft.amount, draft.price, draft.volume) {
            (Some(amount), Some(price), _) => {
                let volume = volume_for(amount, price);
                self.write_derived(draft, fields, Field::Volume, volume);
                cascade.touched(Field::Volume);
            }
            // volume typed before the price was known: derive amount from it now
            (None, Some(_), Some(_)) => self.back_solve_amount(draft, fields, cascade),
            _ => debug!("Volume not recomputed: amount or price missing"),
        }
    }

    fn back_solve_amount(
        &self,
        draft: &mut OfferDraft,
        fields: &mut FieldStore,
        cascade: &mut Cascade,
    ) {
        let (Some(typed), Some(price)) = (draft.volume, draft.price) else {
            debug!("Amount not back-solved: price missing");
            return;
        };
        if price <= Decimal::ZERO {
            unreachable!("committed price {} is not positive", price);
        }

        let amount = amount_for(typed, price);
        self.write_derived(draft, fields, Field::Amount, amount);
        cascade.touched(Field::Amount);

        let implied = volume_for(amount, price);
        draft.volume = Some(implied);
        let text = format::format(implied, FIAT_DECIMALS);
        let verdict = self.validate_derived(&text, Denomination::Fiat);
        let display = fields.get_mut(Field::Volume);
        display.set_text(text);
        display.set_verdict(verdict);
        if implied != typed {
            let w = Warning::VolumeAdjusted { typed, implied };
            debug!("{}", w);
            display.add_warning(w);
            cascade.warnings.push((Field::Volume, w));
        }
    }

    fn recompute_totals(&self, draft: &mut OfferDraft, fields: &mut FieldStore) {
        draft.recalculate_totals();
        fields.collateral =
            format::format_with_code(draft.collateral(), BASE_ASSET_DECIMALS, &self.base_asset_code);
        fields.total_fees =
            format::format_with_code(draft.total_fees(), BASE_ASSET_DECIMALS, &self.base_asset_code);
        fields.total_to_pay = format::format_with_code(
            draft.total_to_pay(),
            BASE_ASSET_DECIMALS,
            &self.base_asset_code,
        );
    }

    fn cross_check(draft: &OfferDraft, fields: &mut FieldStore) {
        if draft.is_min_amount_less_or_equal_amount() {
            fields.get_mut(Field::Amount).restore_verdict();
            fields.get_mut(Field::MinAmount).restore_verdict();
        } else {
            debug!(
                "Min amount {:?} exceeds amount {:?}",
                draft.min_amount(),
                draft.amount()
            );
            fields
                .get_mut(Field::Amount)
                .override_verdict(ValidationResult::invalid(MSG_AMOUNT_BELOW_MIN));
            fields
                .get_mut(Field::MinAmount)
                .override_verdict(ValidationResult::invalid(MSG_MIN_ABOVE_AMOUNT));
        }
    }

    /// Write a recomputed value and its text; the field's own verdict is
    /// re-derived from the new text, its stale warnings dropped.
    fn write_derived(
        &self,
        draft: &mut OfferDraft,
        fields: &mut FieldStore,
        field: Field,
        value: Decimal,
    ) {
        match field {
            Field::Amount => draft.amount = Some(value),
            Field::MinAmount => draft.min_amount = Some(value),
            Field::Price => draft.price = Some(value),
            Field::Volume => draft.volume = Some(value),
        }
        let text = format::format(value, field.denomination().decimals());
        let verdict = self.validate_derived(&text, field.denomination());
        let display = fields.get_mut(field);
        display.set_text(text);
        display.set_verdict(verdict);
        display.clear_warnings();
    }

    fn validate_derived(&self, text: &str, denomination: Denomination) -> ValidationResult {
        self.validation.validate(text, denomination)
    }
}
