//! Field store - display text, verdicts and warnings per field

use serde::Serialize;

use crate::core::Field;
use crate::validation::{ValidationResult, Warning};

/// One editable quantity as the presentation layer sees it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayField {
    text: String,
    /// Last verdict from the field's own validator (ignores cross-field checks)
    #[serde(skip)]
    own_verdict: Option<ValidationResult>,
    /// Verdict shown to the user (may be a cross-field override)
    verdict: Option<ValidationResult>,
    warnings: Vec<Warning>,
}

impl DisplayField {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn verdict(&self) -> Option<&ValidationResult> {
        self.verdict.as_ref()
    }

    /// Valid unless a verdict says otherwise. Untouched fields count as valid.
    pub fn is_valid(&self) -> bool {
        self.verdict.as_ref().is_none_or(|v| v.valid)
    }

    pub fn message(&self) -> Option<&str> {
        self.verdict.as_ref().and_then(|v| v.message.as_deref())
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub(crate) fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Record the field's own verdict and show it.
    pub(crate) fn set_verdict(&mut self, verdict: ValidationResult) {
        self.own_verdict = Some(verdict.clone());
        self.verdict = Some(verdict);
    }

    /// Show a cross-field verdict without forgetting the field's own one.
    pub(crate) fn override_verdict(&mut self, verdict: ValidationResult) {
        self.verdict = Some(verdict);
    }

    /// Drop any cross-field override.
    pub(crate) fn restore_verdict(&mut self) {
        self.verdict = self.own_verdict.clone();
    }

    pub(crate) fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    pub(crate) fn add_warning(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// Display state for the whole form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldStore {
    amount: DisplayField,
    min_amount: DisplayField,
    price: DisplayField,
    volume: DisplayField,

    /// Derived, read-only texts (formatted with currency code)
    pub(crate) collateral: String,
    pub(crate) total_fees: String,
    pub(crate) total_to_pay: String,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> &DisplayField {
        match field {
            Field::Amount => &self.amount,
            Field::MinAmount => &self.min_amount,
            Field::Price => &self.price,
            Field::Volume => &self.volume,
        }
    }

    pub(crate) fn get_mut(&mut self, field: Field) -> &mut DisplayField {
        match field {
            Field::Amount => &mut self.amount,
            Field::MinAmount => &mut self.min_amount,
            Field::Price => &mut self.price,
            Field::Volume => &mut self.volume,
        }
    }

    pub fn collateral(&self) -> &str {
        &self.collateral
    }

    pub fn total_fees(&self) -> &str {
        &self.total_fees
    }

    pub fn total_to_pay(&self) -> &str {
        &self.total_to_pay
    }

    /// Every field is valid (untouched fields included).
    pub fn all_valid(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_valid())
    }

    /// All warnings currently raised, with their field.
    pub fn warnings(&self) -> Vec<(Field, Warning)> {
        Field::ALL
            .iter()
            .flat_map(|f| self.get(*f).warnings().iter().map(move |w| (*f, *w)))
            .collect()
    }
}
