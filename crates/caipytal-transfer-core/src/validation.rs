//! Draft validation.
//!
//! Pure checks over a [`TransferDraft`]; each field is judged on its own so a
//! bad amount never hides a bad IBAN.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::domain::{DraftField, TransferDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid amount")]
    InvalidAmount,
    #[error("IBAN required")]
    IbanRequired,
    #[error("invalid IBAN format")]
    InvalidIbanFormat,
    #[error("beneficiary name required")]
    BeneficiaryNameRequired,
    #[error("execution date must be today or later")]
    ExecutionDateInPast,
}

/// Field name to error, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<DraftField, FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: DraftField) -> Option<FieldError> {
        self.0.get(&field).copied()
    }

    pub fn contains(&self, field: DraftField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DraftField, FieldError)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    fn insert(&mut self, field: DraftField, error: FieldError) {
        self.0.insert(field, error);
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k.as_str(), v.to_string())))
    }
}

pub fn validate_draft(draft: &TransferDraft, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    match draft.parsed_amount() {
        Some(amount) if amount > Decimal::ZERO => {}
        _ => errors.insert(DraftField::Amount, FieldError::InvalidAmount),
    }

    let iban = draft.compact_iban();
    if iban.is_empty() {
        errors.insert(DraftField::BeneficiaryIban, FieldError::IbanRequired);
    } else if !is_valid_iban(&iban) {
        errors.insert(DraftField::BeneficiaryIban, FieldError::InvalidIbanFormat);
    }

    if draft.beneficiary_name.trim().is_empty() {
        errors.insert(
            DraftField::BeneficiaryName,
            FieldError::BeneficiaryNameRequired,
        );
    }

    if draft.execution_date < today {
        errors.insert(DraftField::ExecutionDate, FieldError::ExecutionDateInPast);
    }

    errors
}

/// Structural IBAN check, whitespace ignored:
/// `[A-Z]{2}[0-9]{2}[A-Z0-9]{4}[0-9]{7}[A-Z0-9]{0,16}`.
///
/// No mod-97 checksum; only the shape is verified.
pub fn is_valid_iban(input: &str) -> bool {
    let iban: Vec<u8> = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c.is_ascii() { c as u8 } else { 0 })
        .collect();

    if !(15..=31).contains(&iban.len()) {
        return false;
    }

    let upper_alnum = |b: &u8| b.is_ascii_uppercase() || b.is_ascii_digit();

    iban[0..2].iter().all(u8::is_ascii_uppercase)
        && iban[2..4].iter().all(u8::is_ascii_digit)
        && iban[4..8].iter().all(upper_alnum)
        && iban[8..15].iter().all(u8::is_ascii_digit)
        && iban[15..].iter().all(upper_alnum)
}
