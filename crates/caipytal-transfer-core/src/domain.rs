use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds the user has to undo a committed transfer before it is finalized.
pub const GRACE_PERIOD_SECONDS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
    Amount,
    BeneficiaryIban,
    BeneficiaryName,
    Reference,
    ExecutionDate,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftField::Amount => "amount",
            DraftField::BeneficiaryIban => "beneficiaryIban",
            DraftField::BeneficiaryName => "beneficiaryName",
            DraftField::Reference => "reference",
            DraftField::ExecutionDate => "executionDate",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form data as the user typed it. Only `execution_date` is structured, the
/// rest stays raw text until the validator looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDraft {
    pub amount: String,
    pub beneficiary_iban: String,
    pub beneficiary_name: String,
    pub reference: Option<String>,
    pub execution_date: NaiveDate,
}

impl TransferDraft {
    /// Blank form scheduled for `today`.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            amount: String::new(),
            beneficiary_iban: String::new(),
            beneficiary_name: String::new(),
            reference: None,
            execution_date: today,
        }
    }

    pub fn parsed_amount(&self) -> Option<Decimal> {
        Decimal::from_str(self.amount.trim()).ok()
    }

    /// IBAN with all whitespace removed, the form the validator and the
    /// commit payload use.
    pub fn compact_iban(&self) -> String {
        self.beneficiary_iban
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    }

    /// Applies a single field edit. IBAN input is upper-cased and an empty
    /// reference clears the field.
    pub fn set_field(&mut self, field: DraftField, value: &str) -> Result<(), DraftEditError> {
        match field {
            DraftField::Amount => self.amount = value.to_owned(),
            DraftField::BeneficiaryIban => self.beneficiary_iban = value.to_uppercase(),
            DraftField::BeneficiaryName => self.beneficiary_name = value.to_owned(),
            DraftField::Reference => {
                self.reference = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.to_owned())
                }
            }
            DraftField::ExecutionDate => {
                self.execution_date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .map_err(|e| DraftEditError::InvalidDate(format!("{value}: {e}")))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftEditError {
    #[error("invalid execution date: {0}")]
    InvalidDate(String),
}

/// Body sent to the commit endpoint. Built only from a draft that passed
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub amount: Decimal,
    pub beneficiary_iban: String,
    pub beneficiary_name: String,
    pub reference: Option<String>,
    pub execution_date: NaiveDate,
}

impl TransferPayload {
    /// Returns `None` when the amount does not parse; callers validate first.
    pub fn from_draft(draft: &TransferDraft) -> Option<Self> {
        Some(Self {
            amount: draft.parsed_amount()?,
            beneficiary_iban: draft.compact_iban(),
            beneficiary_name: draft.beneficiary_name.trim().to_owned(),
            reference: draft
                .reference
                .as_ref()
                .map(|r| r.trim().to_owned())
                .filter(|r| !r.is_empty()),
            execution_date: draft.execution_date,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CancelReason {
    /// Form closed before the grace period.
    Closed,
    /// Undo pressed during the grace period.
    Undone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLogRecord {
    pub event_seq: u64,
    pub flow_id: String,
    pub command: String,
    pub state_before: String,
    pub state_after: String,
    pub side_effect: Option<String>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}
