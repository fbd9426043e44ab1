//! Money received from a member, optionally applied to one of
//! their commitments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::{Result, validate};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentType {
  #[default]
  Cash,
  Check,
  MobileMoney,
  BankTransfer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub payment_id:    Uuid,
  pub member_id:     Uuid,
  pub commitment_id: Option<Uuid>,
  pub payment_type:  PaymentType,
  /// Always strictly positive.
  pub amount:        Decimal,
  pub payment_date:  NaiveDate,
  pub reference:     Option<String>,
  pub notes:         Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl Payment {
  pub fn is_applied_to(&self, commitment_id: Uuid) -> bool {
    self.commitment_id == Some(commitment_id)
  }

  pub fn apply(&mut self, patch: PaymentPatch) {
    if let Some(v) = patch.amount { self.amount = v; }
    if let Some(v) = patch.payment_type { self.payment_type = v; }
    if let Some(v) = patch.payment_date { self.payment_date = v; }
    if let Some(v) = patch.reference { self.reference = Some(v).filter(|r| !r.is_empty()); }
    if let Some(v) = patch.notes { self.notes = Some(v).filter(|n| !n.is_empty()); }
  }
}

/// Input to [`crate::store::ParishStore::record_payment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
  pub member_id:     Uuid,
  #[serde(default)]
  pub commitment_id: Option<Uuid>,
  #[serde(default)]
  pub payment_type:  PaymentType,
  pub amount:        Decimal,
  /// Defaults to the recording date.
  #[serde(default)]
  pub payment_date:  Option<NaiveDate>,
  #[serde(default)]
  pub reference:     Option<String>,
  #[serde(default)]
  pub notes:         Option<String>,
}

impl NewPayment {
  pub fn new(member_id: Uuid, amount: Decimal) -> Self {
    Self {
      member_id,
      commitment_id: None,
      payment_type: PaymentType::default(),
      amount,
      payment_date: None,
      reference: None,
      notes: None,
    }
  }

  pub fn against(mut self, commitment_id: Uuid) -> Self {
    self.commitment_id = Some(commitment_id);
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate::positive("amount", self.amount)?;
    validate::optional_length("reference", self.reference.as_deref(), 100)?;
    validate::optional_length("notes", self.notes.as_deref(), 1000)
  }

  pub fn into_payment(self, payment_id: Uuid, created_at: DateTime<Utc>) -> Payment {
    Payment {
      payment_id,
      member_id: self.member_id,
      commitment_id: self.commitment_id,
      payment_type: self.payment_type,
      amount: self.amount,
      payment_date: self.payment_date.unwrap_or_else(|| created_at.date_naive()),
      reference: self.reference.filter(|r| !r.is_empty()),
      notes: self.notes.filter(|n| !n.is_empty()),
      created_at,
    }
  }
}

/// Partial payment update. The member and commitment links never change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentPatch {
  pub amount:       Option<Decimal>,
  pub payment_type: Option<PaymentType>,
  pub payment_date: Option<NaiveDate>,
  pub reference:    Option<String>,
  pub notes:        Option<String>,
}

impl PaymentPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(amount) = self.amount {
      validate::positive("amount", amount)?;
    }
    validate::optional_length("reference", self.reference.as_deref(), 100)?;
    validate::optional_length("notes", self.notes.as_deref(), 1000)
  }
}
