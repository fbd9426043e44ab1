//! A member's pledged giving for one calendar year.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  ledger::{self, Balance},
  payment::Payment,
  validate,
};

/// The three pledged components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentAmounts {
  #[serde(default)]
  pub tithe:        Decimal,
  #[serde(default)]
  pub construction: Decimal,
  #[serde(default)]
  pub debt:         Decimal,
}

impl CommitmentAmounts {
  /// Amounts carrying only a debt, as produced by the annual rollover.
  pub fn debt_only(debt: Decimal) -> Self {
    Self { tithe: Decimal::ZERO, construction: Decimal::ZERO, debt }
  }

  pub fn total(&self) -> Result<Decimal> {
    ledger::compute_total(self.tithe, self.construction, self.debt)
  }
}

/// A stored commitment. `total` always equals the sum of the components; it
/// is only ever computed by [`Commitment::create`] and
/// [`Commitment::update_amounts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
  pub commitment_id: Uuid,
  pub member_id:     Uuid,
  pub year:          i32,
  #[serde(flatten)]
  pub amounts:       CommitmentAmounts,
  pub total:         Decimal,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Commitment {
  pub fn create(input: NewCommitment, commitment_id: Uuid, now: DateTime<Utc>) -> Result<Self> {
    input.validate()?;
    let total = input.amounts.total()?;
    Ok(Self {
      commitment_id,
      member_id: input.member_id,
      year: input.year,
      amounts: input.amounts,
      total,
      created_at: now,
      updated_at: now,
    })
  }

  /// Replace the given components and recompute the total.
  pub fn update_amounts(&mut self, patch: AmountsPatch, now: DateTime<Utc>) -> Result<()> {
    let amounts = CommitmentAmounts {
      tithe:        patch.tithe.unwrap_or(self.amounts.tithe),
      construction: patch.construction.unwrap_or(self.amounts.construction),
      debt:         patch.debt.unwrap_or(self.amounts.debt),
    };
    self.total = amounts.total()?;
    self.amounts = amounts;
    self.updated_at = now;
    Ok(())
  }
}

/// Input to [`crate::store::ParishStore::create_commitment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCommitment {
  pub member_id: Uuid,
  pub year:      i32,
  #[serde(flatten)]
  pub amounts:   CommitmentAmounts,
}

impl NewCommitment {
  pub fn validate(&self) -> Result<()> {
    validate::year(self.year)?;
    validate::non_negative("tithe", self.amounts.tithe)?;
    validate::non_negative("construction", self.amounts.construction)?;
    validate::non_negative("debt", self.amounts.debt)
  }
}

/// Partial amount update; absent components keep their stored value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountsPatch {
  pub tithe:        Option<Decimal>,
  pub construction: Option<Decimal>,
  pub debt:         Option<Decimal>,
}

/// A commitment together with every payment recorded against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentLedger {
  pub commitment: Commitment,
  pub payments:   Vec<Payment>,
}

impl CommitmentLedger {
  pub fn balance(&self) -> Balance { ledger::compute_balance(&self.commitment, &self.payments) }
}
