//! Commitment ledger arithmetic.
//!
//! Everything here is a pure function over a commitment and its payments:
//! totals, balances, completion rates, the payment admission check and the
//! annual debt rollover. Report aggregations in [`crate::report`] are built by
//! folding [`compute_balance`] over collections.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::{
  Error, Result,
  commitment::{Commitment, CommitmentAmounts, CommitmentLedger, NewCommitment},
  payment::Payment,
  validate,
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Decimal places used when a completion rate is shown.
pub const RATE_DISPLAY_DP: u32 = 2;

// ─── Totals ──────────────────────────────────────────────────────────────────

/// Sum of the three commitment components. Every component must be ≥ 0.
pub fn compute_total(tithe: Decimal, construction: Decimal, debt: Decimal) -> Result<Decimal> {
  validate::non_negative("tithe", tithe)?;
  validate::non_negative("construction", construction)?;
  validate::non_negative("debt", debt)?;
  tithe
    .checked_add(construction)
    .and_then(|sum| sum.checked_add(debt))
    .ok_or_else(|| Error::invalid("commitment total overflows"))
}

// ─── Balance ─────────────────────────────────────────────────────────────────

/// Committed versus paid for one commitment or for an aggregate of them.
///
/// `completion_rate` keeps full precision; it is rounded to
/// [`RATE_DISPLAY_DP`] places only when serialised or through
/// [`Balance::display_rate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
  pub total_committed: Decimal,
  pub total_paid:      Decimal,
  /// Negative only if the overdraft rule was bypassed.
  pub balance:         Decimal,
  #[serde(serialize_with = "serialize_rate")]
  pub completion_rate: Decimal,
}

impl Balance {
  pub fn from_totals(total_committed: Decimal, total_paid: Decimal) -> Self {
    let completion_rate = if total_committed > Decimal::ZERO {
      total_paid
        .checked_div(total_committed)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(Decimal::MAX)
    } else {
      Decimal::ZERO
    };
    Self {
      total_committed,
      total_paid,
      balance: total_committed.saturating_sub(total_paid),
      completion_rate,
    }
  }

  /// What is still owed, never below zero.
  pub fn unpaid(&self) -> Decimal { self.balance.max(Decimal::ZERO) }

  pub fn display_rate(&self) -> Decimal { self.completion_rate.round_dp(RATE_DISPLAY_DP) }

  /// Combine balances by summing committed and paid, then recomputing.
  pub fn combine<'a>(balances: impl IntoIterator<Item = &'a Balance>) -> Self {
    let (committed, paid) = balances
      .into_iter()
      .fold((Decimal::ZERO, Decimal::ZERO), |(c, p), b| {
        (c.saturating_add(b.total_committed), p.saturating_add(b.total_paid))
      });
    Self::from_totals(committed, paid)
  }
}

fn serialize_rate<S: Serializer>(rate: &Decimal, s: S) -> Result<S::Ok, S::Error> {
  Serialize::serialize(&rate.round_dp(RATE_DISPLAY_DP), s)
}

/// Sum of `amounts`, pinned at [`Decimal::MAX`] instead of overflowing.
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
  amounts.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Sum of payment amounts.
pub fn total_paid<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> Decimal {
  sum_amounts(payments.into_iter().map(|p| p.amount))
}

/// Balance of `commitment` given `payments`. Payments not applied to this
/// commitment are ignored, so a member's full payment history may be passed.
pub fn compute_balance(commitment: &Commitment, payments: &[Payment]) -> Balance {
  let paid = total_paid(payments.iter().filter(|p| p.is_applied_to(commitment.commitment_id)));
  Balance::from_totals(commitment.total, paid)
}

// ─── Admission ───────────────────────────────────────────────────────────────

/// Admission check run before a payment is recorded against `commitment`.
///
/// `existing` are the payments already applied to it. Returns the remaining
/// balance after the new payment, or [`Error::Overdraft`] carrying the
/// remaining balance before it.
pub fn validate_payment_amount(
  commitment: &Commitment,
  existing: &[Payment],
  new_amount: Decimal,
) -> Result<Decimal> {
  validate::positive("amount", new_amount)?;
  let remaining = compute_balance(commitment, existing).balance;
  if new_amount > remaining {
    return Err(Error::Overdraft { requested: new_amount, remaining });
  }
  Ok(remaining - new_amount)
}

// ─── Annual migration ────────────────────────────────────────────────────────

/// What the persistence side did with one rolled-over commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverOutcome {
  Created,
  /// The member already had a commitment for the target year.
  AlreadyExists,
}

/// One member whose rollover failed; the rest of the batch still ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFailure {
  pub member_id:     Uuid,
  pub commitment_id: Uuid,
  pub message:       String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
  pub from_year: i32,
  pub to_year:   i32,
  pub migrated:  usize,
  pub skipped:   usize,
  pub errors:    Vec<MigrationFailure>,
}

impl MigrationReport {
  pub fn is_complete(&self) -> bool { self.errors.is_empty() }
}

/// The next-year commitment seeded from `source`'s unpaid balance.
pub fn rollover(source: &CommitmentLedger, to_year: i32) -> Result<NewCommitment> {
  let unpaid = source.balance().unpaid();
  let next = NewCommitment {
    member_id: source.commitment.member_id,
    year:      to_year,
    amounts:   CommitmentAmounts::debt_only(unpaid),
  };
  next.validate()?;
  Ok(next)
}

/// Roll every `from_year` commitment in `sources` into `to_year`.
///
/// `create` persists one new commitment and reports whether it was created or
/// skipped because the member already has a `to_year` record. Failures, from
/// `create` or from a source that cannot be rolled over, are collected per
/// member and never abort the batch. Only invalid years fail the whole
/// call.
pub fn migrate_year<E, F>(
  sources: &[CommitmentLedger],
  from_year: i32,
  to_year: i32,
  mut create: F,
) -> Result<MigrationReport>
where
  E: fmt::Display,
  F: FnMut(NewCommitment) -> Result<RolloverOutcome, E>,
{
  validate::year(from_year)?;
  validate::year(to_year)?;
  if to_year <= from_year {
    return Err(Error::invalid(format!(
      "target year {to_year} must come after source year {from_year}"
    )));
  }

  let mut report = MigrationReport { from_year, to_year, ..MigrationReport::default() };

  for source in sources {
    let commitment = &source.commitment;
    let fail = |message: String| MigrationFailure {
      member_id: commitment.member_id,
      commitment_id: commitment.commitment_id,
      message,
    };

    if commitment.year != from_year {
      report
        .errors
        .push(fail(format!("commitment is for {}, not {from_year}", commitment.year)));
      continue;
    }

    let outcome = rollover(source, to_year)
      .map_err(|e| e.to_string())
      .and_then(|next| create(next).map_err(|e| e.to_string()));

    match outcome {
      Ok(RolloverOutcome::Created) => report.migrated += 1,
      Ok(RolloverOutcome::AlreadyExists) => report.skipped += 1,
      Err(message) => report.errors.push(fail(message)),
    }
  }

  Ok(report)
}
