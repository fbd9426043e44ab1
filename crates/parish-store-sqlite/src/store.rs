//! [`SqliteStore`], the SQLite implementation of [`ParishStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use parish_core::{
  Matricule,
  association::{Association, AssociationPatch, Membership, NewAssociation, NewMembership},
  commitment::{AmountsPatch, Commitment, CommitmentLedger, NewCommitment},
  ledger::{self, MigrationReport, RolloverOutcome},
  member::{Member, MemberPatch, NewMember},
  payment::{NewPayment, Payment, PaymentPatch},
  store::{AssociationQuery, CommitmentQuery, MemberQuery, ParishStore, PaymentQuery},
};
use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result, queries, queries::in_tx, schema::SCHEMA};

/// How many times member creation retries after losing a matricule race to
/// another writer on the same database file.
const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

fn domain(e: parish_core::Error) -> Error { Error::Core(e) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A parish store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread. Domain and decode errors raised
  /// inside travel back unchanged.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

/// Persist one rolled-over commitment unless the member already has one for
/// the target year.
fn rollover_into(tx: &Transaction<'_>, next: NewCommitment, now: DateTime<Utc>) -> Result<RolloverOutcome> {
  if queries::commitment_for_year(tx, next.member_id, next.year)?.is_some() {
    return Ok(RolloverOutcome::AlreadyExists);
  }
  let commitment = Commitment::create(next, Uuid::new_v4(), now)?;
  match queries::insert_commitment(tx, &commitment) {
    Ok(()) => Ok(RolloverOutcome::Created),
    Err(e) if e.is_unique_violation("commitments.member_id") => Ok(RolloverOutcome::AlreadyExists),
    Err(e) => Err(e),
  }
}

fn log_rejection(e: &Error) {
  if let Error::Core(parish_core::Error::Overdraft { requested, remaining }) = e {
    info!(%requested, %remaining, "payment rejected: exceeds remaining balance");
  }
}

// ─── ParishStore impl ────────────────────────────────────────────────────────

impl ParishStore for SqliteStore {
  type Error = Error;

  // ── Members ───────────────────────────────────────────────────────────────

  async fn create_member(&self, input: NewMember) -> Result<Member> {
    input.validate()?;

    let mut attempt = 1;
    loop {
      let candidate = input.clone();
      let result = self
        .run(move |conn| in_tx(conn, |tx| queries::insert_member(tx, candidate, Utc::now())))
        .await;

      match result {
        Ok(member) => {
          info!(member_id = %member.member_id, matricule = %member.matricule, "member created");
          return Ok(member);
        }
        Err(e) if attempt < MAX_ALLOCATION_ATTEMPTS && e.is_unique_violation("members.matricule") => {
          warn!(attempt, "matricule already taken, allocating again");
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn get_member(&self, id: Uuid) -> Result<Option<Member>> {
    self.run(move |conn| queries::find_member(conn, id)).await
  }

  async fn get_member_by_matricule(&self, matricule: Matricule) -> Result<Option<Member>> {
    self.run(move |conn| queries::find_member_by_matricule(conn, matricule)).await
  }

  async fn list_members<'a>(&'a self, query: &'a MemberQuery) -> Result<Vec<Member>> {
    let query = query.clone();
    self.run(move |conn| queries::list_members(conn, &query)).await
  }

  async fn update_member(&self, id: Uuid, patch: MemberPatch) -> Result<Member> {
    patch.validate()?;
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let mut member = queries::require_member(tx, id)?;
          member.apply(patch);
          queries::save_member(tx, &member)?;
          Ok(member)
        })
      })
      .await
  }

  async fn delete_member(&self, id: Uuid) -> Result<()> {
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          queries::require_member(tx, id)?;
          if queries::ledger_row_count(tx, id)? > 0 {
            return Err(domain(parish_core::Error::MemberHasLedger(id)));
          }
          queries::delete_member(tx, id)?;
          Ok(())
        })
      })
      .await?;
    info!(member_id = %id, "member deleted");
    Ok(())
  }

  // ── Associations ──────────────────────────────────────────────────────────

  async fn create_association(&self, input: NewAssociation) -> Result<Association> {
    input.validate()?;
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let association = input.into_association(Uuid::new_v4(), Utc::now());
          if queries::association_name_taken(tx, &association.name, None)? {
            return Err(domain(parish_core::Error::AssociationNameTaken(association.name)));
          }
          queries::insert_association(tx, &association)?;
          Ok(association)
        })
      })
      .await
  }

  async fn get_association(&self, id: Uuid) -> Result<Option<Association>> {
    self.run(move |conn| queries::find_association(conn, id)).await
  }

  async fn list_associations<'a>(&'a self, query: &'a AssociationQuery) -> Result<Vec<Association>> {
    let query = query.clone();
    self.run(move |conn| queries::list_associations(conn, &query)).await
  }

  async fn update_association(&self, id: Uuid, patch: AssociationPatch) -> Result<Association> {
    patch.validate()?;
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let mut association = queries::require_association(tx, id)?;
          association.apply(patch);
          if queries::association_name_taken(tx, &association.name, Some(id))? {
            return Err(domain(parish_core::Error::AssociationNameTaken(association.name)));
          }
          queries::save_association(tx, &association)?;
          Ok(association)
        })
      })
      .await
  }

  async fn delete_association(&self, id: Uuid) -> Result<()> {
    let deleted = self.run(move |conn| queries::delete_association(conn, id)).await?;
    if deleted == 0 {
      return Err(domain(parish_core::Error::AssociationNotFound(id)));
    }
    Ok(())
  }

  async fn add_member_to_association(&self, member_id: Uuid, input: NewMembership) -> Result<Membership> {
    input.validate()?;
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let association_id = input.association_id;
          queries::require_member(tx, member_id)?;
          queries::require_association(tx, association_id)?;
          if queries::membership_exists(tx, member_id, association_id)? {
            return Err(domain(parish_core::Error::AlreadyInAssociation { member_id, association_id }));
          }
          let membership = input.into_membership(member_id, Utc::now().date_naive());
          queries::insert_membership(tx, &membership)?;
          Ok(membership)
        })
      })
      .await
  }

  async fn remove_member_from_association(&self, member_id: Uuid, association_id: Uuid) -> Result<()> {
    let removed = self
      .run(move |conn| queries::delete_membership(conn, member_id, association_id))
      .await?;
    if removed == 0 {
      return Err(domain(parish_core::Error::NotInAssociation { member_id, association_id }));
    }
    Ok(())
  }

  async fn association_members(&self, association_id: Uuid) -> Result<Vec<(Membership, Member)>> {
    self
      .run(move |conn| {
        queries::require_association(conn, association_id)?;
        queries::association_members(conn, association_id)
      })
      .await
  }

  async fn member_associations(&self, member_id: Uuid) -> Result<Vec<(Membership, Association)>> {
    self
      .run(move |conn| {
        queries::require_member(conn, member_id)?;
        queries::member_associations(conn, member_id)
      })
      .await
  }

  // ── Commitments ───────────────────────────────────────────────────────────

  async fn create_commitment(&self, input: NewCommitment) -> Result<CommitmentLedger> {
    input.validate()?;
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let (member_id, year) = (input.member_id, input.year);
          queries::require_member(tx, member_id)?;
          if queries::commitment_for_year(tx, member_id, year)?.is_some() {
            return Err(domain(parish_core::Error::CommitmentExists { member_id, year }));
          }
          let commitment = Commitment::create(input, Uuid::new_v4(), Utc::now())?;
          queries::insert_commitment(tx, &commitment)?;
          Ok(CommitmentLedger { commitment, payments: Vec::new() })
        })
      })
      .await
  }

  async fn get_commitment(&self, id: Uuid) -> Result<Option<CommitmentLedger>> {
    self.run(move |conn| queries::find_ledger(conn, id)).await
  }

  async fn list_commitments<'a>(&'a self, query: &'a CommitmentQuery) -> Result<Vec<CommitmentLedger>> {
    let query = query.clone();
    self.run(move |conn| queries::list_ledgers(conn, &query)).await
  }

  async fn update_commitment_amounts(&self, id: Uuid, patch: AmountsPatch) -> Result<CommitmentLedger> {
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let mut ledger = queries::require_ledger(tx, id)?;
          ledger.commitment.update_amounts(patch, Utc::now())?;
          let paid = ledger::total_paid(&ledger.payments);
          if ledger.commitment.total < paid {
            return Err(domain(parish_core::Error::InvalidInput(format!(
              "total {} is below the {paid} already paid",
              ledger.commitment.total
            ))));
          }
          queries::save_commitment_amounts(tx, &ledger.commitment)?;
          Ok(ledger)
        })
      })
      .await
  }

  async fn delete_commitment(&self, id: Uuid) -> Result<()> {
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let ledger = queries::require_ledger(tx, id)?;
          if !ledger.payments.is_empty() {
            return Err(domain(parish_core::Error::CommitmentHasPayments(id)));
          }
          queries::delete_commitment(tx, id)?;
          Ok(())
        })
      })
      .await
  }

  async fn migrate_year(&self, from_year: i32, to_year: i32) -> Result<MigrationReport> {
    let report = self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let sources = queries::list_ledgers(tx, &CommitmentQuery {
            year:      Some(from_year),
            member_id: None,
          })?;
          let now = Utc::now();
          Ok(ledger::migrate_year(&sources, from_year, to_year, |next| {
            rollover_into(tx, next, now)
          })?)
        })
      })
      .await?;

    info!(
      from_year,
      to_year,
      migrated = report.migrated,
      skipped = report.skipped,
      failed = report.errors.len(),
      "commitments migrated"
    );
    for failure in &report.errors {
      warn!(member_id = %failure.member_id, error = %failure.message, "commitment not migrated");
    }
    Ok(report)
  }

  // ── Payments ──────────────────────────────────────────────────────────────

  async fn record_payment(&self, input: NewPayment) -> Result<Payment> {
    input.validate()?;
    let payment = self
      .run(move |conn| {
        in_tx(conn, |tx| {
          queries::require_member(tx, input.member_id)?;
          if let Some(commitment_id) = input.commitment_id {
            let ledger = queries::require_ledger(tx, commitment_id)?;
            if ledger.commitment.member_id != input.member_id {
              return Err(domain(parish_core::Error::CommitmentMemberMismatch {
                commitment_id,
                member_id: input.member_id,
              }));
            }
            let left = ledger::validate_payment_amount(&ledger.commitment, &ledger.payments, input.amount)?;
            debug!(%commitment_id, %left, "payment admitted");
          }
          let payment = input.into_payment(Uuid::new_v4(), Utc::now());
          queries::insert_payment(tx, &payment)?;
          Ok(payment)
        })
      })
      .await
      .inspect_err(log_rejection)?;

    info!(payment_id = %payment.payment_id, amount = %payment.amount, "payment recorded");
    Ok(payment)
  }

  async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
    self.run(move |conn| queries::find_payment(conn, id)).await
  }

  async fn list_payments<'a>(&'a self, query: &'a PaymentQuery) -> Result<Vec<Payment>> {
    let query = query.clone();
    self.run(move |conn| queries::list_payments(conn, &query)).await
  }

  async fn update_payment(&self, id: Uuid, patch: PaymentPatch) -> Result<Payment> {
    patch.validate()?;
    self
      .run(move |conn| {
        in_tx(conn, |tx| {
          let mut payment = queries::require_payment(tx, id)?;
          if let (Some(amount), Some(commitment_id)) = (patch.amount, payment.commitment_id) {
            let ledger = queries::require_ledger(tx, commitment_id)?;
            let others: Vec<Payment> =
              ledger.payments.into_iter().filter(|p| p.payment_id != id).collect();
            ledger::validate_payment_amount(&ledger.commitment, &others, amount)?;
          }
          payment.apply(patch);
          queries::save_payment(tx, &payment)?;
          Ok(payment)
        })
      })
      .await
      .inspect_err(log_rejection)
  }

  async fn delete_payment(&self, id: Uuid) -> Result<()> {
    let deleted = self.run(move |conn| queries::delete_payment(conn, id)).await?;
    if deleted == 0 {
      return Err(domain(parish_core::Error::PaymentNotFound(id)));
    }
    info!(payment_id = %id, "payment deleted");
    Ok(())
  }
}
