//! The `ParishStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `parish-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Matricule,
  association::{Association, AssociationPatch, Membership, NewAssociation, NewMembership},
  commitment::{AmountsPatch, CommitmentLedger, NewCommitment},
  ledger::MigrationReport,
  member::{Gender, Member, MemberCategory, MemberPatch, MemberSituation, MembershipStatus, NewMember},
  payment::{NewPayment, Payment, PaymentPatch, PaymentType},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ParishStore::list_members`]. Results are ordered by
/// matricule.
#[derive(Debug, Clone, Default)]
pub struct MemberQuery {
  /// Case-insensitive match on first name, last name or matricule.
  pub search:            Option<String>,
  pub gender:            Option<Gender>,
  pub category:          Option<MemberCategory>,
  pub situation:         Option<MemberSituation>,
  pub membership_status: Option<MembershipStatus>,
  pub limit:             Option<usize>,
  pub offset:            Option<usize>,
}

/// Parameters for [`ParishStore::list_associations`]. Results are ordered by
/// name.
#[derive(Debug, Clone, Default)]
pub struct AssociationQuery {
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// Parameters for [`ParishStore::list_commitments`].
#[derive(Debug, Clone, Default)]
pub struct CommitmentQuery {
  pub year:      Option<i32>,
  pub member_id: Option<Uuid>,
}

/// Parameters for [`ParishStore::list_payments`]. Results are ordered newest
/// payment date first.
#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
  pub member_id:     Option<Uuid>,
  pub commitment_id: Option<Uuid>,
  pub payment_type:  Option<PaymentType>,
  /// Inclusive bounds on `payment_date`.
  pub from:          Option<NaiveDate>,
  pub to:            Option<NaiveDate>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors expose the domain error they wrap, if any, so callers can
/// classify them with [`crate::Error::kind`]. Anything else is a backend
/// failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a parish store backend.
///
/// Every ledger rule that spans more than one record (matricule allocation,
/// the overdraft check, the yearly migration) must run atomically inside the
/// backend, so those operations are exposed as single methods rather than as
/// read-then-write pairs.
pub trait ParishStore: Send + Sync {
  type Error: StoreError;

  // ── Members ───────────────────────────────────────────────────────────

  /// Validate `input`, allocate the next matricule and persist the member.
  fn create_member(
    &self,
    input: NewMember,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  fn get_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  fn get_member_by_matricule(
    &self,
    matricule: Matricule,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  fn list_members<'a>(
    &'a self,
    query: &'a MemberQuery,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + 'a;

  fn update_member(
    &self,
    id: Uuid,
    patch: MemberPatch,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  /// Fails with [`crate::Error::MemberHasLedger`] while the member has any
  /// commitment or payment.
  fn delete_member(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Associations ──────────────────────────────────────────────────────

  fn create_association(
    &self,
    input: NewAssociation,
  ) -> impl Future<Output = Result<Association, Self::Error>> + Send + '_;

  fn get_association(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Association>, Self::Error>> + Send + '_;

  fn list_associations<'a>(
    &'a self,
    query: &'a AssociationQuery,
  ) -> impl Future<Output = Result<Vec<Association>, Self::Error>> + Send + 'a;

  fn update_association(
    &self,
    id: Uuid,
    patch: AssociationPatch,
  ) -> impl Future<Output = Result<Association, Self::Error>> + Send + '_;

  /// Removes the association and every membership in it.
  fn delete_association(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_member_to_association(
    &self,
    member_id: Uuid,
    input: NewMembership,
  ) -> impl Future<Output = Result<Membership, Self::Error>> + Send + '_;

  fn remove_member_from_association(
    &self,
    member_id: Uuid,
    association_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Members of an association, ordered by matricule.
  fn association_members(
    &self,
    association_id: Uuid,
  ) -> impl Future<Output = Result<Vec<(Membership, Member)>, Self::Error>> + Send + '_;

  /// Associations a member belongs to, ordered by name.
  fn member_associations(
    &self,
    member_id: Uuid,
  ) -> impl Future<Output = Result<Vec<(Membership, Association)>, Self::Error>> + Send + '_;

  // ── Commitments ───────────────────────────────────────────────────────

  /// Fails with [`crate::Error::CommitmentExists`] if the member already has
  /// a commitment for the year.
  fn create_commitment(
    &self,
    input: NewCommitment,
  ) -> impl Future<Output = Result<CommitmentLedger, Self::Error>> + Send + '_;

  fn get_commitment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CommitmentLedger>, Self::Error>> + Send + '_;

  /// Ordered by year descending, then by member matricule.
  fn list_commitments<'a>(
    &'a self,
    query: &'a CommitmentQuery,
  ) -> impl Future<Output = Result<Vec<CommitmentLedger>, Self::Error>> + Send + 'a;

  fn update_commitment_amounts(
    &self,
    id: Uuid,
    patch: AmountsPatch,
  ) -> impl Future<Output = Result<CommitmentLedger, Self::Error>> + Send + '_;

  /// Fails with [`crate::Error::CommitmentHasPayments`] while payments are
  /// applied to it.
  fn delete_commitment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Carry every unpaid balance of `from_year` into a debt-only commitment
  /// for `to_year`. Safe to re-run.
  fn migrate_year(
    &self,
    from_year: i32,
    to_year: i32,
  ) -> impl Future<Output = Result<MigrationReport, Self::Error>> + Send + '_;

  // ── Payments ──────────────────────────────────────────────────────────

  /// Record a payment. When it is applied to a commitment the overdraft
  /// check and the insert happen atomically.
  fn record_payment(
    &self,
    input: NewPayment,
  ) -> impl Future<Output = Result<Payment, Self::Error>> + Send + '_;

  fn get_payment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Payment>, Self::Error>> + Send + '_;

  fn list_payments<'a>(
    &'a self,
    query: &'a PaymentQuery,
  ) -> impl Future<Output = Result<Vec<Payment>, Self::Error>> + Send + 'a;

  /// A changed amount is re-checked against the commitment's remaining
  /// balance, excluding the payment's own previous amount.
  fn update_payment(
    &self,
    id: Uuid,
    patch: PaymentPatch,
  ) -> impl Future<Output = Result<Payment, Self::Error>> + Send + '_;

  fn delete_payment(&self, id: Uuid) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
