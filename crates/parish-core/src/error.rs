//! Error types for `parish-core`.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("malformed matricule: {0:?}")]
  MalformedMatricule(String),

  #[error("matricule capacity exhausted")]
  CapacityExhausted,

  #[error("amount {requested} exceeds the remaining balance {remaining}")]
  Overdraft {
    requested: Decimal,
    remaining: Decimal,
  },

  #[error("member not found: {0}")]
  MemberNotFound(Uuid),

  #[error("association not found: {0}")]
  AssociationNotFound(Uuid),

  #[error("commitment not found: {0}")]
  CommitmentNotFound(Uuid),

  #[error("payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("member {member_id} already has a commitment for {year}")]
  CommitmentExists { member_id: Uuid, year: i32 },

  #[error("commitment {0} still has payments")]
  CommitmentHasPayments(Uuid),

  #[error("commitment {commitment_id} does not belong to member {member_id}")]
  CommitmentMemberMismatch { commitment_id: Uuid, member_id: Uuid },

  #[error("member {0} still has commitments or payments")]
  MemberHasLedger(Uuid),

  #[error("association name already taken: {0:?}")]
  AssociationNameTaken(String),

  #[error("member {member_id} already belongs to association {association_id}")]
  AlreadyInAssociation { member_id: Uuid, association_id: Uuid },

  #[error("member {member_id} does not belong to association {association_id}")]
  NotInAssociation { member_id: Uuid, association_id: Uuid },
}

/// Coarse classification used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Rejected before any computation.
  InvalidInput,
  /// The identifier space is used up; nothing the caller can retry.
  CapacityExhausted,
  /// A business rule refused the operation (overdraft).
  Rejected,
  NotFound,
  /// The operation conflicts with existing records.
  Conflict,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidInput(_) | Self::MalformedMatricule(_) => ErrorKind::InvalidInput,
      Self::CapacityExhausted => ErrorKind::CapacityExhausted,
      Self::Overdraft { .. } => ErrorKind::Rejected,
      Self::MemberNotFound(_)
      | Self::AssociationNotFound(_)
      | Self::CommitmentNotFound(_)
      | Self::PaymentNotFound(_)
      | Self::NotInAssociation { .. } => ErrorKind::NotFound,
      Self::CommitmentExists { .. }
      | Self::CommitmentHasPayments(_)
      | Self::CommitmentMemberMismatch { .. }
      | Self::MemberHasLedger(_)
      | Self::AssociationNameTaken(_)
      | Self::AlreadyInAssociation { .. } => ErrorKind::Conflict,
    }
  }

  pub(crate) fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
