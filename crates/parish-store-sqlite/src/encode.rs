//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`
//! and money as decimal strings. UUIDs are stored as hyphenated lowercase
//! strings. Enums use their snake_case names.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use parish_core::{
  Matricule,
  association::{Association, Membership},
  commitment::{Commitment, CommitmentAmounts},
  member::Member,
  payment::Payment,
};
use rust_decimal::Decimal;
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::decode("timestamp", s, e))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::decode("date", s, e))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> {
  Decimal::from_str(s).map_err(|e| Error::decode("amount", s, e))
}

pub fn encode_enum<T: AsRef<str>>(value: T) -> String { value.as_ref().to_owned() }

pub fn decode_matricule(s: &str) -> Result<Matricule> {
  s.parse().map_err(|e| Error::decode("matricule", s, e))
}

/// Decode a snake_case enum column.
pub fn decode_enum<T>(what: &str, s: &str) -> Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  s.parse().map_err(|e| Error::decode(what, s, e))
}

// ─── Members ─────────────────────────────────────────────────────────────────

pub const MEMBER_COLUMNS: &str = "m.member_id, m.matricule, m.first_name, m.last_name, \
  m.gender, m.date_of_birth, m.place_of_birth, m.email, m.phone, m.address, m.neighborhood, \
  m.profession, m.marital_status, m.baptism_date, m.baptism_place, m.join_date, m.category, \
  m.situation, m.membership_status, m.notes, m.created_at";

/// Raw strings read directly from a `members` row, in [`MEMBER_COLUMNS`]
/// order starting at `offset`.
pub struct RawMember {
  pub member_id:         String,
  pub matricule:         String,
  pub first_name:        String,
  pub last_name:         String,
  pub gender:            String,
  pub date_of_birth:     Option<String>,
  pub place_of_birth:    Option<String>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub address:           Option<String>,
  pub neighborhood:      Option<String>,
  pub profession:        Option<String>,
  pub marital_status:    String,
  pub baptism_date:      Option<String>,
  pub baptism_place:     Option<String>,
  pub join_date:         String,
  pub category:          String,
  pub situation:         String,
  pub membership_status: String,
  pub notes:             Option<String>,
  pub created_at:        String,
}

impl RawMember {
  pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:         row.get(offset)?,
      matricule:         row.get(offset + 1)?,
      first_name:        row.get(offset + 2)?,
      last_name:         row.get(offset + 3)?,
      gender:            row.get(offset + 4)?,
      date_of_birth:     row.get(offset + 5)?,
      place_of_birth:    row.get(offset + 6)?,
      email:             row.get(offset + 7)?,
      phone:             row.get(offset + 8)?,
      address:           row.get(offset + 9)?,
      neighborhood:      row.get(offset + 10)?,
      profession:        row.get(offset + 11)?,
      marital_status:    row.get(offset + 12)?,
      baptism_date:      row.get(offset + 13)?,
      baptism_place:     row.get(offset + 14)?,
      join_date:         row.get(offset + 15)?,
      category:          row.get(offset + 16)?,
      situation:         row.get(offset + 17)?,
      membership_status: row.get(offset + 18)?,
      notes:             row.get(offset + 19)?,
      created_at:        row.get(offset + 20)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    Ok(Member {
      member_id:         decode_uuid(&self.member_id)?,
      matricule:         decode_matricule(&self.matricule)?,
      first_name:        self.first_name,
      last_name:         self.last_name,
      gender:            decode_enum("gender", &self.gender)?,
      date_of_birth:     decode_opt_date(self.date_of_birth)?,
      place_of_birth:    self.place_of_birth,
      email:             self.email,
      phone:             self.phone,
      address:           self.address,
      neighborhood:      self.neighborhood,
      profession:        self.profession,
      marital_status:    decode_enum("marital status", &self.marital_status)?,
      baptism_date:      decode_opt_date(self.baptism_date)?,
      baptism_place:     self.baptism_place,
      join_date:         decode_date(&self.join_date)?,
      category:          decode_enum("category", &self.category)?,
      situation:         decode_enum("situation", &self.situation)?,
      membership_status: decode_enum("membership status", &self.membership_status)?,
      notes:             self.notes,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

// ─── Associations ────────────────────────────────────────────────────────────

pub const ASSOCIATION_COLUMNS: &str = "a.association_id, a.name, a.description, a.created_at";

pub struct RawAssociation {
  pub association_id: String,
  pub name:           String,
  pub description:    Option<String>,
  pub created_at:     String,
}

impl RawAssociation {
  pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      association_id: row.get(offset)?,
      name:           row.get(offset + 1)?,
      description:    row.get(offset + 2)?,
      created_at:     row.get(offset + 3)?,
    })
  }

  pub fn into_association(self) -> Result<Association> {
    Ok(Association {
      association_id: decode_uuid(&self.association_id)?,
      name:           self.name,
      description:    self.description,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const MEMBERSHIP_COLUMNS: &str = "ma.member_id, ma.association_id, ma.role, ma.joined_on";

pub struct RawMembership {
  pub member_id:      String,
  pub association_id: String,
  pub role:           Option<String>,
  pub joined_on:      String,
}

impl RawMembership {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:      row.get(0)?,
      association_id: row.get(1)?,
      role:           row.get(2)?,
      joined_on:      row.get(3)?,
    })
  }

  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      member_id:      decode_uuid(&self.member_id)?,
      association_id: decode_uuid(&self.association_id)?,
      role:           self.role,
      joined_on:      decode_date(&self.joined_on)?,
    })
  }
}

// ─── Commitments ─────────────────────────────────────────────────────────────

pub const COMMITMENT_COLUMNS: &str = "c.commitment_id, c.member_id, c.year, c.tithe, \
  c.construction, c.debt, c.total, c.created_at, c.updated_at";

pub struct RawCommitment {
  pub commitment_id: String,
  pub member_id:     String,
  pub year:          i32,
  pub tithe:         String,
  pub construction:  String,
  pub debt:          String,
  pub total:         String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawCommitment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      commitment_id: row.get(0)?,
      member_id:     row.get(1)?,
      year:          row.get(2)?,
      tithe:         row.get(3)?,
      construction:  row.get(4)?,
      debt:          row.get(5)?,
      total:         row.get(6)?,
      created_at:    row.get(7)?,
      updated_at:    row.get(8)?,
    })
  }

  pub fn into_commitment(self) -> Result<Commitment> {
    Ok(Commitment {
      commitment_id: decode_uuid(&self.commitment_id)?,
      member_id:     decode_uuid(&self.member_id)?,
      year:          self.year,
      amounts:       CommitmentAmounts {
        tithe:        decode_decimal(&self.tithe)?,
        construction: decode_decimal(&self.construction)?,
        debt:         decode_decimal(&self.debt)?,
      },
      total:         decode_decimal(&self.total)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Payments ────────────────────────────────────────────────────────────────

pub const PAYMENT_COLUMNS: &str = "p.payment_id, p.member_id, p.commitment_id, p.payment_type, \
  p.amount, p.payment_date, p.reference, p.notes, p.created_at";

pub struct RawPayment {
  pub payment_id:    String,
  pub member_id:     String,
  pub commitment_id: Option<String>,
  pub payment_type:  String,
  pub amount:        String,
  pub payment_date:  String,
  pub reference:     Option<String>,
  pub notes:         Option<String>,
  pub created_at:    String,
}

impl RawPayment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      payment_id:    row.get(0)?,
      member_id:     row.get(1)?,
      commitment_id: row.get(2)?,
      payment_type:  row.get(3)?,
      amount:        row.get(4)?,
      payment_date:  row.get(5)?,
      reference:     row.get(6)?,
      notes:         row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_payment(self) -> Result<Payment> {
    Ok(Payment {
      payment_id:    decode_uuid(&self.payment_id)?,
      member_id:     decode_uuid(&self.member_id)?,
      commitment_id: self.commitment_id.as_deref().map(decode_uuid).transpose()?,
      payment_type:  decode_enum("payment type", &self.payment_type)?,
      amount:        decode_decimal(&self.amount)?,
      payment_date:  decode_date(&self.payment_date)?,
      reference:     self.reference,
      notes:         self.notes,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
