//! Synchronous row-level helpers.
//!
//! Each takes a plain [`Connection`] so it can run either directly or inside a
//! [`Transaction`] (which derefs to one). Multi-step rules are composed from
//! these in [`crate::store`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parish_core::{
  Matricule,
  association::{Association, Membership},
  commitment::{Commitment, CommitmentLedger},
  matricule,
  member::{Member, NewMember},
  payment::Payment,
  store::{AssociationQuery, CommitmentQuery, MemberQuery, PaymentQuery},
};
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ASSOCIATION_COLUMNS, COMMITMENT_COLUMNS, MEMBER_COLUMNS, MEMBERSHIP_COLUMNS,
    PAYMENT_COLUMNS, RawAssociation, RawCommitment, RawMember, RawMembership, RawPayment,
    decode_uuid, encode_date, encode_decimal, encode_dt, encode_enum, encode_uuid,
  },
};

/// Run `f` inside an `IMMEDIATE` transaction, committing only on success.
///
/// `IMMEDIATE` takes the write lock up front, so a read followed by a
/// dependent write cannot interleave with another writer.
pub fn in_tx<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

fn decode_all<R, T>(
  rows: impl Iterator<Item = rusqlite::Result<R>>,
  decode: impl Fn(R) -> Result<T>,
) -> Result<Vec<T>> {
  rows.map(|row| decode(row?)).collect()
}

fn like_pattern(search: Option<&str>) -> Option<String> {
  search
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| format!("%{s}%"))
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

fn sql_offset(offset: Option<usize>) -> i64 {
  offset.map_or(0, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

// ─── Members ─────────────────────────────────────────────────────────────────

/// The most recently allocated matricule, if any.
///
/// Taken from the issued high-water mark, falling back to surviving rows for
/// databases created before the counter existed.
pub fn last_matricule(conn: &Connection) -> Result<Option<Matricule>> {
  let ordinal: Option<i64> = conn.query_row(
    "SELECT MAX(ordinal) FROM (
       SELECT last_ordinal AS ordinal FROM matricule_counter
       UNION ALL
       SELECT matricule_ordinal FROM members
     )",
    [],
    |row| row.get(0),
  )?;
  ordinal
    .map(|n| {
      let n = u32::try_from(n).map_err(|e| Error::decode("matricule ordinal", &n.to_string(), e))?;
      Ok(Matricule::from_ordinal(n)?)
    })
    .transpose()
}

fn record_issued(tx: &Transaction<'_>, matricule: &Matricule) -> Result<()> {
  tx.execute(
    "INSERT INTO matricule_counter (id, last_ordinal) VALUES (1, ?1)
     ON CONFLICT (id) DO UPDATE SET last_ordinal = MAX(last_ordinal, excluded.last_ordinal)",
    params![i64::from(matricule.ordinal())],
  )?;
  Ok(())
}

/// Allocate the next matricule and insert the member. Must run inside a
/// transaction so the read of the last matricule and the insert are atomic.
pub fn insert_member(tx: &Transaction<'_>, input: NewMember, now: DateTime<Utc>) -> Result<Member> {
  let last = last_matricule(tx)?;
  let matricule = matricule::allocate_next(last.as_ref())?;
  let member = input.into_member(Uuid::new_v4(), matricule, now);

  tx.execute(
    "INSERT INTO members (
       member_id, matricule, matricule_ordinal, first_name, last_name, gender,
       date_of_birth, place_of_birth, email, phone, address, neighborhood, profession,
       marital_status, baptism_date, baptism_place, join_date, category, situation,
       membership_status, notes, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
               ?18, ?19, ?20, ?21, ?22)",
    params![
      encode_uuid(member.member_id),
      member.matricule.to_string(),
      i64::from(member.matricule.ordinal()),
      member.first_name,
      member.last_name,
      encode_enum(member.gender),
      member.date_of_birth.map(encode_date),
      member.place_of_birth,
      member.email,
      member.phone,
      member.address,
      member.neighborhood,
      member.profession,
      encode_enum(member.marital_status),
      member.baptism_date.map(encode_date),
      member.baptism_place,
      encode_date(member.join_date),
      encode_enum(member.category),
      encode_enum(member.situation),
      encode_enum(member.membership_status),
      member.notes,
      encode_dt(member.created_at),
    ],
  )?;
  record_issued(tx, &member.matricule)?;
  Ok(member)
}

/// Write back every mutable member column. The matricule never changes.
pub fn save_member(conn: &Connection, member: &Member) -> Result<()> {
  conn.execute(
    "UPDATE members SET
       first_name = ?2, last_name = ?3, gender = ?4, date_of_birth = ?5,
       place_of_birth = ?6, email = ?7, phone = ?8, address = ?9, neighborhood = ?10,
       profession = ?11, marital_status = ?12, baptism_date = ?13, baptism_place = ?14,
       join_date = ?15, category = ?16, situation = ?17, membership_status = ?18, notes = ?19
     WHERE member_id = ?1",
    params![
      encode_uuid(member.member_id),
      member.first_name,
      member.last_name,
      encode_enum(member.gender),
      member.date_of_birth.map(encode_date),
      member.place_of_birth,
      member.email,
      member.phone,
      member.address,
      member.neighborhood,
      member.profession,
      encode_enum(member.marital_status),
      member.baptism_date.map(encode_date),
      member.baptism_place,
      encode_date(member.join_date),
      encode_enum(member.category),
      encode_enum(member.situation),
      encode_enum(member.membership_status),
      member.notes,
    ],
  )?;
  Ok(())
}

fn find_member_where(conn: &Connection, column: &str, value: String) -> Result<Option<Member>> {
  let raw = conn
    .query_row(
      &format!("SELECT {MEMBER_COLUMNS} FROM members m WHERE m.{column} = ?1"),
      params![value],
      |row| RawMember::from_row(row, 0),
    )
    .optional()?;
  raw.map(RawMember::into_member).transpose()
}

pub fn find_member(conn: &Connection, id: Uuid) -> Result<Option<Member>> {
  find_member_where(conn, "member_id", encode_uuid(id))
}

pub fn find_member_by_matricule(conn: &Connection, matricule: Matricule) -> Result<Option<Member>> {
  find_member_where(conn, "matricule", matricule.to_string())
}

pub fn require_member(conn: &Connection, id: Uuid) -> Result<Member> {
  find_member(conn, id)?.ok_or(Error::Core(parish_core::Error::MemberNotFound(id)))
}

pub fn list_members(conn: &Connection, q: &MemberQuery) -> Result<Vec<Member>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {MEMBER_COLUMNS} FROM members m
     WHERE (?1 IS NULL OR m.first_name LIKE ?1 OR m.last_name LIKE ?1 OR m.matricule LIKE ?1
            OR (m.first_name || ' ' || m.last_name) LIKE ?1)
       AND (?2 IS NULL OR m.gender = ?2)
       AND (?3 IS NULL OR m.category = ?3)
       AND (?4 IS NULL OR m.situation = ?4)
       AND (?5 IS NULL OR m.membership_status = ?5)
     ORDER BY m.matricule_ordinal
     LIMIT ?6 OFFSET ?7"
  ))?;
  let rows = stmt.query_map(
    params![
      like_pattern(q.search.as_deref()),
      q.gender.map(encode_enum),
      q.category.map(encode_enum),
      q.situation.map(encode_enum),
      q.membership_status.map(encode_enum),
      sql_limit(q.limit),
      sql_offset(q.offset),
    ],
    |row| RawMember::from_row(row, 0),
  )?;
  decode_all(rows, RawMember::into_member)
}

/// Commitments plus payments recorded for the member.
pub fn ledger_row_count(conn: &Connection, member_id: Uuid) -> Result<i64> {
  Ok(conn.query_row(
    "SELECT (SELECT COUNT(*) FROM commitments WHERE member_id = ?1)
          + (SELECT COUNT(*) FROM payments WHERE member_id = ?1)",
    params![encode_uuid(member_id)],
    |row| row.get(0),
  )?)
}

/// Memberships go with the member through `ON DELETE CASCADE`.
pub fn delete_member(conn: &Connection, id: Uuid) -> Result<usize> {
  Ok(conn.execute("DELETE FROM members WHERE member_id = ?1", params![encode_uuid(id)])?)
}

// ─── Associations ────────────────────────────────────────────────────────────

pub fn insert_association(conn: &Connection, a: &Association) -> Result<()> {
  conn.execute(
    "INSERT INTO associations (association_id, name, description, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![encode_uuid(a.association_id), a.name, a.description, encode_dt(a.created_at)],
  )?;
  Ok(())
}

pub fn save_association(conn: &Connection, a: &Association) -> Result<()> {
  conn.execute(
    "UPDATE associations SET name = ?2, description = ?3 WHERE association_id = ?1",
    params![encode_uuid(a.association_id), a.name, a.description],
  )?;
  Ok(())
}

pub fn find_association(conn: &Connection, id: Uuid) -> Result<Option<Association>> {
  let raw = conn
    .query_row(
      &format!("SELECT {ASSOCIATION_COLUMNS} FROM associations a WHERE a.association_id = ?1"),
      params![encode_uuid(id)],
      |row| RawAssociation::from_row(row, 0),
    )
    .optional()?;
  raw.map(RawAssociation::into_association).transpose()
}

pub fn require_association(conn: &Connection, id: Uuid) -> Result<Association> {
  find_association(conn, id)?.ok_or(Error::Core(parish_core::Error::AssociationNotFound(id)))
}

/// Whether another association (other than `except`) already uses `name`.
pub fn association_name_taken(conn: &Connection, name: &str, except: Option<Uuid>) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM associations WHERE name = ?1 AND (?2 IS NULL OR association_id != ?2)",
        params![name, except.map(encode_uuid)],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

pub fn list_associations(conn: &Connection, q: &AssociationQuery) -> Result<Vec<Association>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ASSOCIATION_COLUMNS} FROM associations a
     WHERE (?1 IS NULL OR a.name LIKE ?1 OR a.description LIKE ?1)
     ORDER BY a.name
     LIMIT ?2 OFFSET ?3"
  ))?;
  let rows = stmt.query_map(
    params![like_pattern(q.search.as_deref()), sql_limit(q.limit), sql_offset(q.offset)],
    |row| RawAssociation::from_row(row, 0),
  )?;
  decode_all(rows, RawAssociation::into_association)
}

pub fn delete_association(conn: &Connection, id: Uuid) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM associations WHERE association_id = ?1",
    params![encode_uuid(id)],
  )?)
}

pub fn membership_exists(conn: &Connection, member_id: Uuid, association_id: Uuid) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM member_associations WHERE member_id = ?1 AND association_id = ?2",
        params![encode_uuid(member_id), encode_uuid(association_id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

pub fn insert_membership(conn: &Connection, m: &Membership) -> Result<()> {
  conn.execute(
    "INSERT INTO member_associations (member_id, association_id, role, joined_on)
     VALUES (?1, ?2, ?3, ?4)",
    params![
      encode_uuid(m.member_id),
      encode_uuid(m.association_id),
      m.role,
      encode_date(m.joined_on),
    ],
  )?;
  Ok(())
}

pub fn delete_membership(conn: &Connection, member_id: Uuid, association_id: Uuid) -> Result<usize> {
  Ok(conn.execute(
    "DELETE FROM member_associations WHERE member_id = ?1 AND association_id = ?2",
    params![encode_uuid(member_id), encode_uuid(association_id)],
  )?)
}

pub fn association_members(conn: &Connection, association_id: Uuid) -> Result<Vec<(Membership, Member)>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {MEMBERSHIP_COLUMNS}, {MEMBER_COLUMNS}
     FROM member_associations ma JOIN members m ON m.member_id = ma.member_id
     WHERE ma.association_id = ?1
     ORDER BY m.matricule_ordinal"
  ))?;
  let rows = stmt.query_map(params![encode_uuid(association_id)], |row| {
    Ok((RawMembership::from_row(row)?, RawMember::from_row(row, 4)?))
  })?;
  decode_all(rows, |(ms, m)| Ok((ms.into_membership()?, m.into_member()?)))
}

pub fn member_associations(conn: &Connection, member_id: Uuid) -> Result<Vec<(Membership, Association)>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {MEMBERSHIP_COLUMNS}, {ASSOCIATION_COLUMNS}
     FROM member_associations ma JOIN associations a ON a.association_id = ma.association_id
     WHERE ma.member_id = ?1
     ORDER BY a.name"
  ))?;
  let rows = stmt.query_map(params![encode_uuid(member_id)], |row| {
    Ok((RawMembership::from_row(row)?, RawAssociation::from_row(row, 4)?))
  })?;
  decode_all(rows, |(ms, a)| Ok((ms.into_membership()?, a.into_association()?)))
}

// ─── Commitments ─────────────────────────────────────────────────────────────

pub fn insert_commitment(conn: &Connection, c: &Commitment) -> Result<()> {
  conn.execute(
    "INSERT INTO commitments (
       commitment_id, member_id, year, tithe, construction, debt, total, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(c.commitment_id),
      encode_uuid(c.member_id),
      c.year,
      encode_decimal(c.amounts.tithe),
      encode_decimal(c.amounts.construction),
      encode_decimal(c.amounts.debt),
      encode_decimal(c.total),
      encode_dt(c.created_at),
      encode_dt(c.updated_at),
    ],
  )?;
  Ok(())
}

pub fn save_commitment_amounts(conn: &Connection, c: &Commitment) -> Result<()> {
  conn.execute(
    "UPDATE commitments
     SET tithe = ?2, construction = ?3, debt = ?4, total = ?5, updated_at = ?6
     WHERE commitment_id = ?1",
    params![
      encode_uuid(c.commitment_id),
      encode_decimal(c.amounts.tithe),
      encode_decimal(c.amounts.construction),
      encode_decimal(c.amounts.debt),
      encode_decimal(c.total),
      encode_dt(c.updated_at),
    ],
  )?;
  Ok(())
}

/// The id of the member's commitment for `year`, if one exists.
pub fn commitment_for_year(conn: &Connection, member_id: Uuid, year: i32) -> Result<Option<Uuid>> {
  let raw: Option<String> = conn
    .query_row(
      "SELECT commitment_id FROM commitments WHERE member_id = ?1 AND year = ?2",
      params![encode_uuid(member_id), year],
      |row| row.get(0),
    )
    .optional()?;
  raw.as_deref().map(decode_uuid).transpose()
}

fn payments_for_commitment(conn: &Connection, commitment_id: Uuid) -> Result<Vec<Payment>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PAYMENT_COLUMNS} FROM payments p
     WHERE p.commitment_id = ?1
     ORDER BY p.payment_date, p.created_at"
  ))?;
  let rows = stmt.query_map(params![encode_uuid(commitment_id)], RawPayment::from_row)?;
  decode_all(rows, RawPayment::into_payment)
}

pub fn find_ledger(conn: &Connection, id: Uuid) -> Result<Option<CommitmentLedger>> {
  let raw = conn
    .query_row(
      &format!("SELECT {COMMITMENT_COLUMNS} FROM commitments c WHERE c.commitment_id = ?1"),
      params![encode_uuid(id)],
      RawCommitment::from_row,
    )
    .optional()?;
  let Some(raw) = raw else { return Ok(None) };
  let commitment = raw.into_commitment()?;
  let payments = payments_for_commitment(conn, id)?;
  Ok(Some(CommitmentLedger { commitment, payments }))
}

pub fn require_ledger(conn: &Connection, id: Uuid) -> Result<CommitmentLedger> {
  find_ledger(conn, id)?.ok_or(Error::Core(parish_core::Error::CommitmentNotFound(id)))
}

/// Commitments matching `q` with their payments, newest year first, then by
/// matricule.
pub fn list_ledgers(conn: &Connection, q: &CommitmentQuery) -> Result<Vec<CommitmentLedger>> {
  let year = q.year;
  let member_id = q.member_id.map(encode_uuid);

  let mut stmt = conn.prepare(&format!(
    "SELECT {COMMITMENT_COLUMNS}
     FROM commitments c JOIN members m ON m.member_id = c.member_id
     WHERE (?1 IS NULL OR c.year = ?1) AND (?2 IS NULL OR c.member_id = ?2)
     ORDER BY c.year DESC, m.matricule_ordinal"
  ))?;
  let commitments =
    decode_all(stmt.query_map(params![year, member_id], RawCommitment::from_row)?, RawCommitment::into_commitment)?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {PAYMENT_COLUMNS}
     FROM payments p JOIN commitments c ON c.commitment_id = p.commitment_id
     WHERE (?1 IS NULL OR c.year = ?1) AND (?2 IS NULL OR c.member_id = ?2)
     ORDER BY p.payment_date, p.created_at"
  ))?;
  let payments = decode_all(stmt.query_map(params![year, member_id], RawPayment::from_row)?, RawPayment::into_payment)?;

  let mut by_commitment: HashMap<Uuid, Vec<Payment>> = HashMap::new();
  for payment in payments {
    if let Some(id) = payment.commitment_id {
      by_commitment.entry(id).or_default().push(payment);
    }
  }

  Ok(
    commitments
      .into_iter()
      .map(|commitment| {
        let payments = by_commitment.remove(&commitment.commitment_id).unwrap_or_default();
        CommitmentLedger { commitment, payments }
      })
      .collect(),
  )
}

pub fn delete_commitment(conn: &Connection, id: Uuid) -> Result<usize> {
  Ok(conn.execute("DELETE FROM commitments WHERE commitment_id = ?1", params![encode_uuid(id)])?)
}

// ─── Payments ────────────────────────────────────────────────────────────────

pub fn insert_payment(conn: &Connection, p: &Payment) -> Result<()> {
  conn.execute(
    "INSERT INTO payments (
       payment_id, member_id, commitment_id, payment_type, amount, payment_date,
       reference, notes, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(p.payment_id),
      encode_uuid(p.member_id),
      p.commitment_id.map(encode_uuid),
      encode_enum(p.payment_type),
      encode_decimal(p.amount),
      encode_date(p.payment_date),
      p.reference,
      p.notes,
      encode_dt(p.created_at),
    ],
  )?;
  Ok(())
}

pub fn save_payment(conn: &Connection, p: &Payment) -> Result<()> {
  conn.execute(
    "UPDATE payments
     SET payment_type = ?2, amount = ?3, payment_date = ?4, reference = ?5, notes = ?6
     WHERE payment_id = ?1",
    params![
      encode_uuid(p.payment_id),
      encode_enum(p.payment_type),
      encode_decimal(p.amount),
      encode_date(p.payment_date),
      p.reference,
      p.notes,
    ],
  )?;
  Ok(())
}

pub fn find_payment(conn: &Connection, id: Uuid) -> Result<Option<Payment>> {
  let raw = conn
    .query_row(
      &format!("SELECT {PAYMENT_COLUMNS} FROM payments p WHERE p.payment_id = ?1"),
      params![encode_uuid(id)],
      RawPayment::from_row,
    )
    .optional()?;
  raw.map(RawPayment::into_payment).transpose()
}

pub fn require_payment(conn: &Connection, id: Uuid) -> Result<Payment> {
  find_payment(conn, id)?.ok_or(Error::Core(parish_core::Error::PaymentNotFound(id)))
}

/// Newest payment date first.
pub fn list_payments(conn: &Connection, q: &PaymentQuery) -> Result<Vec<Payment>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PAYMENT_COLUMNS} FROM payments p
     WHERE (?1 IS NULL OR p.member_id = ?1)
       AND (?2 IS NULL OR p.commitment_id = ?2)
       AND (?3 IS NULL OR p.payment_type = ?3)
       AND (?4 IS NULL OR p.payment_date >= ?4)
       AND (?5 IS NULL OR p.payment_date <= ?5)
     ORDER BY p.payment_date DESC, p.created_at DESC
     LIMIT ?6 OFFSET ?7"
  ))?;
  let rows = stmt.query_map(
    params![
      q.member_id.map(encode_uuid),
      q.commitment_id.map(encode_uuid),
      q.payment_type.map(encode_enum),
      q.from.map(encode_date),
      q.to.map(encode_date),
      sql_limit(q.limit),
      sql_offset(q.offset),
    ],
    RawPayment::from_row,
  )?;
  decode_all(rows, RawPayment::into_payment)
}

pub fn delete_payment(conn: &Connection, id: Uuid) -> Result<usize> {
  Ok(conn.execute("DELETE FROM payments WHERE payment_id = ?1", params![encode_uuid(id)])?)
}
