//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::HashSet;

use chrono::NaiveDate;
use parish_core::{
  Matricule,
  matricule,
  association::{AssociationPatch, NewAssociation, NewMembership},
  commitment::{AmountsPatch, CommitmentAmounts, NewCommitment},
  member::{Gender, Member, MemberCategory, MemberPatch, NewMember},
  payment::{NewPayment, PaymentPatch, PaymentType},
  store::{CommitmentQuery, MemberQuery, ParishStore, PaymentQuery},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn member(s: &SqliteStore, last_name: &str) -> Member {
  s.create_member(NewMember::new("Jean", last_name, Gender::Male))
    .await
    .unwrap()
}

fn commitment(member_id: Uuid, year: i32, tithe: Decimal, construction: Decimal, debt: Decimal) -> NewCommitment {
  NewCommitment {
    member_id,
    year,
    amounts: CommitmentAmounts { tithe, construction, debt },
  }
}

fn domain(err: &Error) -> &parish_core::Error {
  match err {
    Error::Core(e) => e,
    other => panic!("expected a domain error, got {other:?}"),
  }
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn matricules_are_allocated_in_order() {
  let s = store().await;
  let a = member(&s, "Mbarga").await;
  let b = member(&s, "Essomba").await;
  let c = member(&s, "Atangana").await;

  assert_eq!(a.matricule.to_string(), "000-aa");
  assert_eq!(b.matricule.to_string(), "001-aa");
  assert_eq!(c.matricule.to_string(), "002-aa");
}

#[tokio::test]
async fn concurrent_creation_never_duplicates_a_matricule() {
  let s = store().await;
  let mut tasks = JoinSet::new();
  for i in 0..20 {
    let s = s.clone();
    tasks.spawn(async move {
      s.create_member(NewMember::new("Paul", format!("Fils{i}"), Gender::Male))
        .await
        .unwrap()
        .matricule
    });
  }

  let mut seen = HashSet::new();
  while let Some(matricule) = tasks.join_next().await {
    assert!(seen.insert(matricule.unwrap()));
  }
  assert_eq!(seen.len(), 20);
  assert!(seen.contains(&"019-aa".parse::<Matricule>().unwrap()));
}

#[tokio::test]
async fn allocation_continues_from_the_last_issued() {
  let s = store().await;
  let first = member(&s, "Onana").await;
  let second = member(&s, "Ngono").await;
  s.delete_member(first.member_id).await.unwrap();

  let third = member(&s, "Owona").await;
  assert_eq!(second.matricule.to_string(), "001-aa");
  assert_eq!(third.matricule.to_string(), "002-aa");
}

#[tokio::test]
async fn deleting_the_newest_member_does_not_free_its_matricule() {
  let s = store().await;
  member(&s, "Onana").await;
  let newest = member(&s, "Ngono").await;
  assert_eq!(newest.matricule.to_string(), "001-aa");
  s.delete_member(newest.member_id).await.unwrap();

  let next = member(&s, "Owona").await;
  assert_eq!(next.matricule.to_string(), "002-aa");
}

#[tokio::test]
async fn allocation_stops_after_the_last_matricule() {
  let dir = std::env::temp_dir().join(format!("parish-store-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("parish.db");

  let s = SqliteStore::open(&path).await.unwrap();
  rusqlite::Connection::open(&path)
    .unwrap()
    .execute(
      "INSERT INTO matricule_counter (id, last_ordinal) VALUES (1, ?1)",
      [i64::from(matricule::CAPACITY - 2)],
    )
    .unwrap();

  let last = member(&s, "Atangana").await;
  assert_eq!(last.matricule, Matricule::LAST);
  assert_eq!(last.matricule.to_string(), "999-zz");

  let err = s
    .create_member(NewMember::new("Paul", "Biya", Gender::Male))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(parish_core::Error::CapacityExhausted)));

  let all = s.list_members(&MemberQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn create_member_rejects_invalid_input() {
  let s = store().await;
  let err = s
    .create_member(NewMember::new("J", "Mbarga", Gender::Male))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::InvalidInput(_)));
  assert!(s.list_members(&MemberQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_member_by_id_and_matricule() {
  let s = store().await;
  let mut input = NewMember::new("Marie", "Ngo Bassa", Gender::Female);
  input.phone = Some("+237699001122".into());
  input.date_of_birth = NaiveDate::from_ymd_opt(1990, 4, 12);
  let created = s.create_member(input).await.unwrap();

  let by_id = s.get_member(created.member_id).await.unwrap().unwrap();
  assert_eq!(by_id.last_name, "Ngo Bassa");
  assert_eq!(by_id.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12));

  let by_matricule = s.get_member_by_matricule(created.matricule).await.unwrap().unwrap();
  assert_eq!(by_matricule.member_id, created.member_id);

  assert!(s.get_member(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_members_filters_and_pages() {
  let s = store().await;
  member(&s, "Mbarga").await;
  member(&s, "Essomba").await;
  let mut child = NewMember::new("Luc", "Mbarga", Gender::Male);
  child.category = MemberCategory::Child;
  s.create_member(child).await.unwrap();

  let found = s
    .list_members(&MemberQuery { search: Some("mbar".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.len(), 2);

  let children = s
    .list_members(&MemberQuery { category: Some(MemberCategory::Child), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(children.len(), 1);
  assert_eq!(children[0].first_name, "Luc");

  let page = s
    .list_members(&MemberQuery { limit: Some(1), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].matricule.to_string(), "001-aa");
}

#[tokio::test]
async fn update_member_keeps_matricule() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;

  let updated = s
    .update_member(m.member_id, MemberPatch {
      email: Some("jean@example.cm".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.email.as_deref(), Some("jean@example.cm"));
  assert_eq!(updated.matricule, m.matricule);

  let cleared = s
    .update_member(m.member_id, MemberPatch { email: Some(String::new()), ..Default::default() })
    .await
    .unwrap();
  assert!(cleared.email.is_none());
}

#[tokio::test]
async fn member_with_ledger_cannot_be_deleted() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  s.create_commitment(commitment(m.member_id, 2025, dec!(1000), dec!(0), dec!(0)))
    .await
    .unwrap();

  let err = s.delete_member(m.member_id).await.unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::MemberHasLedger(_)));

  let err = s.delete_member(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::MemberNotFound(_)));
}

// ─── Associations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn association_names_are_unique() {
  let s = store().await;
  s.create_association(NewAssociation { name: "Chorale".into(), description: None })
    .await
    .unwrap();
  let other = s
    .create_association(NewAssociation { name: "Jeunesse".into(), description: None })
    .await
    .unwrap();

  let err = s
    .create_association(NewAssociation { name: "Chorale".into(), description: None })
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::AssociationNameTaken(_)));

  let err = s
    .update_association(other.association_id, AssociationPatch {
      name: Some("Chorale".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::AssociationNameTaken(_)));
}

#[tokio::test]
async fn memberships_roundtrip() {
  let s = store().await;
  let a = member(&s, "Mbarga").await;
  let b = member(&s, "Essomba").await;
  let choir = s
    .create_association(NewAssociation { name: "Chorale".into(), description: None })
    .await
    .unwrap();
  let join = |role: Option<&str>| NewMembership {
    association_id: choir.association_id,
    role:           role.map(str::to_owned),
    joined_on:      None,
  };

  s.add_member_to_association(b.member_id, join(Some("président"))).await.unwrap();
  s.add_member_to_association(a.member_id, join(None)).await.unwrap();
  let err = s.add_member_to_association(a.member_id, join(None)).await.unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::AlreadyInAssociation { .. }));

  let roster = s.association_members(choir.association_id).await.unwrap();
  let matricules: Vec<String> = roster.iter().map(|(_, m)| m.matricule.to_string()).collect();
  assert_eq!(matricules, vec!["000-aa", "001-aa"]);
  assert_eq!(roster[1].0.role.as_deref(), Some("président"));

  let groups = s.member_associations(b.member_id).await.unwrap();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].1.name, "Chorale");

  s.remove_member_from_association(a.member_id, choir.association_id).await.unwrap();
  let err = s
    .remove_member_from_association(a.member_id, choir.association_id)
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::NotInAssociation { .. }));

  s.delete_association(choir.association_id).await.unwrap();
  assert!(s.member_associations(b.member_id).await.unwrap().is_empty());
}

// ─── Commitments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn commitment_total_is_computed_and_unique_per_year() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;

  let ledger = s
    .create_commitment(commitment(m.member_id, 2025, dec!(500000), dec!(150000), dec!(50000)))
    .await
    .unwrap();
  assert_eq!(ledger.commitment.total, dec!(700000));

  let stored = s.get_commitment(ledger.commitment.commitment_id).await.unwrap().unwrap();
  assert_eq!(stored.commitment.total, dec!(700000));
  assert_eq!(stored.commitment.amounts.construction, dec!(150000));

  let err = s
    .create_commitment(commitment(m.member_id, 2025, dec!(1), dec!(0), dec!(0)))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::CommitmentExists { year: 2025, .. }));
}

#[tokio::test]
async fn commitment_for_unknown_member_is_not_found() {
  let s = store().await;
  let err = s
    .create_commitment(commitment(Uuid::new_v4(), 2025, dec!(1), dec!(0), dec!(0)))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::MemberNotFound(_)));
}

#[tokio::test]
async fn amounts_update_recomputes_total_but_not_below_paid() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let c = s
    .create_commitment(commitment(m.member_id, 2025, dec!(1000), dec!(500), dec!(0)))
    .await
    .unwrap()
    .commitment;
  s.record_payment(NewPayment::new(m.member_id, dec!(900)).against(c.commitment_id))
    .await
    .unwrap();

  let updated = s
    .update_commitment_amounts(c.commitment_id, AmountsPatch {
      construction: Some(dec!(0)),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.commitment.total, dec!(1000));
  assert_eq!(updated.balance().balance, dec!(100));

  let err = s
    .update_commitment_amounts(c.commitment_id, AmountsPatch {
      tithe: Some(dec!(800)),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::InvalidInput(_)));
}

#[tokio::test]
async fn commitment_with_payments_cannot_be_deleted() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let c = s
    .create_commitment(commitment(m.member_id, 2025, dec!(1000), dec!(0), dec!(0)))
    .await
    .unwrap()
    .commitment;
  let p = s
    .record_payment(NewPayment::new(m.member_id, dec!(100)).against(c.commitment_id))
    .await
    .unwrap();

  let err = s.delete_commitment(c.commitment_id).await.unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::CommitmentHasPayments(_)));

  s.delete_payment(p.payment_id).await.unwrap();
  s.delete_commitment(c.commitment_id).await.unwrap();
  assert!(s.get_commitment(c.commitment_id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_commitments_by_year_with_payments() {
  let s = store().await;
  let a = member(&s, "Mbarga").await;
  let b = member(&s, "Essomba").await;
  let ca = s
    .create_commitment(commitment(a.member_id, 2025, dec!(100), dec!(0), dec!(0)))
    .await
    .unwrap()
    .commitment;
  s.create_commitment(commitment(b.member_id, 2025, dec!(200), dec!(0), dec!(0)))
    .await
    .unwrap();
  s.create_commitment(commitment(a.member_id, 2024, dec!(50), dec!(0), dec!(0)))
    .await
    .unwrap();
  s.record_payment(NewPayment::new(a.member_id, dec!(40)).against(ca.commitment_id))
    .await
    .unwrap();

  let year = s
    .list_commitments(&CommitmentQuery { year: Some(2025), member_id: None })
    .await
    .unwrap();
  assert_eq!(year.len(), 2);
  assert_eq!(year[0].commitment.member_id, a.member_id);
  assert_eq!(year[0].balance().total_paid, dec!(40));
  assert!(year[1].payments.is_empty());

  let all_for_a = s
    .list_commitments(&CommitmentQuery { year: None, member_id: Some(a.member_id) })
    .await
    .unwrap();
  let years: Vec<i32> = all_for_a.iter().map(|l| l.commitment.year).collect();
  assert_eq!(years, vec![2025, 2024]);
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn overdraft_is_rejected_and_exact_balance_accepted() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let c = s
    .create_commitment(commitment(m.member_id, 2025, dec!(500000), dec!(150000), dec!(50000)))
    .await
    .unwrap()
    .commitment;
  for amount in [dec!(300000), dec!(200000)] {
    s.record_payment(NewPayment::new(m.member_id, amount).against(c.commitment_id))
      .await
      .unwrap();
  }

  let err = s
    .record_payment(NewPayment::new(m.member_id, dec!(250000)).against(c.commitment_id))
    .await
    .unwrap_err();
  match domain(&err) {
    parish_core::Error::Overdraft { requested, remaining } => {
      assert_eq!(*requested, dec!(250000));
      assert_eq!(*remaining, dec!(200000));
    }
    other => panic!("expected overdraft, got {other:?}"),
  }

  s.record_payment(NewPayment::new(m.member_id, dec!(200000)).against(c.commitment_id))
    .await
    .unwrap();
  let ledger = s.get_commitment(c.commitment_id).await.unwrap().unwrap();
  assert_eq!(ledger.balance().balance, Decimal::ZERO);
  assert_eq!(ledger.payments.len(), 3);
}

#[tokio::test]
async fn concurrent_payments_never_overdraw() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let c = s
    .create_commitment(commitment(m.member_id, 2025, dec!(500), dec!(0), dec!(0)))
    .await
    .unwrap()
    .commitment;

  let mut tasks = JoinSet::new();
  for _ in 0..10 {
    let s = s.clone();
    let input = NewPayment::new(m.member_id, dec!(100)).against(c.commitment_id);
    tasks.spawn(async move { s.record_payment(input).await.is_ok() });
  }
  let mut accepted = 0;
  while let Some(ok) = tasks.join_next().await {
    if ok.unwrap() {
      accepted += 1;
    }
  }

  assert_eq!(accepted, 5);
  let ledger = s.get_commitment(c.commitment_id).await.unwrap().unwrap();
  assert_eq!(ledger.balance().balance, Decimal::ZERO);
}

#[tokio::test]
async fn payment_against_another_members_commitment_is_refused() {
  let s = store().await;
  let a = member(&s, "Mbarga").await;
  let b = member(&s, "Essomba").await;
  let c = s
    .create_commitment(commitment(a.member_id, 2025, dec!(500), dec!(0), dec!(0)))
    .await
    .unwrap()
    .commitment;

  let err = s
    .record_payment(NewPayment::new(b.member_id, dec!(10)).against(c.commitment_id))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::CommitmentMemberMismatch { .. }));

  let err = s
    .record_payment(NewPayment::new(a.member_id, dec!(0)))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::InvalidInput(_)));
}

#[tokio::test]
async fn unapplied_payments_skip_the_balance_check() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let p = s
    .record_payment(NewPayment::new(m.member_id, dec!(1000000)))
    .await
    .unwrap();
  assert!(p.commitment_id.is_none());
  assert_eq!(s.get_payment(p.payment_id).await.unwrap().unwrap().amount, dec!(1000000));
}

#[tokio::test]
async fn amount_update_is_checked_against_the_other_payments() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let c = s
    .create_commitment(commitment(m.member_id, 2025, dec!(1000), dec!(0), dec!(0)))
    .await
    .unwrap()
    .commitment;
  s.record_payment(NewPayment::new(m.member_id, dec!(600)).against(c.commitment_id))
    .await
    .unwrap();
  let p = s
    .record_payment(NewPayment::new(m.member_id, dec!(300)).against(c.commitment_id))
    .await
    .unwrap();

  let raised = s
    .update_payment(p.payment_id, PaymentPatch { amount: Some(dec!(400)), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(raised.amount, dec!(400));

  let err = s
    .update_payment(p.payment_id, PaymentPatch { amount: Some(dec!(401)), ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::Overdraft { .. }));
  assert_eq!(s.get_payment(p.payment_id).await.unwrap().unwrap().amount, dec!(400));
}

#[tokio::test]
async fn list_payments_filters_by_date_and_type() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  let record = |day: u32, kind: PaymentType| {
    let mut input = NewPayment::new(m.member_id, dec!(10));
    input.payment_type = kind;
    input.payment_date = NaiveDate::from_ymd_opt(2025, 5, day);
    input
  };
  s.record_payment(record(1, PaymentType::Cash)).await.unwrap();
  s.record_payment(record(15, PaymentType::MobileMoney)).await.unwrap();
  s.record_payment(record(30, PaymentType::Cash)).await.unwrap();

  let mid_month = s
    .list_payments(&PaymentQuery {
      from: NaiveDate::from_ymd_opt(2025, 5, 10),
      to: NaiveDate::from_ymd_opt(2025, 5, 31),
      ..Default::default()
    })
    .await
    .unwrap();
  let days: Vec<String> = mid_month.iter().map(|p| p.payment_date.to_string()).collect();
  assert_eq!(days, vec!["2025-05-30", "2025-05-15"]);

  let cash = s
    .list_payments(&PaymentQuery { payment_type: Some(PaymentType::Cash), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(cash.len(), 2);
}

// ─── Migration ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn migration_carries_unpaid_balances_once() {
  let s = store().await;
  let a = member(&s, "Mbarga").await;
  let b = member(&s, "Essomba").await;
  let ca = s
    .create_commitment(commitment(a.member_id, 2025, dec!(100000), dec!(50000), dec!(0)))
    .await
    .unwrap()
    .commitment;
  s.record_payment(NewPayment::new(a.member_id, dec!(100000)).against(ca.commitment_id))
    .await
    .unwrap();
  let cb = s
    .create_commitment(commitment(b.member_id, 2025, dec!(20000), dec!(0), dec!(0)))
    .await
    .unwrap()
    .commitment;
  s.record_payment(NewPayment::new(b.member_id, dec!(20000)).against(cb.commitment_id))
    .await
    .unwrap();

  let report = s.migrate_year(2025, 2026).await.unwrap();
  assert_eq!(report.migrated, 2);
  assert_eq!(report.skipped, 0);
  assert!(report.is_complete());

  let next = s
    .list_commitments(&CommitmentQuery { year: Some(2026), member_id: None })
    .await
    .unwrap();
  assert_eq!(next.len(), 2);
  assert_eq!(next[0].commitment.amounts, CommitmentAmounts::debt_only(dec!(50000)));
  assert_eq!(next[0].commitment.total, dec!(50000));
  assert_eq!(next[1].commitment.total, Decimal::ZERO);

  let again = s.migrate_year(2025, 2026).await.unwrap();
  assert_eq!(again.migrated, 0);
  assert_eq!(again.skipped, 2);
  let count = s
    .list_commitments(&CommitmentQuery { year: Some(2026), member_id: None })
    .await
    .unwrap()
    .len();
  assert_eq!(count, 2);
}

#[tokio::test]
async fn migration_skips_members_already_committed() {
  let s = store().await;
  let m = member(&s, "Mbarga").await;
  s.create_commitment(commitment(m.member_id, 2025, dec!(100), dec!(0), dec!(0)))
    .await
    .unwrap();
  s.create_commitment(commitment(m.member_id, 2026, dec!(999), dec!(0), dec!(0)))
    .await
    .unwrap();

  let report = s.migrate_year(2025, 2026).await.unwrap();
  assert_eq!((report.migrated, report.skipped), (0, 1));

  let kept = s
    .list_commitments(&CommitmentQuery { year: Some(2026), member_id: Some(m.member_id) })
    .await
    .unwrap();
  assert_eq!(kept[0].commitment.total, dec!(999));
}

#[tokio::test]
async fn migration_rejects_backwards_years() {
  let s = store().await;
  let err = s.migrate_year(2025, 2025).await.unwrap_err();
  assert!(matches!(domain(&err), parish_core::Error::InvalidInput(_)));
}

#[tokio::test]
async fn store_survives_reopen() {
  let dir = std::env::temp_dir().join(format!("parish-store-{}", Uuid::new_v4()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("parish.db");

  let first = {
    let s = SqliteStore::open(&path).await.unwrap();
    member(&s, "Mbarga").await
  };
  let s = SqliteStore::open(&path).await.unwrap();
  let second = member(&s, "Essomba").await;
  assert_eq!(first.matricule.to_string(), "000-aa");
  assert_eq!(second.matricule.to_string(), "001-aa");

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}
