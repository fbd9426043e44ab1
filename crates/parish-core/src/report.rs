//! Report aggregations.
//!
//! Every figure here is a fold of [`CommitmentLedger::balance`] (and so of
//! [`crate::ledger::compute_balance`]) over some grouping; none of the
//! arithmetic is repeated.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Matricule,
  association::Association,
  commitment::CommitmentLedger,
  ledger::{Balance, sum_amounts, total_paid},
  member::Member,
  payment::{Payment, PaymentType},
};

// ─── Commitment statistics ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentStats {
  pub year:               i32,
  pub commitment_count:   usize,
  #[serde(flatten)]
  pub totals:             Balance,
  pub total_tithe:        Decimal,
  pub total_construction: Decimal,
  pub total_debt:         Decimal,
}

/// Totals over all commitments of `year` found in `ledgers`.
pub fn commitment_stats(year: i32, ledgers: &[CommitmentLedger]) -> CommitmentStats {
  let of_year: Vec<&CommitmentLedger> =
    ledgers.iter().filter(|l| l.commitment.year == year).collect();
  let balances: Vec<Balance> = of_year.iter().map(|l| l.balance()).collect();
  let component = |pick: fn(&CommitmentLedger) -> Decimal| -> Decimal {
    sum_amounts(of_year.iter().map(|l| pick(l)))
  };

  CommitmentStats {
    year,
    commitment_count: of_year.len(),
    totals: Balance::combine(&balances),
    total_tithe: component(|l| l.commitment.amounts.tithe),
    total_construction: component(|l| l.commitment.amounts.construction),
    total_debt: component(|l| l.commitment.amounts.debt),
  }
}

// ─── Global report ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalReport {
  #[serde(flatten)]
  pub stats:              CommitmentStats,
  pub associations_count: usize,
  /// Payments applied to commitments of the year.
  pub payments_count:     usize,
}

pub fn global_report(year: i32, ledgers: &[CommitmentLedger], associations_count: usize) -> GlobalReport {
  let stats = commitment_stats(year, ledgers);
  let payments_count = ledgers
    .iter()
    .filter(|l| l.commitment.year == year)
    .map(|l| l.payments.len())
    .sum();
  GlobalReport { stats, associations_count, payments_count }
}

// ─── Member statistics and report ────────────────────────────────────────────

/// Lifetime figures for one member.
///
/// `totals.total_paid` counts every payment the member made, including those
/// not applied to a commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStats {
  #[serde(flatten)]
  pub totals:            Balance,
  pub current_year:      i32,
  /// `None` when the member has no commitment for `current_year`.
  pub current:           Option<Balance>,
  pub commitments_count: usize,
  pub payments_count:    usize,
}

pub fn member_stats(ledgers: &[CommitmentLedger], payments: &[Payment], current_year: i32) -> MemberStats {
  let committed = sum_amounts(ledgers.iter().map(|l| l.commitment.total));
  let current = ledgers
    .iter()
    .find(|l| l.commitment.year == current_year)
    .map(CommitmentLedger::balance);

  MemberStats {
    totals: Balance::from_totals(committed, total_paid(payments)),
    current_year,
    current,
    commitments_count: ledgers.len(),
    payments_count: payments.len(),
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearLine {
  pub year:           i32,
  pub commitment_id:  Uuid,
  #[serde(flatten)]
  pub balance:        Balance,
  pub payments_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberReport {
  pub member:  Member,
  pub summary: MemberStats,
  /// Most recent year first.
  pub by_year: Vec<YearLine>,
}

pub fn member_report(
  member: Member,
  ledgers: &[CommitmentLedger],
  payments: &[Payment],
  current_year: i32,
) -> MemberReport {
  let mut by_year: Vec<YearLine> = ledgers
    .iter()
    .map(|l| YearLine {
      year:           l.commitment.year,
      commitment_id:  l.commitment.commitment_id,
      balance:        l.balance(),
      payments_count: l.payments.len(),
    })
    .collect();
  by_year.sort_by(|a, b| b.year.cmp(&a.year));

  MemberReport {
    member,
    summary: member_stats(ledgers, payments, current_year),
    by_year,
  }
}

// ─── Associations ────────────────────────────────────────────────────────────

/// One member of an association with their commitment for the report year.
#[derive(Debug, Clone)]
pub struct RosterEntry {
  pub member:     Member,
  pub commitment: Option<CommitmentLedger>,
}

impl RosterEntry {
  /// Zero balance when the member made no commitment that year.
  pub fn balance(&self) -> Balance {
    self.commitment.as_ref().map(CommitmentLedger::balance).unwrap_or_default()
  }
}

#[derive(Debug, Clone)]
pub struct AssociationRoster {
  pub association: Association,
  pub members:     Vec<RosterEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberLine {
  pub member_id: Uuid,
  pub matricule: Matricule,
  pub full_name: String,
  #[serde(flatten)]
  pub balance:   Balance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationReport {
  pub association:  Association,
  pub year:         i32,
  pub member_count: usize,
  pub members:      Vec<MemberLine>,
  pub totals:       Balance,
}

pub fn association_report(year: i32, roster: AssociationRoster) -> AssociationReport {
  let members: Vec<MemberLine> = roster
    .members
    .iter()
    .map(|entry| MemberLine {
      member_id: entry.member.member_id,
      matricule: entry.member.matricule,
      full_name: entry.member.full_name(),
      balance:   entry.balance(),
    })
    .collect();
  let totals = Balance::combine(members.iter().map(|m| &m.balance));

  AssociationReport {
    association: roster.association,
    year,
    member_count: members.len(),
    members,
    totals,
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationPerformance {
  pub association_id: Uuid,
  pub name:           String,
  pub member_count:   usize,
  #[serde(flatten)]
  pub totals:         Balance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
  pub year:         i32,
  /// Highest completion rate first.
  pub associations: Vec<AssociationPerformance>,
  pub totals:       Balance,
}

pub fn performance_report(year: i32, rosters: &[AssociationRoster]) -> PerformanceReport {
  let mut associations: Vec<AssociationPerformance> = rosters
    .iter()
    .map(|roster| {
      let balances: Vec<Balance> = roster.members.iter().map(RosterEntry::balance).collect();
      AssociationPerformance {
        association_id: roster.association.association_id,
        name:           roster.association.name.clone(),
        member_count:   roster.members.len(),
        totals:         Balance::combine(&balances),
      }
    })
    .collect();
  associations.sort_by(|a, b| {
    b.totals
      .completion_rate
      .cmp(&a.totals.completion_rate)
      .then_with(|| a.name.cmp(&b.name))
  });
  let totals = Balance::combine(associations.iter().map(|a| &a.totals));

  PerformanceReport { year, associations, totals }
}

// ─── Payment statistics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
  pub count:  usize,
  pub amount: Decimal,
}

impl Bucket {
  fn add(&mut self, amount: Decimal) {
    self.count += 1;
    self.amount = self.amount.saturating_add(amount);
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
  pub from:           NaiveDate,
  pub to:             NaiveDate,
  pub payment_count:  usize,
  pub total_amount:   Decimal,
  pub average_amount: Decimal,
  pub by_type:        BTreeMap<PaymentType, Bucket>,
  pub by_day:         BTreeMap<NaiveDate, Bucket>,
}

/// Group the payments dated within `from..=to`.
pub fn payment_stats(payments: &[Payment], from: NaiveDate, to: NaiveDate) -> PaymentStats {
  let mut by_type: BTreeMap<PaymentType, Bucket> = BTreeMap::new();
  let mut by_day: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
  let mut total = Bucket::default();

  for p in payments.iter().filter(|p| (from..=to).contains(&p.payment_date)) {
    total.add(p.amount);
    by_type.entry(p.payment_type).or_default().add(p.amount);
    by_day.entry(p.payment_date).or_default().add(p.amount);
  }

  let average_amount = if total.count > 0 {
    total.amount / Decimal::from(total.count)
  } else {
    Decimal::ZERO
  };

  PaymentStats {
    from,
    to,
    payment_count: total.count,
    total_amount: total.amount,
    average_amount,
    by_type,
    by_day,
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use rust_decimal_macros::dec;

  use super::*;
  use crate::{
    commitment::{Commitment, CommitmentAmounts, NewCommitment},
    member::{Gender, NewMember},
    payment::NewPayment,
  };

  fn member(n: u32) -> Member {
    NewMember::new("Marie", format!("Ngo{n}"), Gender::Female).into_member(
      Uuid::new_v4(),
      Matricule::from_ordinal(n).unwrap(),
      Utc::now(),
    )
  }

  fn ledger(member_id: Uuid, year: i32, amounts: CommitmentAmounts, paid: &[Decimal]) -> CommitmentLedger {
    let commitment =
      Commitment::create(NewCommitment { member_id, year, amounts }, Uuid::new_v4(), Utc::now())
        .unwrap();
    let payments = paid
      .iter()
      .map(|a| {
        NewPayment::new(member_id, *a)
          .against(commitment.commitment_id)
          .into_payment(Uuid::new_v4(), Utc::now())
      })
      .collect();
    CommitmentLedger { commitment, payments }
  }

  fn tithe(amount: Decimal) -> CommitmentAmounts {
    CommitmentAmounts { tithe: amount, ..Default::default() }
  }

  fn association(name: &str) -> Association {
    Association {
      association_id: Uuid::new_v4(),
      name:           name.into(),
      description:    None,
      created_at:     Utc::now(),
    }
  }

  #[test]
  fn commitment_stats_sum_components_and_balances() {
    let ledgers = vec![
      ledger(
        Uuid::new_v4(),
        2025,
        CommitmentAmounts { tithe: dec!(100), construction: dec!(50), debt: dec!(10) },
        &[dec!(80)],
      ),
      ledger(Uuid::new_v4(), 2025, tithe(dec!(40)), &[dec!(40)]),
      ledger(Uuid::new_v4(), 2024, tithe(dec!(999)), &[]),
    ];

    let stats = commitment_stats(2025, &ledgers);
    assert_eq!(stats.commitment_count, 2);
    assert_eq!(stats.totals.total_committed, dec!(200));
    assert_eq!(stats.totals.total_paid, dec!(120));
    assert_eq!(stats.totals.balance, dec!(80));
    assert_eq!(stats.totals.completion_rate, dec!(60));
    assert_eq!(stats.total_tithe, dec!(140));
    assert_eq!(stats.total_construction, dec!(50));
    assert_eq!(stats.total_debt, dec!(10));
  }

  #[test]
  fn commitment_stats_for_empty_year() {
    let stats = commitment_stats(2030, &[]);
    assert_eq!(stats.commitment_count, 0);
    assert_eq!(stats.totals, Balance::default());
  }

  #[test]
  fn global_report_counts_year_payments() {
    let ledgers = vec![
      ledger(Uuid::new_v4(), 2025, tithe(dec!(100)), &[dec!(10), dec!(20)]),
      ledger(Uuid::new_v4(), 2024, tithe(dec!(100)), &[dec!(10)]),
    ];
    let report = global_report(2025, &ledgers, 3);
    assert_eq!(report.payments_count, 2);
    assert_eq!(report.associations_count, 3);
    assert_eq!(report.stats.totals.total_paid, dec!(30));
  }

  #[test]
  fn member_stats_include_unapplied_payments() {
    let m = member(1);
    let ledgers = vec![
      ledger(m.member_id, 2024, tithe(dec!(100)), &[dec!(100)]),
      ledger(m.member_id, 2025, tithe(dec!(300)), &[dec!(150)]),
    ];
    let mut payments: Vec<Payment> = ledgers.iter().flat_map(|l| l.payments.clone()).collect();
    payments.push(NewPayment::new(m.member_id, dec!(5)).into_payment(Uuid::new_v4(), Utc::now()));

    let stats = member_stats(&ledgers, &payments, 2025);
    assert_eq!(stats.totals.total_committed, dec!(400));
    assert_eq!(stats.totals.total_paid, dec!(255));
    assert_eq!(stats.totals.balance, dec!(145));
    let current = stats.current.unwrap();
    assert_eq!(current.total_committed, dec!(300));
    assert_eq!(current.total_paid, dec!(150));
    assert_eq!(stats.commitments_count, 2);
    assert_eq!(stats.payments_count, 3);

    assert!(member_stats(&ledgers, &payments, 2030).current.is_none());
  }

  #[test]
  fn member_report_lists_years_newest_first() {
    let m = member(2);
    let ledgers = vec![
      ledger(m.member_id, 2023, tithe(dec!(10)), &[]),
      ledger(m.member_id, 2025, tithe(dec!(30)), &[dec!(30)]),
      ledger(m.member_id, 2024, tithe(dec!(20)), &[dec!(5)]),
    ];
    let report = member_report(m, &ledgers, &[], 2025);
    let years: Vec<i32> = report.by_year.iter().map(|y| y.year).collect();
    assert_eq!(years, vec![2025, 2024, 2023]);
    assert_eq!(report.by_year[1].balance.balance, dec!(15));
    assert_eq!(report.by_year[0].payments_count, 1);
  }

  #[test]
  fn association_report_counts_members_without_commitments_as_zero() {
    let a = member(3);
    let b = member(4);
    let roster = AssociationRoster {
      association: association("Chorale"),
      members:     vec![
        RosterEntry {
          commitment: Some(ledger(a.member_id, 2025, tithe(dec!(200)), &[dec!(50)])),
          member:     a,
        },
        RosterEntry { member: b, commitment: None },
      ],
    };

    let report = association_report(2025, roster);
    assert_eq!(report.member_count, 2);
    assert_eq!(report.members[1].balance, Balance::default());
    assert_eq!(report.totals.total_committed, dec!(200));
    assert_eq!(report.totals.total_paid, dec!(50));
    assert_eq!(report.totals.completion_rate, dec!(25));
  }

  #[test]
  fn performance_report_sorts_by_completion_rate() {
    let roster = |name: &str, total: Decimal, paid: Decimal| {
      let m = member(5);
      AssociationRoster {
        association: association(name),
        members:     vec![RosterEntry {
          commitment: Some(ledger(m.member_id, 2025, tithe(total), &[paid])),
          member:     m,
        }],
      }
    };
    let rosters = vec![
      roster("Jeunesse", dec!(100), dec!(10)),
      roster("Chorale", dec!(100), dec!(90)),
      roster("Dames", dec!(100), dec!(50)),
    ];

    let report = performance_report(2025, &rosters);
    let names: Vec<&str> = report.associations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Chorale", "Dames", "Jeunesse"]);
    assert_eq!(report.totals.total_committed, dec!(300));
    assert_eq!(report.totals.total_paid, dec!(150));
  }

  #[test]
  fn payment_stats_group_by_type_and_day() {
    let member_id = Uuid::new_v4();
    let on = |day: u32, amount: Decimal, kind: PaymentType| {
      let mut p = NewPayment::new(member_id, amount);
      p.payment_type = kind;
      p.payment_date = NaiveDate::from_ymd_opt(2025, 6, day);
      p.into_payment(Uuid::new_v4(), Utc::now())
    };
    let payments = vec![
      on(1, dec!(100), PaymentType::Cash),
      on(1, dec!(50), PaymentType::MobileMoney),
      on(2, dec!(30), PaymentType::Cash),
      on(20, dec!(1000), PaymentType::Check),
    ];
    let from = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

    let stats = payment_stats(&payments, from, to);
    assert_eq!(stats.payment_count, 3);
    assert_eq!(stats.total_amount, dec!(180));
    assert_eq!(stats.average_amount, dec!(60));
    assert_eq!(stats.by_type[&PaymentType::Cash], Bucket { count: 2, amount: dec!(130) });
    assert_eq!(stats.by_day[&from].amount, dec!(150));
    assert!(!stats.by_type.contains_key(&PaymentType::Check));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["by_type"]["mobile_money"]["count"], 1);
    assert_eq!(json["by_day"]["2025-06-02"]["amount"], "30");
  }

  #[test]
  fn oversized_stored_amounts_saturate() {
    let m = member(1);
    let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
    let ledgers = vec![ledger(m.member_id, 2025, tithe(dec!(1)), &[])];
    let payments: Vec<Payment> = (0..100)
      .map(|_| NewPayment::new(m.member_id, huge).into_payment(Uuid::new_v4(), Utc::now()))
      .collect();

    let stats = member_stats(&ledgers, &payments, 2025);
    assert_eq!(stats.totals.total_paid, Decimal::MAX);
    assert_eq!(stats.totals.completion_rate, Decimal::MAX);
    assert_eq!(stats.payments_count, 100);

    let day = payments[0].payment_date;
    let summary = payment_stats(&payments, day, day);
    assert_eq!(summary.total_amount, Decimal::MAX);
    assert_eq!(summary.payment_count, 100);
  }
}
