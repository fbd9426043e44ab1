//! Handlers for `/reports` endpoints. The handlers only gather records; the
//! figures come from [`parish_core::report`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/members/{id}` | Summary plus one row per year |
//! | `GET`  | `/reports/associations/{id}` | Optional `year` |
//! | `GET`  | `/reports/global` | Optional `year` |
//! | `GET`  | `/reports/performance` | Optional `year`; best completion rate first |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use parish_core::{
  association::Association,
  commitment::CommitmentLedger,
  report::{
    self, AssociationReport, AssociationRoster, GlobalReport, MemberReport, PerformanceReport,
    RosterEntry,
  },
  store::{AssociationQuery, CommitmentQuery, ParishStore, PaymentQuery},
};
use uuid::Uuid;

use crate::{associations, commitments::YearParams, current_year, error::ApiError, members};

async fn year_ledgers<S: ParishStore>(store: &S, year: i32) -> Result<Vec<CommitmentLedger>, ApiError> {
  store
    .list_commitments(&CommitmentQuery { year: Some(year), member_id: None })
    .await
    .map_err(ApiError::from_store)
}

async fn roster<S: ParishStore>(
  store: &S,
  association: Association,
  by_member: &HashMap<Uuid, CommitmentLedger>,
) -> Result<AssociationRoster, ApiError> {
  let rows = store
    .association_members(association.association_id)
    .await
    .map_err(ApiError::from_store)?;
  let members = rows
    .into_iter()
    .map(|(_, member)| RosterEntry {
      commitment: by_member.get(&member.member_id).cloned(),
      member,
    })
    .collect();
  Ok(AssociationRoster { association, members })
}

fn index_by_member(ledgers: Vec<CommitmentLedger>) -> HashMap<Uuid, CommitmentLedger> {
  ledgers.into_iter().map(|l| (l.commitment.member_id, l)).collect()
}

/// `GET /reports/members/{id}`
pub async fn member<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<MemberReport>, ApiError> {
  let member = members::fetch(store.as_ref(), id).await?;
  let ledgers = store
    .list_commitments(&CommitmentQuery { member_id: Some(id), year: None })
    .await
    .map_err(ApiError::from_store)?;
  let payments = store
    .list_payments(&PaymentQuery { member_id: Some(id), ..Default::default() })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report::member_report(member, &ledgers, &payments, current_year())))
}

/// `GET /reports/associations/{id}[?year=..]`
pub async fn association<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<YearParams>,
) -> Result<Json<AssociationReport>, ApiError> {
  let year = params.year.unwrap_or_else(current_year);
  let association = associations::fetch(store.as_ref(), id).await?;
  let by_member = index_by_member(year_ledgers(store.as_ref(), year).await?);
  let entries = roster(store.as_ref(), association, &by_member).await?;
  Ok(Json(report::association_report(year, entries)))
}

/// `GET /reports/global[?year=..]`
pub async fn global<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<YearParams>,
) -> Result<Json<GlobalReport>, ApiError> {
  let year = params.year.unwrap_or_else(current_year);
  let ledgers = year_ledgers(store.as_ref(), year).await?;
  let associations = store
    .list_associations(&AssociationQuery::default())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report::global_report(year, &ledgers, associations.len())))
}

/// `GET /reports/performance[?year=..]`
pub async fn performance<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<YearParams>,
) -> Result<Json<PerformanceReport>, ApiError> {
  let year = params.year.unwrap_or_else(current_year);
  let by_member = index_by_member(year_ledgers(store.as_ref(), year).await?);
  let associations = store
    .list_associations(&AssociationQuery::default())
    .await
    .map_err(ApiError::from_store)?;

  let mut rosters = Vec::with_capacity(associations.len());
  for association in associations {
    rosters.push(roster(store.as_ref(), association, &by_member).await?);
  }
  Ok(Json(report::performance_report(year, &rosters)))
}
