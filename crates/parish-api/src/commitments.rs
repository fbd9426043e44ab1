//! Handlers for `/commitments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/commitments` | Optional `year`, `member_id` |
//! | `POST`   | `/commitments` | Body: [`NewCommitment`]; 409 if the member already has one that year |
//! | `GET`    | `/commitments/{id}` | With payments and balance |
//! | `PATCH`  | `/commitments/{id}` | Body: [`AmountsPatch`]; total recomputed |
//! | `DELETE` | `/commitments/{id}` | 409 while payments are applied to it |
//! | `POST`   | `/commitments/migrate` | Body: [`MigrateBody`] |
//! | `GET`    | `/commitments/stats` | Optional `year`, defaults to the current one |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parish_core::{
  commitment::{AmountsPatch, Commitment, CommitmentLedger, NewCommitment},
  ledger::{Balance, MigrationReport},
  payment::Payment,
  report::{self, CommitmentStats},
  store::{CommitmentQuery, ParishStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{current_year, error::ApiError};

/// A commitment as returned by the API: the stored record, its payments and
/// the derived balance.
#[derive(Debug, Serialize)]
pub struct CommitmentView {
  #[serde(flatten)]
  pub commitment: Commitment,
  pub balance:    Balance,
  pub payments:   Vec<Payment>,
}

impl From<CommitmentLedger> for CommitmentView {
  fn from(ledger: CommitmentLedger) -> Self {
    let balance = ledger.balance();
    Self { commitment: ledger.commitment, balance, payments: ledger.payments }
  }
}

// ─── List / create ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub year:      Option<i32>,
  pub member_id: Option<Uuid>,
}

/// `GET /commitments[?year=..][&member_id=..]`
pub async fn list<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CommitmentView>>, ApiError> {
  let query = CommitmentQuery { year: params.year, member_id: params.member_id };
  let ledgers = store.list_commitments(&query).await.map_err(ApiError::from_store)?;
  Ok(Json(ledgers.into_iter().map(CommitmentView::from).collect()))
}

/// `POST /commitments`
pub async fn create<S: ParishStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCommitment>,
) -> Result<impl IntoResponse, ApiError> {
  let ledger = store.create_commitment(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(CommitmentView::from(ledger))))
}

// ─── Single commitment ────────────────────────────────────────────────────────

/// `GET /commitments/{id}`
pub async fn get_one<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CommitmentView>, ApiError> {
  let ledger = store
    .get_commitment(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("commitment {id} not found")))?;
  Ok(Json(ledger.into()))
}

/// `PATCH /commitments/{id}`
pub async fn update<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<AmountsPatch>,
) -> Result<Json<CommitmentView>, ApiError> {
  let ledger = store
    .update_commitment_amounts(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ledger.into()))
}

/// `DELETE /commitments/{id}`
pub async fn delete<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_commitment(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Migration ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MigrateBody {
  pub from_year: i32,
  /// Defaults to the year after `from_year`.
  pub to_year:   Option<i32>,
}

/// `POST /commitments/migrate`: body `{"from_year":2025}`
pub async fn migrate<S: ParishStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<MigrateBody>,
) -> Result<Json<MigrationReport>, ApiError> {
  let to_year = body.to_year.unwrap_or(body.from_year.saturating_add(1));
  let report = store
    .migrate_year(body.from_year, to_year)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report))
}

// ─── Stats ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct YearParams {
  pub year: Option<i32>,
}

/// `GET /commitments/stats[?year=..]`
pub async fn stats<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<YearParams>,
) -> Result<Json<CommitmentStats>, ApiError> {
  let year = params.year.unwrap_or_else(current_year);
  let ledgers = store
    .list_commitments(&CommitmentQuery { year: Some(year), member_id: None })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report::commitment_stats(year, &ledgers)))
}
