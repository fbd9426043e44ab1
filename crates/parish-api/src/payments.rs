//! Handlers for `/payments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/payments` | Optional `member_id`, `commitment_id`, `payment_type`, `from`, `to`, `limit`, `offset` |
//! | `POST`   | `/payments` | Body: [`NewPayment`]; 422 when it exceeds the commitment's balance |
//! | `GET`    | `/payments/{id}` | |
//! | `PATCH`  | `/payments/{id}` | Body: [`PaymentPatch`]; a new amount is re-checked |
//! | `DELETE` | `/payments/{id}` | |
//! | `GET`    | `/payments/stats` | `from` / `to` default to the current year so far |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{Datelike, NaiveDate, Utc};
use parish_core::{
  payment::{NewPayment, Payment, PaymentPatch, PaymentType},
  report::{self, PaymentStats},
  store::{ParishStore, PaymentQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub member_id:     Option<Uuid>,
  pub commitment_id: Option<Uuid>,
  pub payment_type:  Option<PaymentType>,
  pub from:          Option<NaiveDate>,
  pub to:            Option<NaiveDate>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

/// `GET /payments`
pub async fn list<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Payment>>, ApiError> {
  let query = PaymentQuery {
    member_id:     params.member_id,
    commitment_id: params.commitment_id,
    payment_type:  params.payment_type,
    from:          params.from,
    to:            params.to,
    limit:         params.limit,
    offset:        params.offset,
  };
  let payments = store.list_payments(&query).await.map_err(ApiError::from_store)?;
  Ok(Json(payments))
}

/// `POST /payments`
pub async fn create<S: ParishStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewPayment>,
) -> Result<impl IntoResponse, ApiError> {
  let payment = store.record_payment(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(payment)))
}

/// `GET /payments/{id}`
pub async fn get_one<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Payment>, ApiError> {
  let payment = store
    .get_payment(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("payment {id} not found")))?;
  Ok(Json(payment))
}

/// `PATCH /payments/{id}`
pub async fn update<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<PaymentPatch>,
) -> Result<Json<Payment>, ApiError> {
  let payment = store.update_payment(id, patch).await.map_err(ApiError::from_store)?;
  Ok(Json(payment))
}

/// `DELETE /payments/{id}`
pub async fn delete<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_payment(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
  pub from: Option<NaiveDate>,
  pub to:   Option<NaiveDate>,
}

/// `GET /payments/stats[?from=YYYY-MM-DD][&to=YYYY-MM-DD]`
pub async fn stats<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<StatsParams>,
) -> Result<Json<PaymentStats>, ApiError> {
  let today = Utc::now().date_naive();
  let to = params.to.unwrap_or(today);
  let from = params
    .from
    .or_else(|| NaiveDate::from_ymd_opt(to.year(), 1, 1))
    .unwrap_or(to);
  if from > to {
    return Err(ApiError::BadRequest(format!("from {from} is after to {to}")));
  }

  let payments = store
    .list_payments(&PaymentQuery { from: Some(from), to: Some(to), ..Default::default() })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report::payment_stats(&payments, from, to)))
}
