//! Handlers for `/members` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/members` | Optional `search`, `gender`, `category`, `situation`, `membership_status`, `limit`, `offset` |
//! | `POST`   | `/members` | Body: [`NewMember`]; matricule assigned by the store; 201 |
//! | `GET`    | `/members/by-matricule/{matricule}` | Case-insensitive |
//! | `GET`    | `/members/{id}` | 404 if not found |
//! | `PATCH`  | `/members/{id}` | Body: [`MemberPatch`] |
//! | `DELETE` | `/members/{id}` | 409 while the member has commitments or payments |
//! | `GET`    | `/members/{id}/stats` | Lifetime and current-year figures |
//! | `GET`    | `/members/{id}/associations` | Associations joined |
//! | `POST`   | `/members/{id}/associations` | Body: [`NewMembership`]; 201 |
//! | `DELETE` | `/members/{id}/associations/{association_id}` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parish_core::{
  Matricule,
  association::{Association, Membership, NewMembership},
  member::{Gender, Member, MemberCategory, MemberPatch, MemberSituation, MembershipStatus, NewMember},
  report::{self, MemberStats},
  store::{CommitmentQuery, MemberQuery, ParishStore, PaymentQuery},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{current_year, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub search:            Option<String>,
  pub gender:            Option<Gender>,
  pub category:          Option<MemberCategory>,
  pub situation:         Option<MemberSituation>,
  pub membership_status: Option<MembershipStatus>,
  pub limit:             Option<usize>,
  pub offset:            Option<usize>,
}

/// `GET /members`
pub async fn list<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Member>>, ApiError> {
  let query = MemberQuery {
    search:            params.search,
    gender:            params.gender,
    category:          params.category,
    situation:         params.situation,
    membership_status: params.membership_status,
    limit:             params.limit,
    offset:            params.offset,
  };
  let members = store.list_members(&query).await.map_err(ApiError::from_store)?;
  Ok(Json(members))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /members`
pub async fn create<S: ParishStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewMember>,
) -> Result<impl IntoResponse, ApiError> {
  let member = store.create_member(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(member)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

pub(crate) async fn fetch<S: ParishStore>(store: &S, id: Uuid) -> Result<Member, ApiError> {
  store
    .get_member(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("member {id} not found")))
}

/// `GET /members/{id}`
pub async fn get_one<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
  Ok(Json(fetch(store.as_ref(), id).await?))
}

/// `GET /members/by-matricule/{matricule}`
pub async fn by_matricule<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(raw): Path<String>,
) -> Result<Json<Member>, ApiError> {
  let matricule: Matricule = raw.parse()?;
  let member = store
    .get_member_by_matricule(matricule)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("no member with matricule {matricule}")))?;
  Ok(Json(member))
}

// ─── Update / delete ──────────────────────────────────────────────────────────

/// `PATCH /members/{id}`
pub async fn update<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<MemberPatch>,
) -> Result<Json<Member>, ApiError> {
  let member = store.update_member(id, patch).await.map_err(ApiError::from_store)?;
  Ok(Json(member))
}

/// `DELETE /members/{id}`
pub async fn delete<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_member(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// `GET /members/{id}/stats`
pub async fn stats<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<MemberStats>, ApiError> {
  fetch(store.as_ref(), id).await?;
  let ledgers = store
    .list_commitments(&CommitmentQuery { member_id: Some(id), year: None })
    .await
    .map_err(ApiError::from_store)?;
  let payments = store
    .list_payments(&PaymentQuery { member_id: Some(id), ..Default::default() })
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(report::member_stats(&ledgers, &payments, current_year())))
}

// ─── Associations ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MemberAssociation {
  #[serde(flatten)]
  pub association: Association,
  pub role:        Option<String>,
  pub joined_on:   chrono::NaiveDate,
}

/// `GET /members/{id}/associations`
pub async fn associations<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemberAssociation>>, ApiError> {
  let rows = store.member_associations(id).await.map_err(ApiError::from_store)?;
  Ok(Json(
    rows
      .into_iter()
      .map(|(membership, association)| MemberAssociation {
        association,
        role: membership.role,
        joined_on: membership.joined_on,
      })
      .collect(),
  ))
}

/// `POST /members/{id}/associations`
pub async fn join<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewMembership>,
) -> Result<(StatusCode, Json<Membership>), ApiError> {
  let membership = store
    .add_member_to_association(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(membership)))
}

/// `DELETE /members/{id}/associations/{association_id}`
pub async fn leave<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path((id, association_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
  store
    .remove_member_from_association(id, association_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
