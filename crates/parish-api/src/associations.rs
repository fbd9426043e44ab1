//! Handlers for `/associations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/associations` | Optional `search`, `limit`, `offset` |
//! | `POST`   | `/associations` | Body: [`NewAssociation`]; 409 on a duplicate name |
//! | `GET`    | `/associations/{id}` | |
//! | `PATCH`  | `/associations/{id}` | Body: [`AssociationPatch`] |
//! | `DELETE` | `/associations/{id}` | Memberships are removed with it |
//! | `GET`    | `/associations/{id}/members` | Ordered by matricule |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parish_core::{
  association::{Association, AssociationPatch, NewAssociation},
  member::Member,
  store::{AssociationQuery, ParishStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /associations`
pub async fn list<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Association>>, ApiError> {
  let query = AssociationQuery {
    search: params.search,
    limit:  params.limit,
    offset: params.offset,
  };
  let associations = store.list_associations(&query).await.map_err(ApiError::from_store)?;
  Ok(Json(associations))
}

/// `POST /associations`
pub async fn create<S: ParishStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewAssociation>,
) -> Result<impl IntoResponse, ApiError> {
  let association = store.create_association(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(association)))
}

pub(crate) async fn fetch<S: ParishStore>(store: &S, id: Uuid) -> Result<Association, ApiError> {
  store
    .get_association(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("association {id} not found")))
}

/// `GET /associations/{id}`
pub async fn get_one<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Association>, ApiError> {
  Ok(Json(fetch(store.as_ref(), id).await?))
}

/// `PATCH /associations/{id}`
pub async fn update<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<AssociationPatch>,
) -> Result<Json<Association>, ApiError> {
  let association = store.update_association(id, patch).await.map_err(ApiError::from_store)?;
  Ok(Json(association))
}

/// `DELETE /associations/{id}`
pub async fn delete<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_association(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct RosterMember {
  #[serde(flatten)]
  pub member:    Member,
  pub role:      Option<String>,
  pub joined_on: chrono::NaiveDate,
}

/// `GET /associations/{id}/members`
pub async fn members<S: ParishStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RosterMember>>, ApiError> {
  let rows = store.association_members(id).await.map_err(ApiError::from_store)?;
  Ok(Json(
    rows
      .into_iter()
      .map(|(membership, member)| RosterMember {
        member,
        role: membership.role,
        joined_on: membership.joined_on,
      })
      .collect(),
  ))
}
