//! CSV exports.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/exports/members.csv` | Same filters as `GET /members` |
//! | `GET`  | `/exports/payments.csv` | Same filters as `GET /payments` |

use std::{collections::HashMap, sync::Arc};

use axum::{
  extract::{Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use parish_core::{
  member::Member,
  payment::Payment,
  store::{CommitmentQuery, MemberQuery, ParishStore, PaymentQuery},
};
use uuid::Uuid;

use crate::{error::ApiError, members, payments};

const MEMBER_HEADERS: [&str; 10] = [
  "matricule",
  "last_name",
  "first_name",
  "gender",
  "date_of_birth",
  "phone",
  "email",
  "category",
  "situation",
  "membership_status",
];

const PAYMENT_HEADERS: [&str; 9] = [
  "payment_date",
  "matricule",
  "last_name",
  "first_name",
  "amount",
  "payment_type",
  "commitment_year",
  "reference",
  "notes",
];

/// Render rows with every cell quoted.
fn render<I, R>(headers: &[&str], rows: I) -> Result<Vec<u8>, ApiError>
where
  I: IntoIterator<Item = R>,
  R: IntoIterator<Item = String>,
{
  let mut writer = csv::WriterBuilder::new()
    .quote_style(csv::QuoteStyle::Always)
    .from_writer(Vec::new());
  writer.write_record(headers)?;
  for row in rows {
    writer.write_record(row)?;
  }
  writer
    .into_inner()
    .map_err(|e| ApiError::Export(csv::Error::from(e.into_error())))
}

fn attachment(filename: &str, body: Vec<u8>) -> Response {
  (
    [
      (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    body,
  )
    .into_response()
}

fn opt<T: ToString>(value: Option<T>) -> String {
  value.map(|v| v.to_string()).unwrap_or_default()
}

fn member_row(m: &Member) -> Vec<String> {
  vec![
    m.matricule.to_string(),
    m.last_name.clone(),
    m.first_name.clone(),
    m.gender.as_ref().to_owned(),
    opt(m.date_of_birth),
    opt(m.phone.as_deref()),
    opt(m.email.as_deref()),
    m.category.as_ref().to_owned(),
    m.situation.as_ref().to_owned(),
    m.membership_status.as_ref().to_owned(),
  ]
}

/// `GET /exports/members.csv`
pub async fn members_csv<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<members::ListParams>,
) -> Result<Response, ApiError> {
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
  let body = render(&MEMBER_HEADERS, members.iter().map(member_row))?;
  Ok(attachment("members.csv", body))
}

fn payment_row(
  p: &Payment,
  members: &HashMap<Uuid, Member>,
  years: &HashMap<Uuid, i32>,
) -> Vec<String> {
  let member = members.get(&p.member_id);
  vec![
    p.payment_date.to_string(),
    opt(member.map(|m| m.matricule)),
    opt(member.map(|m| m.last_name.as_str())),
    opt(member.map(|m| m.first_name.as_str())),
    p.amount.to_string(),
    p.payment_type.as_ref().to_owned(),
    opt(p.commitment_id.and_then(|id| years.get(&id))),
    opt(p.reference.as_deref()),
    opt(p.notes.as_deref()),
  ]
}

/// `GET /exports/payments.csv`
pub async fn payments_csv<S: ParishStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<payments::ListParams>,
) -> Result<Response, ApiError> {
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

  let members: HashMap<Uuid, Member> = store
    .list_members(&MemberQuery::default())
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|m| (m.member_id, m))
    .collect();
  let years: HashMap<Uuid, i32> = store
    .list_commitments(&CommitmentQuery::default())
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|l| (l.commitment.commitment_id, l.commitment.year))
    .collect();

  let body = render(&PAYMENT_HEADERS, payments.iter().map(|p| payment_row(p, &members, &years)))?;
  Ok(attachment("payments.csv", body))
}
